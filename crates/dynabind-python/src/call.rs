//! Per-call argument staging: `*args`/`**kwargs` to a typed binding.

use indexmap::IndexMap;

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyTuple};

use dynabind_core::{bind, CallBinding, DynamicValue, FunctionSignature};

use crate::convert::HostArg;
use crate::error::to_py_err;

/// The converted arguments of one Python call.
///
/// Owns the pinned [`HostArg`]s; the binding produced by
/// [`bind`](CallArgs::bind) borrows from it, so the call body must keep
/// this value alive while it reads its arguments.
pub(crate) struct CallArgs<'py> {
    positional: Vec<HostArg<'py>>,
    keywords: Vec<(String, HostArg<'py>)>,
}

impl<'py> CallArgs<'py> {
    /// Convert every argument up front. A single unmarshallable object
    /// fails the whole call before any binding or execution happens.
    pub(crate) fn from_python(
        args: &Bound<'py, PyTuple>,
        kwargs: Option<&Bound<'py, PyDict>>,
    ) -> PyResult<Self> {
        let mut positional = Vec::with_capacity(args.len());
        for obj in args.iter() {
            positional.push(HostArg::from_object(&obj)?);
        }
        let mut keywords = Vec::new();
        if let Some(kwargs) = kwargs {
            for (key, value) in kwargs.iter() {
                let name: String = key.extract()?;
                keywords.push((name, HostArg::from_object(&value)?));
            }
        }
        Ok(Self {
            positional,
            keywords,
        })
    }

    /// Resolve the staged arguments against `signature`.
    pub(crate) fn bind<'a>(
        &'a self,
        signature: &'a FunctionSignature,
    ) -> PyResult<CallBinding<'a, 'a>> {
        let positional: Vec<DynamicValue<'a>> =
            self.positional.iter().map(HostArg::as_dynamic).collect();
        let mut keywords = IndexMap::with_capacity(self.keywords.len());
        for (name, arg) in &self.keywords {
            keywords.insert(name.clone(), arg.as_dynamic());
        }
        bind(signature, positional, keywords).map_err(to_py_err)
    }
}
