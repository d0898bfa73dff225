//! Marshalling between Python objects and the dynamic value model.
//!
//! [`HostArg`] owns the `Bound` references for one call so that the
//! borrowed views handed to the core ([`DynamicValue`]) cannot outlive
//! the Python objects backing them. Conversion inspects concrete Python
//! types; anything unrecognized is rejected up front with a `TypeError`.

use indexmap::IndexMap;

use numpy::{PyArrayDyn, PyArrayMethods, PyUntypedArray, PyUntypedArrayMethods};
use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;
use pyo3::types::{
    PyBool, PyByteArray, PyBytes, PyDict, PyFloat, PyInt, PyList, PyMemoryView, PyTuple,
};
use pyo3::IntoPyObjectExt;

use dynabind_core::{
    ArrayHandle, ByteBufferRef, CallbackError, DynamicValue, HostCallable, SequenceHost,
    SortError, ValueKind,
};

use crate::error::PyErrPayload;

/// One Python argument, converted and pinned for the duration of a call.
pub(crate) enum HostArg<'py> {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Bound<'py, PyBytes>),
    ByteArray(Bound<'py, PyByteArray>),
    Memoryview,
    ArrayF32(ArrayF32Arg<'py>),
    List(ListSeq<'py>),
    Callable(CallableHost<'py>),
}

/// A float32 ndarray pinned for the call, with its layout captured.
pub(crate) struct ArrayF32Arg<'py> {
    // Keeps the ndarray (and its data) alive while the descriptor borrows it.
    _owner: Bound<'py, PyAny>,
    addr: *const f32,
    shape: Vec<usize>,
    strides: Vec<isize>,
}

impl<'py> HostArg<'py> {
    /// Convert one Python object into its dynamic representation.
    ///
    /// `bool` is checked before `int` because Python's `bool` subclasses
    /// `int`; the boundary keeps them distinct.
    pub(crate) fn from_object(obj: &Bound<'py, PyAny>) -> PyResult<Self> {
        if obj.is_none() {
            return Ok(HostArg::None);
        }
        if let Ok(b) = obj.cast::<PyBool>() {
            return Ok(HostArg::Bool(b.is_true()));
        }
        if obj.cast::<PyInt>().is_ok() {
            return Ok(HostArg::Int(obj.extract::<i64>()?));
        }
        if obj.cast::<PyFloat>().is_ok() {
            return Ok(HostArg::Float(obj.extract::<f64>()?));
        }
        if let Ok(b) = obj.cast::<PyBytes>() {
            return Ok(HostArg::Bytes(b.clone()));
        }
        if let Ok(b) = obj.cast::<PyByteArray>() {
            return Ok(HostArg::ByteArray(b.clone()));
        }
        if obj.cast::<PyMemoryView>().is_ok() {
            // Recognized as a buffer-category object, but the protocol is
            // deliberately refused once a buffer parameter asks for it.
            return Ok(HostArg::Memoryview);
        }
        if let Ok(arr) = obj.cast::<PyArrayDyn<f32>>() {
            return Ok(HostArg::ArrayF32(ArrayF32Arg {
                addr: arr.data() as *const f32,
                shape: arr.shape().to_vec(),
                strides: arr.strides().to_vec(),
                _owner: obj.clone(),
            }));
        }
        if let Ok(arr) = obj.cast::<PyUntypedArray>() {
            return Err(PyTypeError::new_err(format!(
                "only float32 arrays are supported, got dtype {}",
                arr.dtype()
            )));
        }
        if let Ok(list) = obj.cast::<PyList>() {
            return Ok(HostArg::List(ListSeq { list: list.clone() }));
        }
        if obj.is_callable() {
            return Ok(HostArg::Callable(CallableHost { obj: obj.clone() }));
        }
        Err(PyTypeError::new_err(format!(
            "cannot marshal {} across the native boundary",
            type_name(obj)
        )))
    }

    /// The borrowed dynamic view over this argument.
    ///
    /// The returned value borrows `self`, which in turn pins the Python
    /// object, so the view is valid for the rest of the call.
    pub(crate) fn as_dynamic(&self) -> DynamicValue<'_> {
        match self {
            HostArg::None => DynamicValue::None,
            HostArg::Bool(v) => DynamicValue::Bool(*v),
            HostArg::Int(v) => DynamicValue::Int(*v),
            HostArg::Float(v) => DynamicValue::Float64(*v),
            HostArg::Bytes(b) => DynamicValue::Bytes(b.as_bytes()),
            // SAFETY: the bytearray is pinned by this HostArg and nothing
            // on the native side resizes it, so the pointer and length
            // stay valid for the borrow.
            HostArg::ByteArray(b) => {
                DynamicValue::ByteBuffer(unsafe { ByteBufferRef::from_raw(b.data(), b.len()) })
            }
            HostArg::Memoryview => DynamicValue::Array(ArrayHandle::unsupported("memoryview")),
            // SAFETY: addr/shape/strides were read from the ndarray this
            // HostArg pins; numpy owns the data for at least that long.
            HostArg::ArrayF32(a) => DynamicValue::Array(unsafe {
                ArrayHandle::f32_strided(a.addr, &a.shape, &a.strides)
            }),
            HostArg::List(seq) => DynamicValue::Sequence(seq),
            HostArg::Callable(c) => DynamicValue::Callable(c),
        }
    }
}

/// Marshal an owned scalar result back to a Python object.
pub(crate) fn scalar_to_py(py: Python<'_>, value: &DynamicValue<'_>) -> PyResult<Py<PyAny>> {
    match value {
        DynamicValue::None => Ok(py.None()),
        DynamicValue::Bool(v) => v.into_py_any(py),
        DynamicValue::Int(v) => v.into_py_any(py),
        // Python has one float width; f32 results widen exactly.
        DynamicValue::Float32(v) => f64::from(*v).into_py_any(py),
        DynamicValue::Float64(v) => v.into_py_any(py),
        DynamicValue::Bytes(b) => PyBytes::new(py, b).into_py_any(py),
        other => Err(PyTypeError::new_err(format!(
            "cannot marshal {} back to Python",
            other.kind()
        ))),
    }
}

/// Read a Python object as an owned scalar, or `None` if it is not one.
pub(crate) fn scalar_from_py(obj: &Bound<'_, PyAny>) -> PyResult<Option<DynamicValue<'static>>> {
    if obj.is_none() {
        return Ok(Some(DynamicValue::None));
    }
    if let Ok(b) = obj.cast::<PyBool>() {
        return Ok(Some(DynamicValue::Bool(b.is_true())));
    }
    if obj.cast::<PyInt>().is_ok() {
        return Ok(Some(DynamicValue::Int(obj.extract::<i64>()?)));
    }
    if obj.cast::<PyFloat>().is_ok() {
        return Ok(Some(DynamicValue::Float64(obj.extract::<f64>()?)));
    }
    Ok(None)
}

pub(crate) fn type_name(obj: &Bound<'_, PyAny>) -> String {
    obj.get_type()
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|_| "<unknown>".to_string())
}

/// A live Python list exposed to the core's in-place sort operations.
pub(crate) struct ListSeq<'py> {
    list: Bound<'py, PyList>,
}

impl ListSeq<'_> {
    fn non_scalar_kind(obj: &Bound<'_, PyAny>) -> Option<ValueKind> {
        if obj.cast::<PyBytes>().is_ok() {
            Some(ValueKind::Bytes)
        } else if obj.cast::<PyByteArray>().is_ok() {
            Some(ValueKind::ByteBuffer)
        } else if obj.cast::<PyList>().is_ok() {
            Some(ValueKind::Sequence)
        } else if obj.is_callable() {
            Some(ValueKind::Callable)
        } else {
            None
        }
    }
}

impl SequenceHost for ListSeq<'_> {
    fn len(&self) -> usize {
        self.list.len()
    }

    fn snapshot(&self) -> Result<Vec<DynamicValue<'static>>, SortError> {
        let mut out = Vec::with_capacity(self.list.len());
        for (index, item) in self.list.iter().enumerate() {
            let scalar = scalar_from_py(&item).map_err(|e| SortError::HostAccess {
                message: e.to_string(),
            })?;
            match scalar {
                Some(value) => out.push(value),
                None => {
                    return Err(match Self::non_scalar_kind(&item) {
                        Some(kind) => SortError::UnsupportedElement { index, kind },
                        None => SortError::HostAccess {
                            message: format!(
                                "unsortable object of type {} at index {index}",
                                type_name(&item)
                            ),
                        },
                    })
                }
            }
        }
        Ok(out)
    }

    fn store(&self, items: &[DynamicValue<'static>]) -> Result<(), SortError> {
        let py = self.list.py();
        for (index, item) in items.iter().enumerate() {
            let obj = scalar_to_py(py, item).map_err(|e| SortError::HostAccess {
                message: e.to_string(),
            })?;
            self.list
                .set_item(index, obj)
                .map_err(|e| SortError::HostAccess {
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }
}

/// A Python callable invoked synchronously through the callback bridge.
///
/// A raised Python exception is wrapped opaquely as [`PyErrPayload`] so
/// the outer call can rethrow the original exception object.
pub(crate) struct CallableHost<'py> {
    obj: Bound<'py, PyAny>,
}

impl HostCallable for CallableHost<'_> {
    fn invoke(
        &self,
        args: &[DynamicValue<'_>],
        kwargs: &IndexMap<String, DynamicValue<'_>>,
    ) -> Result<DynamicValue<'static>, CallbackError> {
        let py = self.obj.py();
        let result = call_with_scalars(py, &self.obj, args, kwargs)
            .map_err(|e| CallbackError::new(PyErrPayload(e)))?;
        match scalar_from_py(&result) {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Err(CallbackError::new(PyErrPayload(PyTypeError::new_err(
                format!("callback returned a non-scalar {}", type_name(&result)),
            )))),
            Err(e) => Err(CallbackError::new(PyErrPayload(e))),
        }
    }
}

fn call_with_scalars<'py>(
    py: Python<'py>,
    callable: &Bound<'py, PyAny>,
    args: &[DynamicValue<'_>],
    kwargs: &IndexMap<String, DynamicValue<'_>>,
) -> PyResult<Bound<'py, PyAny>> {
    let mut objects = Vec::with_capacity(args.len());
    for arg in args {
        objects.push(scalar_to_py(py, arg)?);
    }
    let tuple = PyTuple::new(py, objects)?;
    if kwargs.is_empty() {
        callable.call(tuple, None)
    } else {
        let dict = PyDict::new(py);
        for (name, value) in kwargs {
            dict.set_item(name, scalar_to_py(py, value)?)?;
        }
        callable.call(tuple, Some(&dict))
    }
}
