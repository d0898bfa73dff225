//! The callback bridge: invoking host closures from native code.
//!
//! A [`CallbackBridge`] wraps a borrowed [`HostCallable`] for one call
//! boundary. The borrow is the ownership contract: the bridge cannot be
//! stored past the host call that produced the handle, so lifetime
//! violations are compile errors rather than conventions.

use indexmap::IndexMap;

use crate::error::CallbackError;
use crate::traits::HostCallable;
use crate::value::DynamicValue;

/// A call-scoped wrapper around a host closure.
///
/// Invocation is synchronous: it re-enters the host's own dispatch
/// machinery and blocks until the closure returns or raises. The bridge
/// performs no arity pre-validation; an argument-count mismatch surfaces
/// as whatever error the closure itself produces.
#[derive(Clone, Copy)]
pub struct CallbackBridge<'call> {
    handle: &'call dyn HostCallable,
}

impl<'call> CallbackBridge<'call> {
    /// Wrap a host closure handle for the current call.
    pub fn new(handle: &'call dyn HostCallable) -> Self {
        Self { handle }
    }

    /// Invoke the closure with positional arguments only.
    pub fn invoke(
        &self,
        args: &[DynamicValue<'_>],
    ) -> Result<DynamicValue<'static>, CallbackError> {
        self.invoke_kw(args, &IndexMap::new())
    }

    /// Invoke the closure with positional and keyword arguments.
    ///
    /// A host-side error comes back as a [`CallbackError`] carrying the
    /// host's payload opaquely; the native layer does not interpret it.
    pub fn invoke_kw(
        &self,
        args: &[DynamicValue<'_>],
        kwargs: &IndexMap<String, DynamicValue<'_>>,
    ) -> Result<DynamicValue<'static>, CallbackError> {
        self.handle.invoke(args, kwargs)
    }
}
