//! CallError -> Python exception mapping.

use std::error::Error;
use std::fmt;

use pyo3::exceptions::{PyNotImplementedError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::PyErr;

use dynabind_core::{BindError, BufferError, CallError, CallbackError, SortError};

/// A raised Python exception, carried opaquely through the core as a
/// callback error payload. Downcasting it back recovers the original
/// exception object for rethrow.
pub(crate) struct PyErrPayload(pub(crate) PyErr);

impl fmt::Debug for PyErrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for PyErrPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl Error for PyErrPayload {}

/// The Python exception class a boundary error maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExceptionKind {
    /// `TypeError`: argument shape or type problems.
    Type,
    /// `NotImplementedError`: a recognized but refused buffer protocol.
    NotImplemented,
    /// `ValueError`: a value outside an algorithm's declared domain.
    Value,
    /// `RuntimeError`: callback failures with no Python exception inside.
    Runtime,
}

/// Classify a boundary error. Pure, so the mapping is unit-testable
/// without a live interpreter.
pub(crate) fn exception_kind(err: &CallError) -> ExceptionKind {
    match err {
        CallError::Bind(_) => ExceptionKind::Type,
        CallError::Buffer(BufferError::UnsupportedProtocol { .. }) => ExceptionKind::NotImplemented,
        CallError::Buffer(_) => ExceptionKind::Type,
        CallError::Sort(SortError::KeyOutOfRange { .. }) => ExceptionKind::Value,
        CallError::Sort(_) => ExceptionKind::Type,
        CallError::Callback(_) => ExceptionKind::Runtime,
    }
}

/// Convert a boundary error to the Python exception to raise.
///
/// A callback error whose payload is a Python exception rethrows that
/// exception unchanged; everything else raises a fresh exception of the
/// classified type carrying the error's display text.
pub(crate) fn to_py_err(err: CallError) -> PyErr {
    match err {
        CallError::Callback(cb) => match cb.into_payload().downcast::<PyErrPayload>() {
            Ok(payload) => payload.0,
            Err(other) => PyRuntimeError::new_err(format!("callback raised: {other}")),
        },
        other => {
            let message = other.to_string();
            match exception_kind(&other) {
                ExceptionKind::Type => PyTypeError::new_err(message),
                ExceptionKind::NotImplemented => PyNotImplementedError::new_err(message),
                ExceptionKind::Value => PyValueError::new_err(message),
                ExceptionKind::Runtime => PyRuntimeError::new_err(message),
            }
        }
    }
}

/// Shorthand for accessor errors inside function bodies.
pub(crate) fn arg_err(err: BindError) -> PyErr {
    to_py_err(err.into())
}

/// Shorthand for buffer access errors inside function bodies.
pub(crate) fn buffer_err(err: BufferError) -> PyErr {
    to_py_err(err.into())
}

/// Shorthand for sort domain errors inside function bodies.
pub(crate) fn sort_err(err: SortError) -> PyErr {
    to_py_err(err.into())
}

/// Shorthand for callback failures inside function bodies.
pub(crate) fn callback_err(err: CallbackError) -> PyErr {
    to_py_err(err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynabind_core::{DeclaredType, ValueKind};

    #[test]
    fn bind_errors_map_to_type_error() {
        let err = CallError::from(BindError::MissingArgument {
            function: "divide_f32".into(),
            param: "b".into(),
        });
        assert_eq!(exception_kind(&err), ExceptionKind::Type);

        let err = CallError::from(BindError::TypeMismatch {
            function: "divide_f32".into(),
            param: "a".into(),
            expected: DeclaredType::F32,
            got: ValueKind::Bytes,
        });
        assert_eq!(exception_kind(&err), ExceptionKind::Type);
    }

    #[test]
    fn refused_protocol_maps_to_not_implemented() {
        let err = CallError::from(BufferError::UnsupportedProtocol {
            protocol: "memoryview".into(),
        });
        assert_eq!(exception_kind(&err), ExceptionKind::NotImplemented);

        // Other buffer failures stay TypeError.
        let err = CallError::from(BufferError::NotWritable {
            kind: ValueKind::Bytes,
        });
        assert_eq!(exception_kind(&err), ExceptionKind::Type);
    }

    #[test]
    fn sort_domain_violations_split_value_and_type() {
        let err = CallError::from(SortError::KeyOutOfRange {
            index: 1,
            value: 400,
        });
        assert_eq!(exception_kind(&err), ExceptionKind::Value);

        let err = CallError::from(SortError::UnsupportedElement {
            index: 0,
            kind: ValueKind::Callable,
        });
        assert_eq!(exception_kind(&err), ExceptionKind::Type);
    }

    #[test]
    fn opaque_callback_payloads_map_to_runtime_error() {
        let err = CallError::from(CallbackError::message("marshalling failed"));
        assert_eq!(exception_kind(&err), ExceptionKind::Runtime);
    }
}
