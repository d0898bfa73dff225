//! Error types for the boundary layer.
//!
//! The taxonomy is deliberately small and stable: binding errors, buffer
//! errors, algorithm-domain errors, and opaque host callback errors, with
//! [`CallError`] as the umbrella the binding crates map onto host
//! exception types. Every error is reported synchronously to the
//! immediate caller; nothing is swallowed or downgraded to a log line.

use std::error::Error;
use std::fmt;

use crate::signature::DeclaredType;
use crate::value::ValueKind;

/// Errors detected while resolving a call's arguments against a
/// [`FunctionSignature`](crate::signature::FunctionSignature).
///
/// All variants surface to the host as its generic argument-type error;
/// the host is not expected to distinguish sub-kinds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BindError {
    /// A required parameter was left unfilled by both passes.
    MissingArgument {
        /// The called function.
        function: String,
        /// Name of the unfilled parameter.
        param: String,
    },
    /// A parameter was supplied both positionally and by keyword.
    DuplicateArgument {
        /// The called function.
        function: String,
        /// Name of the doubly supplied parameter.
        param: String,
    },
    /// A keyword name does not exist in the signature.
    UnexpectedKeyword {
        /// The called function.
        function: String,
        /// The stray keyword.
        keyword: String,
    },
    /// More positional arguments than declared parameters.
    TooManyPositional {
        /// The called function.
        function: String,
        /// Number of declared parameters.
        expected: usize,
        /// Number of positional arguments supplied.
        got: usize,
    },
    /// An argument's dynamic tag cannot be coerced to the declared type.
    TypeMismatch {
        /// The called function.
        function: String,
        /// Name of the parameter being filled.
        param: String,
        /// The declared parameter type.
        expected: DeclaredType,
        /// The argument's dynamic tag.
        got: ValueKind,
    },
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArgument { function, param } => {
                write!(f, "{function}() missing required argument '{param}'")
            }
            Self::DuplicateArgument { function, param } => {
                write!(f, "{function}() got multiple values for argument '{param}'")
            }
            Self::UnexpectedKeyword { function, keyword } => {
                write!(f, "{function}() got an unexpected keyword argument '{keyword}'")
            }
            Self::TooManyPositional {
                function,
                expected,
                got,
            } => {
                write!(
                    f,
                    "{function}() takes {expected} positional argument(s) but {got} were given"
                )
            }
            Self::TypeMismatch {
                function,
                param,
                expected,
                got,
            } => {
                write!(
                    f,
                    "{function}() argument '{param}': expected {expected}, got {got}"
                )
            }
        }
    }
}

impl Error for BindError {}

/// Errors from constructing or accessing a buffer descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferError {
    /// The value exposes no recognized buffer protocol at all.
    NotABuffer {
        /// The value's dynamic tag.
        kind: ValueKind,
    },
    /// A mutable view was requested over immutable storage.
    NotWritable {
        /// The value's dynamic tag.
        kind: ValueKind,
    },
    /// The buffer's element kind does not match the request.
    ElementMismatch {
        /// The requested element kind.
        expected: &'static str,
        /// The buffer's actual element kind.
        found: &'static str,
    },
    /// A buffer-category protocol recognized but deliberately not
    /// supported. Distinct from [`NotABuffer`](Self::NotABuffer): this is
    /// an explicit refusal, not a type mismatch.
    UnsupportedProtocol {
        /// Host-facing name of the protocol.
        protocol: String,
    },
    /// The declared shape does not account for the buffer's byte length.
    LengthMismatch {
        /// Byte length of the underlying storage.
        length_bytes: usize,
        /// Element count implied by the shape.
        shape_elements: usize,
        /// Size of one element in bytes.
        item_size: usize,
    },
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotABuffer { kind } => {
                write!(f, "{kind} does not expose a supported buffer protocol")
            }
            Self::NotWritable { kind } => {
                write!(f, "cannot construct a mutable view over immutable {kind}")
            }
            Self::ElementMismatch { expected, found } => {
                write!(f, "expected a {expected} buffer, found {found}")
            }
            Self::UnsupportedProtocol { protocol } => {
                write!(f, "the {protocol} buffer protocol is not supported")
            }
            Self::LengthMismatch {
                length_bytes,
                shape_elements,
                item_size,
            } => {
                write!(
                    f,
                    "shape declares {shape_elements} element(s) of {item_size} byte(s) \
                     but storage is {length_bytes} byte(s)"
                )
            }
        }
    }
}

impl Error for BufferError {}

/// Errors from the in-place sorting algorithms.
///
/// Domain violations are detected before any reordering, so a failed
/// sort leaves the input as it was.
#[derive(Clone, Debug, PartialEq)]
pub enum SortError {
    /// An element's tag is outside the algorithm's supported domain.
    UnsupportedElement {
        /// Position of the offending element.
        index: usize,
        /// Its dynamic tag.
        kind: ValueKind,
    },
    /// An integer key outside the supported byte width. Restricting the
    /// radix sort to its declared domain is by design; keys are never
    /// wrapped or truncated silently.
    KeyOutOfRange {
        /// Position of the offending key.
        index: usize,
        /// The key value.
        value: i64,
    },
    /// The host failed while the sequence was being read or written.
    HostAccess {
        /// Host-provided description of the failure.
        message: String,
    },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedElement { index, kind } => {
                write!(f, "element {index} has unsupported kind {kind}")
            }
            Self::KeyOutOfRange { index, value } => {
                write!(
                    f,
                    "element {index} is {value}, outside the supported key range 0..=255"
                )
            }
            Self::HostAccess { message } => write!(f, "host sequence access failed: {message}"),
        }
    }
}

impl Error for SortError {}

/// A host closure invoked through the callback bridge signaled failure.
///
/// The payload is opaque to the native layer: it is carried unchanged so
/// the boundary can rethrow the host's original error to the ultimate
/// caller.
#[derive(Debug)]
pub struct CallbackError {
    payload: Box<dyn Error + Send + Sync + 'static>,
}

impl CallbackError {
    /// Wrap an opaque host error payload.
    pub fn new(payload: impl Error + Send + Sync + 'static) -> Self {
        Self {
            payload: Box::new(payload),
        }
    }

    /// Construct from a plain message, for failures that originate on
    /// the native side of the bridge (e.g. an unmarshallable result).
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            payload: Box::from(message.into()),
        }
    }

    /// Borrow the opaque payload.
    pub fn payload(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.payload.as_ref()
    }

    /// Take the opaque payload, e.g. to downcast it back to the host's
    /// native error type.
    pub fn into_payload(self) -> Box<dyn Error + Send + Sync + 'static> {
        self.payload
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "callback raised: {}", self.payload)
    }
}

impl Error for CallbackError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.payload.as_ref() as &(dyn Error + 'static))
    }
}

/// Umbrella error for one host call through the boundary layer.
#[derive(Debug)]
pub enum CallError {
    /// Argument binding failed.
    Bind(BindError),
    /// Buffer descriptor construction or access failed.
    Buffer(BufferError),
    /// A sorting algorithm rejected its input domain.
    Sort(SortError),
    /// A host callback signaled failure.
    Callback(CallbackError),
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => e.fmt(f),
            Self::Buffer(e) => e.fmt(f),
            Self::Sort(e) => e.fmt(f),
            Self::Callback(e) => e.fmt(f),
        }
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bind(e) => Some(e),
            Self::Buffer(e) => Some(e),
            Self::Sort(e) => Some(e),
            Self::Callback(e) => Some(e),
        }
    }
}

impl From<BindError> for CallError {
    fn from(e: BindError) -> Self {
        Self::Bind(e)
    }
}

impl From<BufferError> for CallError {
    fn from(e: BufferError) -> Self {
        Self::Buffer(e)
    }
}

impl From<SortError> for CallError {
    fn from(e: SortError) -> Self {
        Self::Sort(e)
    }
}

impl From<CallbackError> for CallError {
    fn from(e: CallbackError) -> Self {
        Self::Callback(e)
    }
}
