//! The [`DynamicValue`] tagged union: the runtime value model exchanged
//! with the dynamically typed host.
//!
//! Every value that crosses the boundary is one of a closed set of tags.
//! Conversion sites match exhaustively on the tag; new host kinds are
//! added by extending the union, never through an untyped fallback.
//!
//! The `'call` lifetime is the ownership contract with the host: variants
//! that view host-owned memory (`Bytes`, `ByteBuffer`, `Sequence`,
//! `Callable`, `Array`) borrow it for the duration of one host call and
//! cannot be stored past it.

use std::fmt;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::traits::{HostCallable, SequenceHost};

/// A dynamically tagged value received from or returned to the host.
#[derive(Clone)]
pub enum DynamicValue<'call> {
    /// The host's null/absent value.
    None,
    /// A boolean. Never interchanged with numeric tags.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A single-precision float, produced by native code.
    Float32(f32),
    /// A double-precision float. Host floats arrive with this tag.
    Float64(f64),
    /// An immutable byte sequence owned by the host.
    Bytes(&'call [u8]),
    /// Mutable byte storage owned by the host. Writes through the view
    /// are visible to the host object as soon as the call returns.
    ByteBuffer(ByteBufferRef<'call>),
    /// An ordered mutable sequence living in the host.
    Sequence(&'call dyn SequenceHost),
    /// A host closure, invocable through the callback bridge.
    Callable(&'call dyn HostCallable),
    /// A host array-like exposing a buffer protocol (possibly one we
    /// deliberately do not support).
    Array(ArrayHandle<'call>),
}

impl DynamicValue<'_> {
    /// The discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::None => ValueKind::None,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float32(_) => ValueKind::Float32,
            Self::Float64(_) => ValueKind::Float64,
            Self::Bytes(_) => ValueKind::Bytes,
            Self::ByteBuffer(_) => ValueKind::ByteBuffer,
            Self::Sequence(_) => ValueKind::Sequence,
            Self::Callable(_) => ValueKind::Callable,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// The numeric value promoted to `f64`, if this tag is numeric.
    ///
    /// Booleans are not numeric here; the binder never interchanges them.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float32(v) => Some(f64::from(*v)),
            Self::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Host truthiness: empty, zero, and `None` are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(v) => *v,
            Self::Int(v) => *v != 0,
            Self::Float32(v) => *v != 0.0,
            Self::Float64(v) => *v != 0.0,
            Self::Bytes(b) => !b.is_empty(),
            Self::ByteBuffer(b) => !b.is_empty(),
            Self::Sequence(s) => s.len() != 0,
            Self::Callable(_) => true,
            Self::Array(a) => a.element_count().map_or(true, |n| n != 0),
        }
    }
}

impl fmt::Debug for DynamicValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Float32(v) => write!(f, "Float32({v})"),
            Self::Float64(v) => write!(f, "Float64({v})"),
            Self::Bytes(b) => write!(f, "Bytes(len={})", b.len()),
            Self::ByteBuffer(b) => write!(f, "ByteBuffer(len={})", b.len()),
            Self::Sequence(s) => write!(f, "Sequence(len={})", s.len()),
            Self::Callable(_) => write!(f, "Callable"),
            Self::Array(a) => write!(f, "Array({:?})", a.protocol()),
        }
    }
}

/// Structural equality for scalar and byte tags.
///
/// Host-handle tags (`Sequence`, `Callable`, mutable buffers, arrays)
/// have no meaningful value equality and always compare unequal.
impl PartialEq for DynamicValue<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float32(a), Self::Float32(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            _ => false,
        }
    }
}

/// The discriminant of a [`DynamicValue`], used in error reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// The host's null/absent value.
    None,
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Single-precision float.
    Float32,
    /// Double-precision float.
    Float64,
    /// Immutable byte sequence.
    Bytes,
    /// Mutable byte storage.
    ByteBuffer,
    /// Ordered host sequence.
    Sequence,
    /// Host closure.
    Callable,
    /// Host array-like.
    Array,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bytes => "bytes",
            Self::ByteBuffer => "byte buffer",
            Self::Sequence => "sequence",
            Self::Callable => "callable",
            Self::Array => "array",
        };
        f.write_str(name)
    }
}

/// A zero-copy view over mutable byte storage owned by the host.
///
/// The view is only valid for the call in which it was produced; the
/// `'call` borrow enforces that. Exclusive access for the duration of the
/// call is a caller contract (the host must not concurrently mutate the
/// same storage), not something this type can check.
#[derive(Clone, Copy)]
pub struct ByteBufferRef<'call> {
    addr: *mut u8,
    len: usize,
    _host: PhantomData<&'call mut [u8]>,
}

impl<'call> ByteBufferRef<'call> {
    /// Wrap a raw pointer to host-managed contiguous byte storage.
    ///
    /// # Safety
    ///
    /// `addr` must point to `len` bytes of initialized storage that stays
    /// valid and is not mutated elsewhere for the lifetime `'call`.
    #[allow(unsafe_code)]
    pub unsafe fn from_raw(addr: *mut u8, len: usize) -> Self {
        Self {
            addr,
            len,
            _host: PhantomData,
        }
    }

    /// Wrap natively owned storage. Used by tests and native callers.
    pub fn from_slice(storage: &'call mut [u8]) -> Self {
        Self {
            addr: storage.as_mut_ptr(),
            len: storage.len(),
            _host: PhantomData,
        }
    }

    /// Base address of the storage.
    pub fn addr(&self) -> *mut u8 {
        self.addr
    }

    /// Length of the storage in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the storage is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// A handle to a host array-like object.
///
/// Carries either a recognized dense single-precision ndarray (base
/// address, shape, byte strides, any rank) or the name of a buffer
/// protocol variant we recognize as a category but deliberately do not
/// support.
#[derive(Clone)]
pub struct ArrayHandle<'call> {
    protocol: ArrayProtocol,
    _host: PhantomData<&'call [u8]>,
}

/// The memory-exchange protocol behind an [`ArrayHandle`].
#[derive(Clone, Debug)]
pub enum ArrayProtocol {
    /// A dense `f32` ndarray described by base address, element counts
    /// per axis, and byte strides per axis.
    F32Strided {
        /// Base address of the first element.
        addr: usize,
        /// Element count per axis, outermost first.
        shape: SmallVec<[usize; 4]>,
        /// Byte stride per axis.
        strides: SmallVec<[isize; 4]>,
    },
    /// A buffer-category object whose exchange representation is
    /// deliberately unsupported. Constructing a descriptor from it fails
    /// predictably instead of degrading to a best-effort view.
    Unsupported {
        /// Host-facing name of the protocol (e.g. `"memoryview"`).
        protocol: &'static str,
    },
}

impl<'call> ArrayHandle<'call> {
    /// Wrap a dense single-precision host ndarray.
    ///
    /// # Safety
    ///
    /// `addr` must be the base address of an `f32` array whose every
    /// element reachable through `shape`/`strides` stays valid and is not
    /// mutated elsewhere for the lifetime `'call`. `shape` and `strides`
    /// must have equal length.
    #[allow(unsafe_code)]
    pub unsafe fn f32_strided(addr: *const f32, shape: &[usize], strides: &[isize]) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Self {
            protocol: ArrayProtocol::F32Strided {
                addr: addr as usize,
                shape: SmallVec::from_slice(shape),
                strides: SmallVec::from_slice(strides),
            },
            _host: PhantomData,
        }
    }

    /// Mark a buffer-category host object as deliberately unsupported.
    pub fn unsupported(protocol: &'static str) -> Self {
        Self {
            protocol: ArrayProtocol::Unsupported { protocol },
            _host: PhantomData,
        }
    }

    /// The protocol behind this handle.
    pub fn protocol(&self) -> &ArrayProtocol {
        &self.protocol
    }

    /// Total element count, if the protocol exposes a shape.
    pub fn element_count(&self) -> Option<usize> {
        match &self.protocol {
            ArrayProtocol::F32Strided { shape, .. } => Some(shape.iter().product()),
            ArrayProtocol::Unsupported { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_tag() {
        assert_eq!(DynamicValue::None.kind(), ValueKind::None);
        assert_eq!(DynamicValue::Int(3).kind(), ValueKind::Int);
        assert_eq!(DynamicValue::Float32(1.0).kind(), ValueKind::Float32);
        assert_eq!(DynamicValue::Bytes(b"ab").kind(), ValueKind::Bytes);
    }

    #[test]
    fn numeric_promotion() {
        assert_eq!(DynamicValue::Int(5).as_f64(), Some(5.0));
        assert_eq!(DynamicValue::Float32(0.5).as_f64(), Some(0.5));
        assert_eq!(DynamicValue::Float64(-3.14).as_f64(), Some(-3.14));
        assert_eq!(DynamicValue::Bool(true).as_f64(), None);
        assert_eq!(DynamicValue::Bytes(b"1").as_f64(), None);
    }

    #[test]
    fn truthiness_follows_host_rules() {
        assert!(!DynamicValue::None.is_truthy());
        assert!(!DynamicValue::Bool(false).is_truthy());
        assert!(!DynamicValue::Int(0).is_truthy());
        assert!(!DynamicValue::Bytes(b"").is_truthy());
        assert!(DynamicValue::Bool(true).is_truthy());
        assert!(DynamicValue::Int(-1).is_truthy());
        assert!(DynamicValue::Float64(0.1).is_truthy());
        assert!(DynamicValue::Bytes(b"x").is_truthy());
    }

    #[test]
    fn scalar_equality_is_tag_exact() {
        assert_eq!(DynamicValue::Int(1), DynamicValue::Int(1));
        assert_ne!(DynamicValue::Int(1), DynamicValue::Float64(1.0));
        assert_ne!(DynamicValue::Bool(true), DynamicValue::Int(1));
        assert_eq!(DynamicValue::Bytes(b"ab"), DynamicValue::Bytes(b"ab"));
    }

    #[test]
    fn byte_buffer_ref_views_storage() {
        let mut storage = vec![0u8; 4];
        let view = ByteBufferRef::from_slice(&mut storage);
        assert_eq!(view.len(), 4);
        assert!(!view.is_empty());
    }

    #[test]
    fn array_handle_element_count() {
        let data = [1.0f32; 6];
        #[allow(unsafe_code)]
        let handle = unsafe { ArrayHandle::f32_strided(data.as_ptr(), &[2, 3], &[12, 4]) };
        assert_eq!(handle.element_count(), Some(6));
        assert_eq!(ArrayHandle::unsupported("memoryview").element_count(), None);
    }
}
