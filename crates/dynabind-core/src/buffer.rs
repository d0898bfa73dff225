//! Buffer descriptors: non-owning structured views over host memory.
//!
//! A [`BufferDescriptor`] records address, layout (shape and byte
//! strides, any rank), element size, and mutability for a region of
//! contiguous or strided host storage. Construction never copies the
//! underlying storage; a mutable descriptor is a live view, so writes
//! are visible to the host object without an explicit flush.

use std::fmt;
use std::marker::PhantomData;

use smallvec::{smallvec, SmallVec};

use crate::error::BufferError;
use crate::value::{ArrayProtocol, ByteBufferRef, DynamicValue, ValueKind};

/// Whether the descriptor views host-owned or natively owned storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    /// The host owns the storage; the view must not outlive the call.
    Borrowed,
    /// Native code owns the storage (test fixtures, scratch buffers).
    Owned,
}

/// What kind of view the binder is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferRequest {
    /// Read-only byte view.
    Bytes,
    /// Writable byte view.
    BytesMut,
    /// Read-only single-precision ndarray view, any rank.
    ArrayF32,
}

/// A non-owning descriptor over contiguous or strided host memory.
///
/// Invariant: `length_bytes == shape.iter().product() * item_size`,
/// validated at construction. The `'call` borrow keeps the descriptor
/// from outliving the host object it was derived from.
#[derive(Clone)]
pub struct BufferDescriptor<'call> {
    addr: *mut u8,
    length_bytes: usize,
    item_size: usize,
    shape: SmallVec<[usize; 4]>,
    strides: SmallVec<[isize; 4]>,
    mutable: bool,
    origin: Origin,
    source_kind: ValueKind,
    _host: PhantomData<&'call [u8]>,
}

fn element_name(item_size: usize) -> &'static str {
    match item_size {
        1 => "byte",
        4 => "float32",
        _ => "unknown",
    }
}

impl<'call> BufferDescriptor<'call> {
    /// Construct a descriptor from explicit raw parts.
    ///
    /// Validates the shape/length invariant. This is the single choke
    /// point every other constructor goes through.
    ///
    /// # Safety
    ///
    /// `addr` must point to `length_bytes` bytes of initialized storage
    /// valid for reads (and writes, if `mutable`) for the lifetime
    /// `'call`, and every offset reachable through `shape`/`strides`
    /// must land inside that storage.
    #[allow(unsafe_code)]
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn from_raw_parts(
        addr: *mut u8,
        length_bytes: usize,
        item_size: usize,
        shape: &[usize],
        strides: &[isize],
        mutable: bool,
        origin: Origin,
        source_kind: ValueKind,
    ) -> Result<Self, BufferError> {
        let shape_elements: usize = shape.iter().product();
        if shape_elements * item_size != length_bytes {
            return Err(BufferError::LengthMismatch {
                length_bytes,
                shape_elements,
                item_size,
            });
        }
        Ok(Self {
            addr,
            length_bytes,
            item_size,
            shape: SmallVec::from_slice(shape),
            strides: SmallVec::from_slice(strides),
            mutable,
            origin,
            source_kind,
            _host: PhantomData,
        })
    }

    /// Read-only rank-1 byte descriptor over an immutable host sequence.
    pub fn from_bytes(bytes: &'call [u8]) -> Self {
        Self {
            // Never written: the mutable flag stays false.
            addr: bytes.as_ptr() as *mut u8,
            length_bytes: bytes.len(),
            item_size: 1,
            shape: smallvec![bytes.len()],
            strides: smallvec![1],
            mutable: false,
            origin: Origin::Borrowed,
            source_kind: ValueKind::Bytes,
            _host: PhantomData,
        }
    }

    /// Rank-1 byte descriptor over mutable host storage.
    pub fn from_byte_buffer(view: ByteBufferRef<'call>, mutable: bool) -> Self {
        Self {
            addr: view.addr(),
            length_bytes: view.len(),
            item_size: 1,
            shape: smallvec![view.len()],
            strides: smallvec![1],
            mutable,
            origin: Origin::Borrowed,
            source_kind: ValueKind::ByteBuffer,
            _host: PhantomData,
        }
    }

    /// Construct the view a declared parameter type asks for from a
    /// dynamically tagged value.
    ///
    /// This is the buffer-protocol dispatch point: exact matches produce
    /// zero-copy descriptors, recognized-but-unsupported protocols fail
    /// with [`BufferError::UnsupportedProtocol`], and everything else is
    /// a type mismatch. No storage is read or written on any path.
    #[allow(unsafe_code)]
    pub fn from_value(
        value: &DynamicValue<'call>,
        request: BufferRequest,
    ) -> Result<Self, BufferError> {
        match value {
            DynamicValue::Bytes(bytes) => match request {
                BufferRequest::Bytes => Ok(Self::from_bytes(bytes)),
                BufferRequest::BytesMut => Err(BufferError::NotWritable {
                    kind: ValueKind::Bytes,
                }),
                BufferRequest::ArrayF32 => Err(BufferError::ElementMismatch {
                    expected: "float32",
                    found: "byte",
                }),
            },
            DynamicValue::ByteBuffer(view) => match request {
                BufferRequest::Bytes => Ok(Self::from_byte_buffer(*view, false)),
                BufferRequest::BytesMut => Ok(Self::from_byte_buffer(*view, true)),
                BufferRequest::ArrayF32 => Err(BufferError::ElementMismatch {
                    expected: "float32",
                    found: "byte",
                }),
            },
            DynamicValue::Array(handle) => match handle.protocol() {
                ArrayProtocol::Unsupported { protocol } => Err(BufferError::UnsupportedProtocol {
                    protocol: (*protocol).to_string(),
                }),
                ArrayProtocol::F32Strided {
                    addr,
                    shape,
                    strides,
                } => match request {
                    BufferRequest::ArrayF32 => {
                        let length_bytes = shape.iter().product::<usize>() * 4;
                        // SAFETY: the ArrayHandle constructor's contract
                        // guarantees the address, shape, and strides
                        // describe live host storage for 'call.
                        unsafe {
                            Self::from_raw_parts(
                                *addr as *mut u8,
                                length_bytes,
                                4,
                                shape,
                                strides,
                                false,
                                Origin::Borrowed,
                                ValueKind::Array,
                            )
                        }
                    }
                    BufferRequest::Bytes | BufferRequest::BytesMut => {
                        Err(BufferError::ElementMismatch {
                            expected: "byte",
                            found: "float32",
                        })
                    }
                },
            },
            other => Err(BufferError::NotABuffer { kind: other.kind() }),
        }
    }

    /// Base address of the viewed storage.
    pub fn addr(&self) -> *mut u8 {
        self.addr
    }

    /// Total byte length of the viewed storage.
    pub fn length_bytes(&self) -> usize {
        self.length_bytes
    }

    /// Size of one element in bytes.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// Element count per axis, outermost first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Byte stride per axis.
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether writes through this descriptor are permitted.
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Who owns the viewed storage.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The dynamic tag of the value this descriptor was derived from.
    pub fn source_kind(&self) -> ValueKind {
        self.source_kind
    }

    /// Whether the layout is dense row-major.
    pub fn is_contiguous(&self) -> bool {
        if self.element_count() == 0 {
            return true;
        }
        let mut expected = self.item_size as isize;
        for (dim, stride) in self.shape.iter().zip(self.strides.iter()).rev() {
            if *stride != expected {
                return false;
            }
            expected *= *dim as isize;
        }
        true
    }

    /// The storage as a contiguous byte slice.
    ///
    /// Fails with [`BufferError::ElementMismatch`] unless the descriptor
    /// is a contiguous byte view.
    #[allow(unsafe_code)]
    pub fn as_bytes(&self) -> Result<&[u8], BufferError> {
        if self.item_size != 1 || !self.is_contiguous() {
            return Err(BufferError::ElementMismatch {
                expected: "byte",
                found: element_name(self.item_size),
            });
        }
        // SAFETY: construction guaranteed addr..addr+length_bytes is
        // valid for reads for 'call, and &self keeps the view alive.
        Ok(unsafe { std::slice::from_raw_parts(self.addr, self.length_bytes) })
    }

    /// The storage as a writable contiguous byte slice.
    ///
    /// Fails with [`BufferError::NotWritable`] for read-only views.
    /// Writes land directly in the host object's storage.
    #[allow(unsafe_code)]
    pub fn as_bytes_mut(&mut self) -> Result<&mut [u8], BufferError> {
        if !self.mutable {
            return Err(BufferError::NotWritable {
                kind: self.source_kind,
            });
        }
        if self.item_size != 1 || !self.is_contiguous() {
            return Err(BufferError::ElementMismatch {
                expected: "byte",
                found: element_name(self.item_size),
            });
        }
        // SAFETY: construction guaranteed writability for 'call, and the
        // host does not mutate the storage concurrently (caller contract).
        Ok(unsafe { std::slice::from_raw_parts_mut(self.addr, self.length_bytes) })
    }

    /// Contiguous fast path: the storage as an `f32` slice, if densely
    /// packed and suitably aligned.
    #[allow(unsafe_code)]
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        if self.item_size != 4 || !self.is_contiguous() {
            return None;
        }
        if self.addr.align_offset(std::mem::align_of::<f32>()) != 0 {
            return None;
        }
        // SAFETY: contiguity, alignment, and item size checked above;
        // construction guaranteed the region is valid for reads.
        Some(unsafe { std::slice::from_raw_parts(self.addr as *const f32, self.element_count()) })
    }
}

impl fmt::Debug for BufferDescriptor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferDescriptor")
            .field("length_bytes", &self.length_bytes)
            .field("item_size", &self.item_size)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("mutable", &self.mutable)
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ArrayHandle;

    #[test]
    fn bytes_descriptor_is_rank_one_readonly() {
        let data = b"\x00\x01\x02\x03";
        let desc = BufferDescriptor::from_value(&DynamicValue::Bytes(data), BufferRequest::Bytes)
            .unwrap();
        assert_eq!(desc.rank(), 1);
        assert_eq!(desc.shape(), &[4]);
        assert_eq!(desc.length_bytes(), 4);
        assert!(!desc.is_mutable());
        assert!(desc.is_contiguous());
        assert_eq!(desc.as_bytes().unwrap(), data);
    }

    #[test]
    fn immutable_bytes_reject_writable_view() {
        let data = b"abcd";
        let err = BufferDescriptor::from_value(&DynamicValue::Bytes(data), BufferRequest::BytesMut)
            .unwrap_err();
        assert_eq!(
            err,
            BufferError::NotWritable {
                kind: ValueKind::Bytes
            }
        );
    }

    #[test]
    fn mutable_view_writes_reach_backing_storage() {
        let mut storage = vec![0u8; 4];
        {
            let view = ByteBufferRef::from_slice(&mut storage);
            let value = DynamicValue::ByteBuffer(view);
            let mut desc =
                BufferDescriptor::from_value(&value, BufferRequest::BytesMut).unwrap();
            assert!(desc.is_mutable());
            for (i, b) in desc.as_bytes_mut().unwrap().iter_mut().enumerate() {
                *b = i as u8;
            }
        }
        assert_eq!(storage, vec![0, 1, 2, 3]);
    }

    #[test]
    fn unsupported_protocol_is_an_explicit_refusal() {
        let value = DynamicValue::Array(ArrayHandle::unsupported("memoryview"));
        for request in [
            BufferRequest::Bytes,
            BufferRequest::BytesMut,
            BufferRequest::ArrayF32,
        ] {
            let err = BufferDescriptor::from_value(&value, request).unwrap_err();
            assert_eq!(
                err,
                BufferError::UnsupportedProtocol {
                    protocol: "memoryview".into()
                }
            );
        }
    }

    #[test]
    fn f32_array_descriptor_keeps_host_layout() {
        let data: Vec<f32> = (0..6).map(|i| i as f32).collect();
        #[allow(unsafe_code)]
        let handle = unsafe { ArrayHandle::f32_strided(data.as_ptr(), &[2, 3], &[12, 4]) };
        let value = DynamicValue::Array(handle);
        let desc = BufferDescriptor::from_value(&value, BufferRequest::ArrayF32).unwrap();
        assert_eq!(desc.shape(), &[2, 3]);
        assert_eq!(desc.strides(), &[12, 4]);
        assert_eq!(desc.item_size(), 4);
        assert_eq!(desc.element_count(), 6);
        assert!(desc.is_contiguous());
        assert_eq!(desc.as_f32_slice().unwrap(), &data[..]);
    }

    #[test]
    fn f32_array_rejects_byte_requests() {
        let data = [0.0f32; 2];
        #[allow(unsafe_code)]
        let handle = unsafe { ArrayHandle::f32_strided(data.as_ptr(), &[2], &[4]) };
        let value = DynamicValue::Array(handle);
        let err = BufferDescriptor::from_value(&value, BufferRequest::Bytes).unwrap_err();
        assert!(matches!(err, BufferError::ElementMismatch { .. }));
    }

    #[test]
    fn scalars_are_not_buffers() {
        let err =
            BufferDescriptor::from_value(&DynamicValue::Int(3), BufferRequest::Bytes).unwrap_err();
        assert_eq!(
            err,
            BufferError::NotABuffer {
                kind: ValueKind::Int
            }
        );
    }

    #[test]
    fn length_invariant_is_validated() {
        let mut storage = vec![0u8; 7];
        #[allow(unsafe_code)]
        let err = unsafe {
            BufferDescriptor::from_raw_parts(
                storage.as_mut_ptr(),
                7,
                4,
                &[2],
                &[4],
                false,
                Origin::Owned,
                ValueKind::Array,
            )
        }
        .unwrap_err();
        assert_eq!(
            err,
            BufferError::LengthMismatch {
                length_bytes: 7,
                shape_elements: 2,
                item_size: 4
            }
        );
    }

    #[test]
    fn transposed_layout_is_not_contiguous() {
        let data = [0.0f32; 6];
        // A (3, 2) view with column-major strides.
        #[allow(unsafe_code)]
        let handle = unsafe { ArrayHandle::f32_strided(data.as_ptr(), &[3, 2], &[4, 12]) };
        let desc =
            BufferDescriptor::from_value(&DynamicValue::Array(handle), BufferRequest::ArrayF32)
                .unwrap();
        assert!(!desc.is_contiguous());
        assert!(desc.as_f32_slice().is_none());
    }
}
