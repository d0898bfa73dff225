//! Flat traversal over arbitrary-rank buffer descriptors.
//!
//! Native reductions consume a descriptor through a single row-major
//! iteration regardless of rank: [`FlatOffsets`] walks the index space
//! with an odometer over `shape`, mapping each logical index onto a byte
//! offset through `strides`. Rank 1 and rank N share the same code path.

use smallvec::SmallVec;

use crate::buffer::BufferDescriptor;
use crate::error::BufferError;

/// Row-major iterator over the byte offsets of a descriptor's elements.
pub struct FlatOffsets<'d> {
    shape: &'d [usize],
    strides: &'d [isize],
    index: SmallVec<[usize; 4]>,
    remaining: usize,
}

impl<'d> FlatOffsets<'d> {
    fn new(desc: &'d BufferDescriptor<'_>) -> Self {
        let shape = desc.shape();
        Self {
            shape,
            strides: desc.strides(),
            index: SmallVec::from_elem(0, shape.len()),
            remaining: desc.element_count(),
        }
    }
}

impl Iterator for FlatOffsets<'_> {
    type Item = isize;

    fn next(&mut self) -> Option<isize> {
        if self.remaining == 0 {
            return None;
        }
        let offset = self
            .index
            .iter()
            .zip(self.strides)
            .map(|(i, s)| *i as isize * s)
            .sum();
        // Odometer increment, innermost axis fastest.
        for axis in (0..self.index.len()).rev() {
            self.index[axis] += 1;
            if self.index[axis] < self.shape[axis] {
                break;
            }
            self.index[axis] = 0;
        }
        self.remaining -= 1;
        Some(offset)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for FlatOffsets<'_> {}

/// Row-major iterator over the `f32` elements of a descriptor.
pub struct F32Elements<'d> {
    addr: *const u8,
    offsets: FlatOffsets<'d>,
}

impl Iterator for F32Elements<'_> {
    type Item = f32;

    #[allow(unsafe_code)]
    fn next(&mut self) -> Option<f32> {
        let offset = self.offsets.next()?;
        // SAFETY: descriptor construction guaranteed every offset
        // reachable through shape/strides lands in live storage.
        // read_unaligned because strided host layouts need not keep
        // element alignment.
        Some(unsafe { (self.addr.offset(offset) as *const f32).read_unaligned() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.offsets.size_hint()
    }
}

impl ExactSizeIterator for F32Elements<'_> {}

impl<'call> BufferDescriptor<'call> {
    /// Byte offsets of every element in row-major order.
    pub fn flat_offsets(&self) -> FlatOffsets<'_> {
        FlatOffsets::new(self)
    }

    /// The elements in row-major order, for `f32` descriptors.
    ///
    /// Fails with [`BufferError::ElementMismatch`] if the element size
    /// is not 4 bytes.
    pub fn f32_elements(&self) -> Result<F32Elements<'_>, BufferError> {
        if self.item_size() != 4 {
            return Err(BufferError::ElementMismatch {
                expected: "float32",
                found: if self.item_size() == 1 { "byte" } else { "unknown" },
            });
        }
        Ok(F32Elements {
            addr: self.addr() as *const u8,
            offsets: self.flat_offsets(),
        })
    }

    /// Sum the elements of an `f32` descriptor of any rank.
    ///
    /// Uses the dense slice fast path when the layout allows it.
    pub fn sum_f32(&self) -> Result<f32, BufferError> {
        if let Some(slice) = self.as_f32_slice() {
            return Ok(slice.iter().sum());
        }
        Ok(self.f32_elements()?.sum())
    }
}
