//! Host-interop traits: the seams where the native layer reaches back
//! into the dynamically typed host.
//!
//! The Python binding crate implements these over live host objects; the
//! test-utils crate provides mock implementations backed by native
//! storage.

use indexmap::IndexMap;

use crate::error::{CallbackError, SortError};
use crate::value::DynamicValue;

/// An ordered mutable sequence living in the host (e.g. a Python list).
///
/// The in-place sorting operations read the sequence through
/// [`snapshot`](SequenceHost::snapshot) and publish the reordered
/// elements through [`store`](SequenceHost::store), so the object the
/// host passed in reflects the result when the call returns.
pub trait SequenceHost {
    /// Number of elements in the sequence.
    fn len(&self) -> usize;

    /// Whether the sequence is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read all elements as owned scalar values.
    ///
    /// Fails with [`SortError::UnsupportedElement`] if an element is not
    /// representable as an owned scalar, or [`SortError::HostAccess`] if
    /// the host itself fails mid-read.
    fn snapshot(&self) -> Result<Vec<DynamicValue<'static>>, SortError>;

    /// Write `items` back over the sequence, element by element.
    ///
    /// `items` has exactly `self.len()` elements. Fails with
    /// [`SortError::HostAccess`] if the host rejects a write.
    fn store(&self, items: &[DynamicValue<'static>]) -> Result<(), SortError>;
}

/// A host closure that native code can invoke synchronously.
///
/// Implementations re-enter the host's own dispatch machinery and block
/// until the closure returns or signals an error. Arity is not
/// pre-validated; a mismatch surfaces as whatever error the host closure
/// itself produces.
pub trait HostCallable {
    /// Invoke the closure with positional and keyword arguments.
    ///
    /// The result is marshalled as an owned scalar. A host-side error is
    /// wrapped opaquely in [`CallbackError`]; the payload is carried
    /// unchanged for the boundary layer to rethrow.
    fn invoke(
        &self,
        args: &[DynamicValue<'_>],
        kwargs: &IndexMap<String, DynamicValue<'_>>,
    ) -> Result<DynamicValue<'static>, CallbackError>;
}
