//! Test utilities and mock host types for Dynabind development.
//!
//! Provides native-backed implementations of the host-interop traits
//! ([`SequenceHost`], [`HostCallable`]) plus a byte-storage fixture, so
//! integration tests can drive the binding layer without a live host
//! runtime attached.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::cell::{Cell, RefCell};
use std::error::Error;
use std::fmt;

use indexmap::IndexMap;

use dynabind_core::{
    ByteBufferRef, CallbackError, DynamicValue, HostCallable, SequenceHost, SortError,
};

/// Mock implementation of [`SequenceHost`] backed by a `RefCell<Vec<_>>`.
///
/// Behaves like a host list: [`snapshot`](SequenceHost::snapshot) reads
/// the current elements, [`store`](SequenceHost::store) overwrites them
/// in place. Inspect results with [`items`](MockSequence::items).
pub struct MockSequence {
    elements: RefCell<Vec<DynamicValue<'static>>>,
}

impl MockSequence {
    pub fn new(elements: Vec<DynamicValue<'static>>) -> Self {
        Self {
            elements: RefCell::new(elements),
        }
    }

    /// Convenience constructor for integer-only sequences.
    pub fn of_ints(values: &[i64]) -> Self {
        Self::new(values.iter().map(|&v| DynamicValue::Int(v)).collect())
    }

    /// A copy of the current elements, for assertions.
    pub fn items(&self) -> Vec<DynamicValue<'static>> {
        self.elements.borrow().clone()
    }
}

impl SequenceHost for MockSequence {
    fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    fn snapshot(&self) -> Result<Vec<DynamicValue<'static>>, SortError> {
        Ok(self.elements.borrow().clone())
    }

    fn store(&self, items: &[DynamicValue<'static>]) -> Result<(), SortError> {
        let mut elements = self.elements.borrow_mut();
        if items.len() != elements.len() {
            return Err(SortError::HostAccess {
                message: format!(
                    "store length {} does not match sequence length {}",
                    items.len(),
                    elements.len()
                ),
            });
        }
        elements.clone_from_slice(items);
        Ok(())
    }
}

/// Mock implementation of [`HostCallable`] wrapping a native closure.
///
/// Keyword arguments are ignored; invocations are counted so tests can
/// assert the bridge actually re-entered the "host".
pub struct MockCallable {
    #[allow(clippy::type_complexity)]
    body: Box<dyn Fn(&[DynamicValue<'_>]) -> Result<DynamicValue<'static>, CallbackError>>,
    calls: Cell<usize>,
}

impl MockCallable {
    pub fn from_fn(
        body: impl Fn(&[DynamicValue<'_>]) -> Result<DynamicValue<'static>, CallbackError> + 'static,
    ) -> Self {
        Self {
            body: Box::new(body),
            calls: Cell::new(0),
        }
    }

    /// Number of times the closure has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }
}

impl HostCallable for MockCallable {
    fn invoke(
        &self,
        args: &[DynamicValue<'_>],
        _kwargs: &IndexMap<String, DynamicValue<'_>>,
    ) -> Result<DynamicValue<'static>, CallbackError> {
        self.calls.set(self.calls.get() + 1);
        (self.body)(args)
    }
}

/// The opaque error payload raised by [`FailingCallable`].
///
/// Tests downcast the payload back to this type to verify the bridge
/// carries host errors through unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHostError(pub String);

impl fmt::Display for MockHostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for MockHostError {}

/// A [`HostCallable`] that always fails with a [`MockHostError`].
pub struct FailingCallable {
    message: String,
}

impl FailingCallable {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl HostCallable for FailingCallable {
    fn invoke(
        &self,
        _args: &[DynamicValue<'_>],
        _kwargs: &IndexMap<String, DynamicValue<'_>>,
    ) -> Result<DynamicValue<'static>, CallbackError> {
        Err(CallbackError::new(MockHostError(self.message.clone())))
    }
}

/// Owned byte storage standing in for a host-managed mutable buffer.
///
/// Hand the view to code under test, then inspect
/// [`bytes`](ByteStore::bytes) to observe in-place mutation.
pub struct ByteStore {
    storage: Vec<u8>,
}

impl ByteStore {
    pub fn zeroed(len: usize) -> Self {
        Self {
            storage: vec![0; len],
        }
    }

    pub fn from_vec(storage: Vec<u8>) -> Self {
        Self { storage }
    }

    /// A mutable zero-copy view over the storage.
    pub fn view(&mut self) -> ByteBufferRef<'_> {
        ByteBufferRef::from_slice(&mut self.storage)
    }

    /// The current storage contents.
    pub fn bytes(&self) -> &[u8] {
        &self.storage
    }
}
