//! Core types for the Dynabind boundary layer.
//!
//! This is the leaf crate with no host dependencies. It defines the
//! dynamically tagged value model ([`DynamicValue`]), declarative
//! function signatures and the argument binder ([`bind`]), zero-copy
//! buffer descriptors ([`BufferDescriptor`]) with flat traversal over
//! arbitrary rank, the callback bridge ([`CallbackBridge`]), the
//! in-place sorting algorithms, and the error taxonomy. Host runtimes
//! (the PyO3 crate) plug in through the [`SequenceHost`] and
//! [`HostCallable`] traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

mod bind;
mod buffer;
mod callback;
mod error;
mod marshal;
mod signature;
mod sort;
mod traits;
mod value;

pub use bind::{bind, BoundValue, CallBinding};
pub use buffer::{BufferDescriptor, BufferRequest, Origin};
pub use callback::CallbackBridge;
pub use error::{BindError, BufferError, CallError, CallbackError, SortError};
pub use marshal::{F32Elements, FlatOffsets};
pub use signature::{DeclaredType, DefaultValue, FunctionSignature, Param};
pub use sort::{
    heap_sort_any, heap_sort_sequence, radix_sort_byte_list, radix_sort_sequence, RADIX_MAX_KEY,
};
pub use traits::{HostCallable, SequenceHost};
pub use value::{ArrayHandle, ArrayProtocol, ByteBufferRef, DynamicValue, ValueKind};
