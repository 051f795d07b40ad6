pub mod namespace_flusher;
pub mod operation;

pub use namespace_flusher::NamespaceFlusher;
pub use operation::FlushOperations;
