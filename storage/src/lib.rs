//! Storage crate: hierarchical JSON document store used to persist conversation state.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`path`] – Path normalization shared by the store implementations
//! - [`document_store`] – DocumentStore trait
//! - [`rest_store`] – RestDocumentStore (REST document API over HTTP)
//! - [`memory_store`] – InMemoryDocumentStore (same merge semantics, process-local)

mod document_store;
mod error;
mod memory_store;
mod path;
mod rest_store;


pub use document_store::DocumentStore;
pub use error::StorageError;
pub use memory_store::InMemoryDocumentStore;
pub use path::{normalize_path, path_segments};
pub use rest_store::RestDocumentStore;
