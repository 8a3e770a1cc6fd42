use async_trait::async_trait;
use serde_json::Value;

use crate::error::StorageError;

/// Path-addressed JSON document store (`users/42`, `users/42/updates`).
///
/// `update` merges the top-level keys of `data` into the document at `path`; a `null` value removes
/// the key. Absent documents read as `None`. Each call is one round trip; there is no transaction
/// spanning two calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>, StorageError>;
    async fn update(&self, path: &str, data: Value) -> Result<Value, StorageError>;
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}
