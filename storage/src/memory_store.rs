//! Process-local document store with the same semantics as [`crate::RestDocumentStore`]:
//! merge-on-update, `null` removes a key, empty arrays and objects are not kept.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::document_store::DocumentStore;
use crate::error::StorageError;
use crate::path::path_segments;

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    root: Arc<RwLock<Value>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            root: Arc::new(RwLock::new(Value::Null)),
        }
    }

    /// Copy of the whole tree (for tests and debugging).
    pub async fn snapshot(&self) -> Value {
        self.root.read().await.clone()
    }
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Drops nulls and empty containers, bottom-up.
fn compact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for child in map.values_mut() {
                compact(child);
            }
            map.retain(|_, child| !is_absent(child));
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                compact(item);
            }
        }
        _ => {}
    }
}

fn node_at<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just made an object"),
    }
}

/// Walks to `segments`, turning missing or scalar nodes into objects on the way.
fn node_at_mut<'a>(root: &'a mut Value, segments: &[String]) -> &'a mut Map<String, Value> {
    let mut node = root;
    for segment in segments {
        node = ensure_object(node)
            .entry(segment.clone())
            .or_insert(Value::Null);
    }
    ensure_object(node)
}

fn remove_at(root: &mut Value, segments: &[String]) {
    let Some((last, parents)) = segments.split_last() else {
        *root = Value::Null;
        return;
    };
    let mut node = root;
    for segment in parents {
        node = match node {
            Value::Object(map) => match map.get_mut(segment) {
                Some(child) => child,
                None => return,
            },
            _ => return,
        };
    }
    if let Value::Object(map) = node {
        map.remove(last);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let segments = path_segments(path)?;
        let root = self.root.read().await;
        Ok(node_at(&root, &segments)
            .filter(|value| !is_absent(value))
            .cloned())
    }

    async fn update(&self, path: &str, data: Value) -> Result<Value, StorageError> {
        let Value::Object(patch) = data else {
            return Err(StorageError::Decode(
                "update expects a JSON object".to_string(),
            ));
        };
        let segments = path_segments(path)?;
        let mut root = self.root.write().await;
        let target = node_at_mut(&mut root, &segments);
        for (key, value) in &patch {
            target.insert(key.clone(), value.clone());
        }
        compact(&mut root);
        Ok(Value::Object(patch))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let segments = path_segments(path)?;
        let mut root = self.root.write().await;
        remove_at(&mut root, &segments);
        compact(&mut root);
        Ok(())
    }
}
