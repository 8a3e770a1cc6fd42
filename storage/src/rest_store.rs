//! REST document store: each path maps to `{base_url}/{path}.json`, credential passed as the `auth`
//! query parameter. GET reads, PATCH merges, DELETE removes.
//!
//! External: any REST JSON document API with those semantics (a realtime-database style service).

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::document_store::DocumentStore;
use crate::error::StorageError;
use crate::path::normalize_path;

#[derive(Debug, Clone)]
pub struct RestDocumentStore {
    client: Client,
    base_url: Url,
    auth: String,
}

impl RestDocumentStore {
    /// Creates a store for `base_url`; `auth` may be empty when the service needs no credential.
    pub fn new(base_url: &str, auth: impl Into<String>) -> Result<Self, StorageError> {
        Self::with_client(Client::new(), base_url, auth)
    }

    /// Creates a store reusing an existing HTTP client.
    pub fn with_client(
        client: Client,
        base_url: &str,
        auth: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let base = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&base).map_err(|e| StorageError::InvalidPath(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            auth: auth.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Full URL of a document: normalized path with a `.json` suffix unless already present.
    pub fn document_url(&self, path: &str) -> Result<Url, StorageError> {
        let path = normalize_path(path)?;
        let resource = if path.ends_with(".json") {
            path
        } else {
            format!("{}.json", path)
        };
        self.base_url
            .join(&resource)
            .map_err(|e| StorageError::InvalidPath(e.to_string()))
    }

    fn query(&self) -> Vec<(&'static str, &str)> {
        if self.auth.is_empty() {
            Vec::new()
        } else {
            vec![("auth", self.auth.as_str())]
        }
    }

    async fn read_json(response: Response) -> Result<Value, StorageError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let text = response
            .text()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| StorageError::Decode(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    #[instrument(skip(self))]
    async fn get(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let url = self.document_url(path)?;
        let response = self
            .client
            .get(url)
            .query(&self.query())
            .send()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;
        let value = Self::read_json(response).await?;
        debug!(path = %path, found = !value.is_null(), "Document read");
        Ok(if value.is_null() { None } else { Some(value) })
    }

    #[instrument(skip(self, data))]
    async fn update(&self, path: &str, data: Value) -> Result<Value, StorageError> {
        let url = self.document_url(path)?;
        let response = self
            .client
            .patch(url)
            .query(&self.query())
            .json(&data)
            .send()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;
        let value = Self::read_json(response).await?;
        debug!(path = %path, "Document updated");
        Ok(value)
    }

    #[instrument(skip(self))]
    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let url = self.document_url(path)?;
        let response = self
            .client
            .delete(url)
            .query(&self.query())
            .send()
            .await
            .map_err(|e| StorageError::Http(e.to_string()))?;
        Self::read_json(response).await?;
        debug!(path = %path, "Document deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_url_appends_json_suffix() {
        let store = RestDocumentStore::new("https://db.example.com", "").unwrap();
        assert_eq!(
            store.document_url("users/1").unwrap().as_str(),
            "https://db.example.com/users/1.json"
        );
        assert_eq!(
            store.document_url("/users/1/updates.json").unwrap().as_str(),
            "https://db.example.com/users/1/updates.json"
        );
    }

    #[test]
    fn test_base_url_keeps_prefix_path() {
        let store = RestDocumentStore::new("https://db.example.com/tenant", "key").unwrap();
        assert_eq!(store.base_url(), "https://db.example.com/tenant/");
        assert_eq!(
            store.document_url("users").unwrap().as_str(),
            "https://db.example.com/tenant/users.json"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(RestDocumentStore::new("not a url", "").is_err());
    }
}
