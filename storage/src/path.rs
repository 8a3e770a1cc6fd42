//! Document paths are slash-separated keys. Leading and trailing slashes are ignored.

use crate::error::StorageError;

/// Trims surrounding slashes and rejects empty segments (`users//1`).
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let trimmed = path.trim().trim_matches('/');
    if !trimmed.is_empty() && trimmed.split('/').any(|segment| segment.is_empty()) {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Segments of a normalized path; the root path has none.
pub fn path_segments(path: &str) -> Result<Vec<String>, StorageError> {
    let normalized = normalize_path(path)?;
    if normalized.is_empty() {
        return Ok(Vec::new());
    }
    Ok(normalized.split('/').map(str::to_string).collect())
}
