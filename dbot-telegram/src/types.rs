//! Bot API wire types the framework reads directly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// One entry of `getUpdates`. `message` stays raw so it can be stored verbatim as a step snapshot;
/// other update kinds (edits, callbacks) are not decoded.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Deserialize)]
struct WirePhotos {
    total_count: u32,
    photos: Vec<Vec<PhotoSize>>,
}

/// Profile photos of a user; only the largest size of each photo is kept.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WirePhotos")]
pub struct UserProfilePhotos {
    pub total_count: u32,
    pub photos: Vec<PhotoSize>,
}

impl From<WirePhotos> for UserProfilePhotos {
    fn from(wire: WirePhotos) -> Self {
        Self {
            total_count: wire.total_count,
            photos: wire
                .photos
                .into_iter()
                .filter_map(|sizes| sizes.into_iter().last())
                .collect(),
        }
    }
}

impl UserProfilePhotos {
    pub fn contains_file_id(&self, file_id: &str) -> bool {
        self.photos.iter().any(|p| p.file_id == file_id)
    }

    pub fn get(&self, index: usize) -> Option<&PhotoSize> {
        self.photos.get(index)
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhotoSize> {
        self.photos.iter()
    }
}

impl std::ops::Index<usize> for UserProfilePhotos {
    type Output = PhotoSize;

    fn index(&self, index: usize) -> &PhotoSize {
        &self.photos[index]
    }
}
