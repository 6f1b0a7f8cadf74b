//! Wire types for the image-search API.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Server-assigned search identifier.
pub type SearchId = i64;

/// Handle to an image available on this machine: a filesystem path or a
/// `file://` URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalImageRef(String);

impl LocalImageRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filesystem path of the image, with any `file://` prefix removed.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(self.0.strip_prefix("file://").unwrap_or(&self.0))
    }

    /// Name sent as the multipart file name.
    pub fn file_name(&self) -> String {
        self.0
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("image.jpg")
            .to_string()
    }
}

impl From<&Path> for LocalImageRef {
    fn from(path: &Path) -> Self {
        Self(path.display().to_string())
    }
}

impl From<PathBuf> for LocalImageRef {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

impl fmt::Display for LocalImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    /// Canonical server path (or URL) of the stored image. Always present.
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_url: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Server-side clip request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipParams {
    pub image_path: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_public_id: Option<String>,
}

/// Result of a server-side clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRecord {
    pub image_path: String,
    pub original_image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_url: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Similarity search request. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub image_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_image_path: Option<String>,
    pub is_clipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudinary_public_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudinary_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_public_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_url: Option<String>,
}

impl SearchParams {
    /// Search on an uploaded, unclipped image.
    pub fn from_upload(upload: &UploadRecord) -> Self {
        Self {
            image_path: upload.image_path.clone(),
            is_clipped: false,
            cloudinary_public_id: upload.cloudinary_public_id.clone(),
            cloudinary_url: upload.cloudinary_url.clone(),
            ..Self::default()
        }
    }

    /// Search on a clipped image, keeping a reference to its original.
    pub fn from_clip(clip: &ClipRecord) -> Self {
        Self {
            image_path: clip.image_path.clone(),
            original_image_path: Some(clip.original_image_path.clone()),
            is_clipped: true,
            cloudinary_public_id: clip.cloudinary_public_id.clone(),
            cloudinary_url: clip.cloudinary_url.clone(),
            original_cloudinary_public_id: clip.original_cloudinary_public_id.clone(),
            original_cloudinary_url: clip.original_cloudinary_url.clone(),
        }
    }
}

/// Identifies one server-side result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchHandle {
    pub search_id: SearchId,
}

/// One matched product. Owned by the server; rendered, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub id: i64,
    pub search_id: SearchId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<i64>,
}

/// Response of `POST /images/search` and `GET /images/searches/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub search_id: SearchId,
    pub search_time: String,
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_path: Option<String>,
    #[serde(default)]
    pub is_clipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_url: Option<String>,
    #[serde(default)]
    pub results: Vec<SearchResultItem>,
    #[serde(default)]
    pub total_results: usize,
}

impl SearchResponse {
    pub const fn handle(&self) -> SearchHandle {
        SearchHandle {
            search_id: self.search_id,
        }
    }
}

/// Row of the remote search history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub id: SearchId,
    pub image_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_image_path: Option<String>,
    #[serde(default)]
    pub is_clipped: bool,
    pub search_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_cloudinary_url: Option<String>,
}

/// Response of `GET /images/searches`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchList {
    pub searches: Vec<SearchSummary>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
