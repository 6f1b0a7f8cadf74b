//! Error types for the image-search client.
//!
//! Every fallible operation in the crate returns [`SnapError`]. Callers that
//! need to branch on the *class* of failure (retry a network error, re-open a
//! corrupt ledger, tell the user an id does not exist) use [`SnapError::kind`]
//! instead of matching message strings.

use serde::Serialize;
use thiserror::Error;

/// Primary error type for client operations.
#[derive(Error, Debug)]
pub enum SnapError {
    // Acquisition outcomes. The acquisition flow reports these as normal
    // exits; they become errors only through `Acquisition::into_ready`.
    #[error("Permission to read images was denied")]
    PermissionDenied,

    #[error("Image selection was cancelled")]
    UserCancelled,

    // Remote API errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Search {search_id} not found")]
    NotFound { search_id: i64 },

    // Local storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Image errors
    #[error("Image file not found: {path}")]
    ImageNotFound { path: String },

    #[error("Unsupported image: {0}")]
    ImageFormat(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Invalid crop region: {0}")]
    InvalidCropRegion(String),

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse failure class, stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    PermissionDenied,
    UserCancelled,
    Network,
    Server,
    NotFound,
    Storage,
    Image,
    Config,
    Other,
}

impl SnapError {
    /// Failure class of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionDenied => ErrorKind::PermissionDenied,
            Self::UserCancelled => ErrorKind::UserCancelled,
            Self::Network(_) => ErrorKind::Network,
            Self::Server { .. } => ErrorKind::Server,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Storage(_) => ErrorKind::Storage,
            Self::ImageNotFound { .. }
            | Self::ImageFormat(_)
            | Self::ImageProcessing(_)
            | Self::InvalidCropRegion(_) => ErrorKind::Image,
            Self::ConfigNotFound { .. } | Self::ConfigParse(_) => ErrorKind::Config,
            Self::Io(_) | Self::Other(_) => ErrorKind::Other,
        }
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::UserCancelled
                | Self::Network(_)
                | Self::NotFound { .. }
                | Self::ImageNotFound { .. }
                | Self::ImageFormat(_)
                | Self::InvalidCropRegion(_)
                | Self::ConfigNotFound { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied => Some("Check that the image file or directory is readable"),
            Self::Network(_) => Some("Is the search server running? Set --api-url or SNAPPED_API_BASE_URL"),
            Self::NotFound { .. } => Some("Run: snapped history"),
            Self::Storage(_) => Some("Inspect or move aside the upload history database"),
            Self::ImageFormat(_) => Some("Use a png, jpg, gif, bmp or webp image"),
            Self::InvalidCropRegion(_) => Some("Use --crop center, --crop none, or --crop X,Y,WIDTH,HEIGHT"),
            Self::ConfigNotFound { .. } => Some("Run: snapped config --path"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using SnapError.
pub type Result<T> = std::result::Result<T, SnapError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| SnapError::Other(format!("{}: {e}", f().into())))
    }
}
