//! Path helpers for configuration, storage, and image inputs.
//!
//! Supports absolute paths, relative paths, and "~" home directory expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Result, SnapError};

/// Image extensions the acquisition flow accepts.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// Expand a leading `~` to the user's home directory.
///
/// Other paths are returned unchanged.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() { home } else { home.join(rest) };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    trace!(path = %path.display(), "Path used as-is");
    Ok(path.to_path_buf())
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| SnapError::ConfigParse("Could not determine home directory".to_string()))
}

/// Default configuration file: `<config_dir>/snapped/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("snapped").join("config.toml"))
}

/// Default data directory: `<data_dir>/snapped`, falling back to `./.snapped`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir().map_or_else(|| PathBuf::from(".snapped"), |d| d.join("snapped"))
}

/// Returns true if the path has a supported image extension.
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|ext| SUPPORTED_IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Validate that a path exists and is a supported image file.
pub fn validate_image_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SnapError::ImageNotFound {
            path: path.display().to_string(),
        });
    }

    if !path.is_file() {
        return Err(SnapError::ImageNotFound {
            path: format!("{} is not a file", path.display()),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match ext.as_deref() {
        Some(e) if SUPPORTED_IMAGE_EXTENSIONS.contains(&e) => Ok(()),
        Some(other) => Err(SnapError::ImageFormat(format!(
            "Unsupported image format: .{other}"
        ))),
        None => Err(SnapError::ImageFormat(
            "Image file has no extension".to_string(),
        )),
    }
}
