//! Test fixture helpers for creating temporary test data.
//!
//! Provides utilities for generating temporary directories with test images
//! and configuration files that are automatically cleaned up.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use image::{Rgb, RgbImage};
use tempfile::TempDir;

/// Test images in a temporary directory with automatic cleanup.
///
/// # Example
///
/// ```ignore
/// let images = TestImages::screenshots(3, 200, 400);
/// // shot-2.png is the newest
/// ```
pub struct TestImages {
    /// The temporary directory containing the images.
    pub dir: TempDir,
}

impl TestImages {
    /// Empty fixture directory.
    ///
    /// # Panics
    ///
    /// Panics if the directory cannot be created.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// One solid-color PNG named `name`.
    #[must_use]
    pub fn single(name: &str, width: u32, height: u32) -> Self {
        let images = Self::empty();
        images.add(name, width, height);
        images
    }

    /// `count` PNGs named `shot-0.png`, `shot-1.png`, ... with strictly
    /// increasing modification times, so the last one is the newest.
    ///
    /// # Panics
    ///
    /// Panics if image creation fails.
    #[must_use]
    pub fn screenshots(count: u8, width: u32, height: u32) -> Self {
        let images = Self::empty();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for i in 0..count {
            let path = images.add(&format!("shot-{i}.png"), width, height);
            set_mtime(&path, base + Duration::from_secs(u64::from(i) * 60));
        }
        images
    }

    /// Write a solid-color PNG into the fixture directory.
    ///
    /// # Panics
    ///
    /// Panics if the image cannot be saved.
    pub fn add(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let seed = u8::try_from(name.len() % 200).unwrap_or(0);
        let img = RgbImage::from_pixel(width, height, Rgb([seed, 128, 255 - seed]));
        let path = self.dir.path().join(name);
        img.save(&path)
            .unwrap_or_else(|_| panic!("Failed to save image at {path:?}"));
        path
    }

    /// Get the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the fixture directory.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Get the path as a string (useful for CLI arguments).
    #[must_use]
    pub fn path_str(&self) -> &str {
        self.dir.path().to_str().expect("Invalid UTF-8 in path")
    }
}

/// Set a file's modification time.
///
/// # Panics
///
/// Panics if the file cannot be opened or updated.
pub fn set_mtime(path: &Path, time: SystemTime) {
    File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(time))
        .unwrap_or_else(|e| panic!("Failed to set mtime on {path:?}: {e}"));
}

/// Configuration file in a temporary directory.
pub struct TestConfig {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestConfig {
    /// Write `content` to `config.toml`.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[must_use]
    pub fn toml(content: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).expect("Failed to write config");
        Self { dir, path }
    }

    #[must_use]
    pub fn path_str(&self) -> &str {
        self.path.to_str().expect("Invalid UTF-8 in path")
    }
}
