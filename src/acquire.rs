//! Image acquisition: permission, pick, crop.
//!
//! [`ImageSource`] is the boundary to wherever images come from. Denial and
//! cancellation are ordinary outcomes of [`AcquisitionFlow::acquire`], not
//! errors; only a failure to read or crop the picked image is an error.

use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::LocalImageRef;
use crate::config::{has_image_extension, validate_image_path};
use crate::error::{Result, SnapError};
use crate::image_ops::{CropRegion, CropStrategy, crop_to_file};
use crate::state::{ExitReason, FlowState, FlowTracker};

/// Answer to a request for image access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    Granted,
    Denied,
}

/// Where images come from.
pub trait ImageSource: Send + Sync {
    /// Ask for access to the images.
    fn request_permission(&self) -> Permission;

    /// Choose one image. `None` means the user picked nothing.
    fn pick(&self) -> Result<Option<LocalImageRef>>;
}

/// Picks from the filesystem.
///
/// A file path is picked as-is. A directory yields its most recently
/// modified supported image. Access counts as granted when the path can be
/// read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSource {
    path: Option<PathBuf>,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Source with nothing to pick.
    pub const fn empty() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl ImageSource for PathSource {
    fn request_permission(&self) -> Permission {
        let Some(path) = &self.path else {
            return Permission::Granted;
        };
        let probe = if path.is_dir() {
            fs::read_dir(path).map(drop)
        } else {
            fs::File::open(path).map(drop)
        };
        match probe {
            Err(e) if e.kind() == IoErrorKind::PermissionDenied => {
                warn!(path = %path.display(), "Image access denied");
                Permission::Denied
            }
            _ => Permission::Granted,
        }
    }

    fn pick(&self) -> Result<Option<LocalImageRef>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        if path.is_dir() {
            return Ok(newest_image(path)?.map(LocalImageRef::from));
        }
        validate_image_path(path)?;
        Ok(Some(LocalImageRef::from(path.as_path())))
    }
}

/// Most recently modified supported image directly inside `dir`.
pub fn newest_image(dir: &Path) -> Result<Option<PathBuf>> {
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() || !has_image_extension(&path) {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        // Ties go to the lexically greater name so the choice is stable.
        let newer = best
            .as_ref()
            .is_none_or(|(t, p)| (modified, &path) > (*t, p));
        if newer {
            best = Some((modified, path));
        }
    }
    debug!(dir = %dir.display(), picked = ?best.as_ref().map(|(_, p)| p), "Scanned directory");
    Ok(best.map(|(_, p)| p))
}

/// An image ready for the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquiredImage {
    /// Cropped copy to upload.
    pub image: LocalImageRef,
    /// What the user picked.
    pub source: LocalImageRef,
    pub region: CropRegion,
}

impl AcquiredImage {
    /// Delete the cropped copy. The picked source is never touched.
    pub fn discard(&self) {
        let path = self.image.to_path();
        match fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "Removed unused crop"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove unused crop"),
        }
    }
}

/// How acquisition ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Ready(AcquiredImage),
    PermissionDenied,
    Cancelled,
}

impl Acquisition {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// The acquired image, for callers with no use for the non-ready exits.
    ///
    /// # Errors
    ///
    /// `PermissionDenied` or `UserCancelled` when the flow exited early.
    pub fn into_ready(self) -> Result<AcquiredImage> {
        match self {
            Self::Ready(acquired) => Ok(acquired),
            Self::PermissionDenied => Err(SnapError::PermissionDenied),
            Self::Cancelled => Err(SnapError::UserCancelled),
        }
    }
}

/// Permission → pick → crop.
pub struct AcquisitionFlow<'a> {
    source: &'a dyn ImageSource,
    strategy: &'a dyn CropStrategy,
    work_dir: PathBuf,
    jpeg_quality: u8,
}

impl<'a> AcquisitionFlow<'a> {
    /// Crops are written into `work_dir` as `crop-<uuid>.jpg`.
    pub fn new(
        source: &'a dyn ImageSource,
        strategy: &'a dyn CropStrategy,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            strategy,
            work_dir: work_dir.into(),
            jpeg_quality: 90,
        }
    }

    #[must_use]
    pub const fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Run the flow, recording each step in `tracker`.
    ///
    /// # Errors
    ///
    /// Returns an error if the picked image cannot be read or cropped; the
    /// tracker is left in `Failed`.
    #[instrument(skip_all, fields(strategy = self.strategy.name()))]
    pub fn acquire(&self, tracker: &mut FlowTracker) -> Result<Acquisition> {
        let result = self.run(tracker);
        if let Err(e) = &result {
            tracker.fail(e);
        }
        result
    }

    fn run(&self, tracker: &mut FlowTracker) -> Result<Acquisition> {
        tracker.begin()?;
        tracker.advance(FlowState::RequestingPermission)?;
        if self.source.request_permission() == Permission::Denied {
            info!("Permission denied; nothing to upload");
            tracker.advance(FlowState::Exited {
                reason: ExitReason::PermissionDenied,
            })?;
            return Ok(Acquisition::PermissionDenied);
        }

        tracker.advance(FlowState::Picking)?;
        let Some(picked) = self.source.pick()? else {
            info!("No image picked");
            tracker.advance(FlowState::Exited {
                reason: ExitReason::Cancelled,
            })?;
            return Ok(Acquisition::Cancelled);
        };

        tracker.advance(FlowState::Cropping {
            source: picked.clone(),
        })?;
        let dest = self.work_dir.join(format!("crop-{}.jpg", Uuid::new_v4()));
        let cropped = crop_to_file(&picked.to_path(), &dest, self.strategy, self.jpeg_quality)
            .map_err(|e| match e {
                SnapError::Io(io) => SnapError::ImageProcessing(format!(
                    "failed to write crop to {}: {io}",
                    dest.display()
                )),
                other => other,
            })?;

        info!(source = %picked, crop = %cropped.path.display(), region = %cropped.region, "Image acquired");
        Ok(Acquisition::Ready(AcquiredImage {
            image: LocalImageRef::from(cropped.path),
            source: picked,
            region: cropped.region,
        }))
    }
}
