//! Image cropping for the acquisition flow.
//!
//! Where to crop is a policy ([`CropStrategy`]); how to crop and encode is
//! [`crop_to_file`].

use std::fmt;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::GenericImageView;
use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{CropSettings, validate_image_path};
use crate::error::{Result, SnapError};

/// Rectangle in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRegion {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole image.
    pub const fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Intersect with a `width` x `height` image.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    pub fn clamp_to(self, width: u32, height: u32) -> Option<Self> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        (w > 0 && h > 0).then_some(Self::new(self.x, self.y, w, h))
    }
}

impl fmt::Display for CropRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Parses `X,Y,WIDTH,HEIGHT`.
impl FromStr for CropRegion {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, w, h] = parts[..] else {
            return Err(SnapError::InvalidCropRegion(format!(
                "expected X,Y,WIDTH,HEIGHT, got '{s}'"
            )));
        };
        let num = |v: &str, name: &str| {
            v.parse::<u32>().map_err(|_| {
                SnapError::InvalidCropRegion(format!(
                    "{name} must be a non-negative integer, got '{v}'"
                ))
            })
        };
        let region = Self::new(num(x, "x")?, num(y, "y")?, num(w, "width")?, num(h, "height")?);
        if region.width == 0 || region.height == 0 {
            return Err(SnapError::InvalidCropRegion(
                "width and height must be positive".to_string(),
            ));
        }
        Ok(region)
    }
}

/// Chooses the crop rectangle for an image of the given size.
pub trait CropStrategy: Send + Sync {
    /// Region to keep. Must lie within `width` x `height`.
    fn region(&self, width: u32, height: u32) -> Result<CropRegion>;

    /// Short name for logs and output.
    fn name(&self) -> &'static str;
}

/// Centered square sized against a viewport: side = min(vw * wf, vh * hf),
/// never larger than the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredSquare {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub width_fraction: f32,
    pub height_fraction: f32,
}

impl Default for CenteredSquare {
    fn default() -> Self {
        Self::from(&CropSettings::default())
    }
}

impl From<&CropSettings> for CenteredSquare {
    fn from(s: &CropSettings) -> Self {
        Self {
            viewport_width: s.viewport_width,
            viewport_height: s.viewport_height,
            width_fraction: s.width_fraction,
            height_fraction: s.height_fraction,
        }
    }
}

impl CenteredSquare {
    /// Side length before clamping to the image.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn side(&self) -> u32 {
        let by_width = self.viewport_width as f32 * self.width_fraction;
        let by_height = self.viewport_height as f32 * self.height_fraction;
        by_width.min(by_height).max(0.0).round() as u32
    }
}

impl CropStrategy for CenteredSquare {
    fn region(&self, width: u32, height: u32) -> Result<CropRegion> {
        let side = self.side().min(width).min(height);
        if side == 0 {
            return Err(SnapError::InvalidCropRegion(format!(
                "centered square is empty for a {width}x{height} image"
            )));
        }
        Ok(CropRegion::new((width - side) / 2, (height - side) / 2, side, side))
    }

    fn name(&self) -> &'static str {
        "center"
    }
}

/// Caller-chosen rectangle, clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedRegion(pub CropRegion);

impl CropStrategy for FixedRegion {
    fn region(&self, width: u32, height: u32) -> Result<CropRegion> {
        self.0.clamp_to(width, height).ok_or_else(|| {
            SnapError::InvalidCropRegion(format!(
                "region {} lies outside the {width}x{height} image",
                self.0
            ))
        })
    }

    fn name(&self) -> &'static str {
        "region"
    }
}

/// Keep the whole image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullImage;

impl CropStrategy for FullImage {
    fn region(&self, width: u32, height: u32) -> Result<CropRegion> {
        if width == 0 || height == 0 {
            return Err(SnapError::InvalidCropRegion("image is empty".to_string()));
        }
        Ok(CropRegion::full(width, height))
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Outcome of a crop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CroppedImage {
    pub path: PathBuf,
    pub source_width: u32,
    pub source_height: u32,
    pub region: CropRegion,
}

/// Crop `source` with `strategy` and write the result as JPEG to `dest`.
#[instrument(skip(strategy), fields(strategy = strategy.name()))]
pub fn crop_to_file(
    source: &Path,
    dest: &Path,
    strategy: &dyn CropStrategy,
    jpeg_quality: u8,
) -> Result<CroppedImage> {
    validate_image_path(source)?;

    let img = image::open(source).map_err(|e| SnapError::ImageProcessing(e.to_string()))?;
    let (width, height) = img.dimensions();
    let region = strategy.region(width, height)?;
    debug!(width, height, %region, "Cropping image");

    let cropped = img.crop_imm(region.x, region.y, region.width, region.height);

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(dest)?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), jpeg_quality.clamp(1, 100));
    // JPEG has no alpha channel.
    cropped
        .to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| SnapError::ImageProcessing(e.to_string()))?;

    Ok(CroppedImage {
        path: dest.to_path_buf(),
        source_width: width,
        source_height: height,
        region,
    })
}
