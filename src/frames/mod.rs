//! Frame sampling: first-frame extraction and region cropping
//!
//! Regions are expressed as fractions of the source resolution so the same
//! layout works for every rendition of a broadcast.

use crate::error::Result;
use crate::tools::FrameDecoder;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Rectangle in fractional source coordinates (0.0 ..= 1.0)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

/// Pixel rectangle resolved against a concrete image size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    /// Build a region from pixel coordinates measured on a reference frame
    pub fn from_pixels(
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        ref_width: u32,
        ref_height: u32,
    ) -> Self {
        Self {
            left: left as f64 / ref_width as f64,
            top: top as f64 / ref_height as f64,
            right: right as f64 / ref_width as f64,
            bottom: bottom as f64 / ref_height as f64,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !(in_unit(self.left) && in_unit(self.top) && in_unit(self.right) && in_unit(self.bottom))
        {
            return Err("coordinates must be within 0.0..=1.0".to_string());
        }
        if self.right <= self.left || self.bottom <= self.top {
            return Err("region must have a positive area".to_string());
        }
        Ok(())
    }

    /// Resolve against an image size, truncating to whole pixels
    pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
        let x0 = scale(width, self.left);
        let y0 = scale(height, self.top);
        let x1 = scale(width, self.right).min(width);
        let y1 = scale(height, self.bottom).min(height);

        PixelRect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

// Fractions such as 1040/1080 do not round-trip exactly through f64.
fn scale(extent: u32, fraction: f64) -> u32 {
    (extent as f64 * fraction + 1e-6).floor() as u32
}

/// Crop a region out of an image
pub fn crop(image: &DynamicImage, region: &Region) -> DynamicImage {
    let rect = region.to_pixels(image.width(), image.height());
    image.crop_imm(rect.x, rect.y, rect.width, rect.height)
}

/// Crop a region out of an image file and write it as PNG
pub fn crop_file(source: &Path, region: &Region, output: &Path) -> Result<()> {
    let image = image::open(source)?;
    let cropped = crop(&image, region);
    debug!(
        "Cropped {}x{} from {:?} into {:?}",
        cropped.width(),
        cropped.height(),
        source,
        output
    );
    // Only complete files appear under the final name
    let mut partial = output.as_os_str().to_os_string();
    partial.push(".part");
    cropped.save_with_format(&partial, image::ImageFormat::Png)?;
    std::fs::rename(&partial, output)?;
    Ok(())
}

/// Path of the decoded still for a segment (`<segment>.png`)
pub fn frame_path(segment: &Path) -> PathBuf {
    let mut name = segment.as_os_str().to_os_string();
    name.push(".png");
    PathBuf::from(name)
}

/// Decode the first frame of a segment, reusing an earlier decode when present
pub async fn extract_first_frame(decoder: &dyn FrameDecoder, segment: &Path) -> Result<PathBuf> {
    let output = frame_path(segment);
    if crate::artifacts::is_ready(&output) {
        debug!("Reusing decoded frame {:?}", output);
        return Ok(output);
    }

    decoder.decode_first_frame(segment, &output).await?;
    Ok(output)
}
