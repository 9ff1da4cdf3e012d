//! Recipient photo normalization.
//!
//! Turns an arbitrary photo into the square, circle-masked PNG used for the
//! `thumbnail.png` and `thumbnail@2x.png` members. Both slots receive the same
//! pixels since there is no separate high-density source.
//!
//! Framing policy: portrait photos keep their top square (faces sit near the
//! top of a headshot); landscape and square photos are centred horizontally.

use crate::bundle::staging::{THUMBNAIL, THUMBNAIL_2X};
use crate::bundle::StagingDirectory;
use crate::error::ImageError;
use crate::Result;
use image::error::{LimitError, LimitErrorKind};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Default output side in pixels.
pub const DEFAULT_THUMBNAIL_SIDE: u32 = 180;

/// Square region cut from the source before resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

/// Computes the crop square for a `width` x `height` source.
pub fn crop_region(width: u32, height: u32) -> CropRegion {
    if height > width {
        CropRegion { x: 0, y: 0, size: width }
    } else {
        CropRegion {
            x: (width - height) / 2,
            y: 0,
            size: height,
        }
    }
}

/// A normalized thumbnail and its PNG encoding.
pub struct NormalizedImage {
    pub image: RgbaImage,
    pub png: Vec<u8>,
}

/// What the thumbnail stage did for one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    /// Both slots hold the normalized PNG.
    Written,
    /// The photo could not be decoded; both slots hold its raw bytes.
    RawCopy,
    /// No photo was found; the bundle has no thumbnail.
    Skipped,
}

/// Crop, resize and mask an already decoded image.
pub fn normalize_image(source: &DynamicImage, side: u32) -> RgbaImage {
    let rgba = source.to_rgba8();
    let region = crop_region(rgba.width(), rgba.height());
    let square = imageops::crop_imm(&rgba, region.x, region.y, region.size, region.size).to_image();

    // The crop is already square, so fitting reduces to a plain resize.
    let mut fitted = if square.width() == side {
        square
    } else {
        imageops::resize(&square, side, side, FilterType::Lanczos3)
    };

    apply_circle_mask(&mut fitted);
    fitted
}

/// Multiplies each pixel's alpha by its coverage of the inscribed circle.
///
/// Pixels whose centre lies outside the circle become fully transparent; the
/// one-pixel band just inside the edge is partially transparent.
pub fn apply_circle_mask(image: &mut RgbaImage) {
    let side = image.width().min(image.height()) as f64;
    let radius = side / 2.0;
    let (cx, cy) = (image.width() as f64 / 2.0, image.height() as f64 / 2.0);

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let dx = x as f64 + 0.5 - cx;
        let dy = y as f64 + 0.5 - cy;
        let distance = (dx * dx + dy * dy).sqrt();
        let coverage = (radius - distance).clamp(0.0, 1.0);

        let Rgba([r, g, b, a]) = *pixel;
        let alpha = (a as f64 * coverage).round() as u8;
        *pixel = Rgba([r, g, b, alpha]);
    }
}

/// Load and normalize the photo at `source`.
pub fn normalize(source: impl AsRef<Path>, side: u32) -> std::result::Result<NormalizedImage, ImageError> {
    let source = source.as_ref();
    if !source.is_file() {
        return Err(ImageError::SourceMissing(source.to_path_buf()));
    }

    let bytes = fs::read(source)?;
    let decoded = image::load_from_memory(&bytes).map_err(|e| ImageError::Undecodable {
        path: source.to_path_buf(),
        source: e,
    })?;

    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ImageError::Undecodable {
            path: source.to_path_buf(),
            source: image::ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError)),
        });
    }

    let image = normalize_image(&decoded, side);

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(ImageError::Encode)?;

    Ok(NormalizedImage { image, png })
}

/// Fill both thumbnail slots of `staging` from `source`.
///
/// A missing photo is skipped with a warning and an undecodable one is copied
/// verbatim; any other failure is returned.
pub fn write_thumbnails(source: impl AsRef<Path>, staging: &StagingDirectory, side: u32) -> Result<ThumbnailOutcome> {
    let source = source.as_ref();

    match normalize(source, side) {
        Ok(normalized) => {
            staging.write_member(THUMBNAIL, &normalized.png)?;
            staging.write_member(THUMBNAIL_2X, &normalized.png)?;
            Ok(ThumbnailOutcome::Written)
        }
        Err(ImageError::SourceMissing(path)) => {
            tracing::warn!(photo = %path.display(), "photo not found, bundle will have no thumbnail");
            staging.remove_member(THUMBNAIL)?;
            staging.remove_member(THUMBNAIL_2X)?;
            Ok(ThumbnailOutcome::Skipped)
        }
        Err(ImageError::Undecodable { path, source: err }) => {
            tracing::warn!(photo = %path.display(), error = %err, "cannot process photo, copying raw bytes");
            fs::copy(&path, staging.member(THUMBNAIL))?;
            fs::copy(&path, staging.member(THUMBNAIL_2X))?;
            Ok(ThumbnailOutcome::RawCopy)
        }
        Err(e) => Err(e.into()),
    }
}
