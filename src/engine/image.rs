//! Per-image recompression step
//!
//! Decides whether a single embedded JPEG is worth re-encoding at lower
//! resolution/quality, and produces the replacement bytes when it is.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageFormat;

use crate::config::CompressionSettings;
use crate::error::ImageError;

/// Replacement payload for an image stream, with its new dimensions
#[derive(Debug, Clone)]
pub struct RecompressedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Recompress one embedded JPEG.
///
/// Returns `Ok(None)` when the image is left alone: too small to bother
/// (both dimensions at or below `min_dimension`), or the re-encoded result
/// does not save enough space to justify the quality loss.
///
/// Decode failures propagate as `ImageError`; the caller treats them as
/// per-image failures and moves on to the next object.
pub fn recompress_jpeg(
    bytes: &[u8],
    width: u32,
    height: u32,
    settings: &CompressionSettings,
) -> Result<Option<RecompressedImage>, ImageError> {
    if width <= settings.min_dimension && height <= settings.min_dimension {
        return Ok(None);
    }

    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| ImageError::Decode(e.to_string()))?;

    let (target_width, target_height) = target_dimensions(width, height, settings.max_dimension);

    // No upscaling and no redundant resize when already within bounds.
    let resized = if (target_width, target_height) != (img.width(), img.height()) {
        img.resize_exact(target_width, target_height, FilterType::Lanczos3)
    } else {
        img
    };

    let rgb = resized.to_rgb8();
    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, settings.jpeg_quality);
    encoder
        .encode_image(&rgb)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    // Must beat the savings threshold, otherwise keep the original bytes.
    if (encoded.len() as f64) < bytes.len() as f64 * settings.min_savings as f64 {
        Ok(Some(RecompressedImage {
            bytes: encoded,
            width: target_width,
            height: target_height,
        }))
    } else {
        log::debug!(
            "Discarding re-encoded image: {} -> {} bytes saves too little",
            bytes.len(),
            encoded.len()
        );
        Ok(None)
    }
}

/// Compute output dimensions so neither side exceeds `max_dimension`,
/// preserving aspect ratio. Dimensions already within bounds are unchanged.
pub fn target_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }

    let scale = (max_dimension as f64 / width as f64).min(max_dimension as f64 / height as f64);
    let scaled_width = (width as f64 * scale).round() as u32;
    let scaled_height = (height as f64 * scale).round() as u32;

    (scaled_width.max(1), scaled_height.max(1))
}
