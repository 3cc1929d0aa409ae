//! Photo-to-raster conversion for message attachments.
//!
//! Decodes an attachment blob, scales it to the print head width, and
//! dithers it down to a packed 1-bit raster. Malformed input surfaces as
//! [`BuzonError::Image`]; the intake loop treats that as "skip the photo,
//! keep the text".

use image::imageops::FilterType;

use crate::error::BuzonError;
use crate::render::dither;

/// Tallest raster we will ever emit, in dots (~0.5m of paper at 203 DPI).
const MAX_RASTER_HEIGHT: u32 = 4096;

/// A 1-bit raster ready for the printer: row-major, MSB-first packed rows,
/// each row padded to a byte boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBlock {
    /// Width in dots.
    pub width: u16,
    /// Height in dots.
    pub height: u16,
    /// Packed pixel data, `ceil(width/8) * height` bytes.
    pub data: Vec<u8>,
}

impl RasterBlock {
    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        (self.width as usize).div_ceil(8)
    }
}

/// Convert an encoded image (JPEG/PNG/WebP/...) into a print-ready raster.
///
/// The image is resized so its width equals `target_width` dots, preserving
/// aspect ratio, converted to luminance, and Floyd-Steinberg dithered.
///
/// Returns `BuzonError::Image` if the bytes do not decode; degenerate
/// dimensions (zero-size input) are also rejected.
pub fn convert(image_bytes: &[u8], target_width: u16) -> Result<RasterBlock, BuzonError> {
    let source = image::load_from_memory(image_bytes)
        .map_err(|e| BuzonError::Image(format!("Failed to decode attachment: {}", e)))?;

    if source.width() == 0 || source.height() == 0 || target_width == 0 {
        return Err(BuzonError::Image("Degenerate image dimensions".to_string()));
    }

    // Scale to head width, preserving aspect ratio. Height is capped so
    // a pathological panorama cannot eat the whole paper roll.
    let aspect = source.height() as f32 / source.width() as f32;
    let height = ((target_width as f32 * aspect).round() as u32).clamp(1, MAX_RASTER_HEIGHT);
    let resized = source.resize_exact(target_width as u32, height, FilterType::Lanczos3);

    let gray = resized.to_luma8();
    let (w, h) = (gray.width() as usize, gray.height() as usize);

    // Luminance -> print intensity (dark pixel = strong dot)
    let intensity: Vec<f32> = gray
        .pixels()
        .map(|p| 1.0 - (p[0] as f32 / 255.0))
        .collect();

    let data = dither::diffuse_packed(intensity, w, h);
    Ok(RasterBlock {
        width: w as u16,
        height: h as u16,
        data,
    })
}

// ============================================================================
// TESTS
// ============================================================================
