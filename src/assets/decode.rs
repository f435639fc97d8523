use anyhow::Context;
use image::ImageFormat;

use crate::{
    assets::DecodedImage,
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Identify the image type of an upload, by magic bytes first and file extension second.
///
/// Returns `None` when neither looks like a raster image.
pub fn sniff_image_format(name: &str, bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .or_else(|| ImageFormat::from_path(name).ok())
        .filter(|f| f.reading_enabled())
}

pub fn decode_image(name: &str, bytes: &[u8]) -> FlipbookResult<DecodedImage> {
    let dyn_img = image::load_from_memory(bytes)
        .with_context(|| format!("decode image '{name}'"))
        .map_err(|e| FlipbookError::decode(format!("{e:#}")))?;
    let rgba = dyn_img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(FlipbookError::decode(format!(
            "image '{name}' has zero-sized dimensions"
        )));
    }
    Ok(DecodedImage::new(name, rgba))
}
