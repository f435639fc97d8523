use std::sync::Arc;

pub mod decode;
pub mod intake;

/// A fully decoded still image, ready to join a sequence.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub name: String,
    /// Straight-alpha RGBA8, row-major, tightly packed.
    pub rgba: Arc<image::RgbaImage>,
}

impl DecodedImage {
    pub fn new(name: impl Into<String>, rgba: image::RgbaImage) -> Self {
        Self {
            name: name.into(),
            rgba: Arc::new(rgba),
        }
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }
}
