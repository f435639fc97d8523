use std::sync::Arc;

use image::RgbaImage;

use crate::foundation::error::{FlipbookError, FlipbookResult};

/// Quantizer sample factor handed to every encoder (1 = best, 30 = fastest).
pub const ENCODER_QUALITY: i32 = 10;

/// Encoder setup for one export job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    pub width: u32,
    pub height: u32,
    pub quality: i32,
}

impl EncoderConfig {
    /// Largest side an animated GIF can describe.
    pub const MAX_DIMENSION: u32 = u16::MAX as u32;

    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            quality: ENCODER_QUALITY,
        }
    }

    pub fn validate(&self) -> FlipbookResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(FlipbookError::validation(
                "encoder width/height must be non-zero",
            ));
        }
        if self.width > Self::MAX_DIMENSION || self.height > Self::MAX_DIMENSION {
            return Err(FlipbookError::validation(format!(
                "encoder canvas {}x{} exceeds {} pixels per side",
                self.width,
                self.height,
                Self::MAX_DIMENSION
            )));
        }
        if !(1..=30).contains(&self.quality) {
            return Err(FlipbookError::validation(format!(
                "encoder quality must be in [1, 30], got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Encoder progress in percent, `0..=100`. May be invoked from worker threads.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Callbacks wired into [`EncoderBackend::render`].
///
/// Exactly one of `on_finished` / `on_error` is invoked, at most once.
pub struct RenderCallbacks {
    pub on_progress: ProgressFn,
    pub on_finished: Box<dyn FnOnce(Vec<u8>) + Send>,
    pub on_error: Box<dyn FnOnce(FlipbookError) + Send>,
}

/// One in-flight animated-image encode.
///
/// Ordering contract: frames appear in the artifact in the order `add_frame` was called.
pub trait EncoderBackend: Send {
    /// Queue one frame. `pixels` is a shared scratch surface: implementations must copy it
    /// before returning.
    fn add_frame(&mut self, pixels: &RgbaImage, delay_ms: u32) -> FlipbookResult<()>;

    fn frame_count(&self) -> usize;

    /// Start the final encode. Returns immediately; the outcome arrives through `callbacks`,
    /// possibly on another thread.
    fn render(self: Box<Self>, callbacks: RenderCallbacks);
}

/// Creates encoders, loading whatever the backend needs on first use.
pub trait EncoderFactory: Send + Sync {
    /// Fails with [`FlipbookError::EncoderUnavailable`] when the backend cannot be loaded.
    fn create(&self, cfg: EncoderConfig) -> FlipbookResult<Box<dyn EncoderBackend>>;
}
