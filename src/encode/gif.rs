use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicUsize, Ordering},
};

use image::RgbaImage;
use rayon::prelude::*;

use crate::{
    encode::backend::{EncoderBackend, EncoderConfig, EncoderFactory, ProgressFn, RenderCallbacks},
    foundation::error::{FlipbookError, FlipbookResult},
};

/// Worker-pool setup for GIF quantization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GifWorkerConfig {
    /// Worker threads; `None` lets rayon pick one per core.
    pub workers: Option<usize>,
    pub thread_name: String,
}

impl Default for GifWorkerConfig {
    fn default() -> Self {
        Self {
            workers: None,
            thread_name: "flipbook-gif".to_string(),
        }
    }
}

/// Factory for [`GifEncoder`]s sharing one lazily built worker pool.
///
/// The pool is built by the first `create` call; concurrent callers wait for that build, and the
/// outcome (including a failure) is kept for the life of the factory.
pub struct GifEncoderFactory {
    workers: GifWorkerConfig,
    pool: OnceLock<Result<Arc<rayon::ThreadPool>, String>>,
}

impl GifEncoderFactory {
    pub fn new(workers: GifWorkerConfig) -> Self {
        Self {
            workers,
            pool: OnceLock::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.pool.get(), Some(Ok(_)))
    }

    fn pool(&self) -> FlipbookResult<Arc<rayon::ThreadPool>> {
        match self.pool.get_or_init(|| build_pool(&self.workers)) {
            Ok(pool) => Ok(pool.clone()),
            Err(msg) => Err(FlipbookError::encoder_unavailable(msg.clone())),
        }
    }
}

impl Default for GifEncoderFactory {
    fn default() -> Self {
        Self::new(GifWorkerConfig::default())
    }
}

impl EncoderFactory for GifEncoderFactory {
    fn create(&self, cfg: EncoderConfig) -> FlipbookResult<Box<dyn EncoderBackend>> {
        cfg.validate()?;
        let pool = self.pool()?;
        Ok(Box::new(GifEncoder {
            width: cfg.width as u16,
            height: cfg.height as u16,
            speed: cfg.quality,
            pool,
            frames: Vec::new(),
        }))
    }
}

fn build_pool(cfg: &GifWorkerConfig) -> Result<Arc<rayon::ThreadPool>, String> {
    if cfg.workers == Some(0) {
        return Err("gif worker count must be >= 1 when set".to_string());
    }

    let name = cfg.thread_name.clone();
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(move |i| format!("{name}-{i}"));
    if let Some(n) = cfg.workers {
        builder = builder.num_threads(n);
    }
    let pool = builder
        .build()
        .map_err(|e| format!("failed to build gif worker pool: {e}"))?;
    tracing::debug!(threads = pool.current_num_threads(), "gif worker pool ready");
    Ok(Arc::new(pool))
}

struct QueuedFrame {
    rgba: Vec<u8>,
    delay_cs: u16,
}

/// Looping GIF89a encoder. Frames are quantized in parallel on the worker pool and written in
/// queue order.
pub struct GifEncoder {
    width: u16,
    height: u16,
    speed: i32,
    pool: Arc<rayon::ThreadPool>,
    frames: Vec<QueuedFrame>,
}

impl EncoderBackend for GifEncoder {
    fn add_frame(&mut self, pixels: &RgbaImage, delay_ms: u32) -> FlipbookResult<()> {
        if pixels.dimensions() != (u32::from(self.width), u32::from(self.height)) {
            return Err(FlipbookError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                pixels.width(),
                pixels.height(),
                self.width,
                self.height
            )));
        }
        self.frames.push(QueuedFrame {
            rgba: pixels.as_raw().clone(),
            delay_cs: delay_ms_to_cs(delay_ms),
        });
        Ok(())
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn render(self: Box<Self>, callbacks: RenderCallbacks) {
        let GifEncoder {
            width,
            height,
            speed,
            pool,
            frames,
        } = *self;
        let RenderCallbacks {
            on_progress,
            on_finished,
            on_error,
        } = callbacks;

        pool.spawn(move || {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                encode_frames(width, height, speed, frames, &on_progress)
            }))
            .unwrap_or_else(|_| Err(FlipbookError::encode("gif worker panicked")));
            match outcome {
                Ok(bytes) => on_finished(bytes),
                Err(e) => on_error(e),
            }
        });
    }
}

/// GIF delays are centiseconds; never emit 0 (players treat it as "as fast as possible").
fn delay_ms_to_cs(ms: u32) -> u16 {
    ((ms + 5) / 10).clamp(1, u32::from(u16::MAX)) as u16
}

fn encode_frames(
    width: u16,
    height: u16,
    speed: i32,
    frames: Vec<QueuedFrame>,
    on_progress: &ProgressFn,
) -> FlipbookResult<Vec<u8>> {
    let total = frames.len().max(1);
    let done = AtomicUsize::new(0);
    on_progress(0);

    // Quantization dominates; report it as the first 90%.
    let quantized: Vec<::gif::Frame<'static>> = frames
        .into_par_iter()
        .map(|mut f| {
            let mut frame = ::gif::Frame::from_rgba_speed(width, height, &mut f.rgba, speed);
            frame.delay = f.delay_cs;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            on_progress((n * 90 / total) as u8);
            frame
        })
        .collect();

    let mut out = Vec::new();
    let mut encoder = ::gif::Encoder::new(&mut out, width, height, &[])
        .map_err(|e| FlipbookError::encode(format!("gif header: {e}")))?;
    encoder
        .set_repeat(::gif::Repeat::Infinite)
        .map_err(|e| FlipbookError::encode(format!("gif loop extension: {e}")))?;
    for (i, frame) in quantized.iter().enumerate() {
        encoder
            .write_frame(frame)
            .map_err(|e| FlipbookError::encode(format!("gif frame {i}: {e}")))?;
    }
    encoder
        .into_inner()
        .map_err(|e| FlipbookError::encode(format!("gif trailer: {e}")))?;

    on_progress(100);
    Ok(out)
}
