//! Flipbook turns an ordered set of still images into one looping animated GIF.
//!
//! - Decode uploads with [`intake_paths`] / [`intake_sources`]
//! - Collect them in a [`Session`] (or a bare [`Sequence`])
//! - Export with a [`FitPolicy`] and a [`PlaybackRate`] shared with the preview
#![forbid(unsafe_code)]

mod assets;
mod foundation;

pub mod config;
pub mod encode;
pub mod export;
pub mod playback;
pub mod render;
pub mod sequence;
pub mod session;

pub use crate::assets::DecodedImage;
pub use crate::assets::decode::{decode_image, sniff_image_format};
pub use crate::assets::intake::{ImageSource, IntakeReport, Rejected, intake_paths, intake_sources};
pub use crate::config::FlipbookConfig;
pub use crate::encode::backend::{
    ENCODER_QUALITY, EncoderBackend, EncoderConfig, EncoderFactory, ProgressFn, RenderCallbacks,
};
pub use crate::encode::gif::{GifEncoder, GifEncoderFactory, GifWorkerConfig};
pub use crate::export::artifact::{ARTIFACT_EXTENSION, Artifact, artifact_file_name};
pub use crate::export::job::{ExportSettings, Exporter, JobState, target_canvas};
pub use crate::export::progress::{ProgressObserver, ProgressTracker};
pub use crate::foundation::core::{
    CanvasSize, DEFAULT_BACKGROUND, DEFAULT_CANVAS, FitPolicy, PlaybackRate, Rect,
};
pub use crate::foundation::error::{FlipbookError, FlipbookResult};
pub use crate::playback::Playback;
pub use crate::render::composite::{composite_into, fit_rect, onion_skin};
pub use crate::sequence::{Frame, FrameHandle, ReleaseHook, Sequence, TraceRelease};
pub use crate::session::{Added, Session};
