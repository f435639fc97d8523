use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;

use crate::{
    assets::{
        DecodedImage,
        intake::{ImageSource, Rejected, intake_paths, intake_sources},
    },
    config::FlipbookConfig,
    encode::{backend::EncoderFactory, gif::GifEncoderFactory},
    export::{
        artifact::Artifact,
        job::{ExportSettings, Exporter, JobState, target_canvas},
        progress::ProgressObserver,
    },
    foundation::{
        core::{FitPolicy, PlaybackRate},
        error::{FlipbookError, FlipbookResult},
    },
    playback::Playback,
    render::composite::{composite_into, onion_skin},
    sequence::{FrameHandle, ReleaseHook, Sequence, TraceRelease},
};

/// A flipbook being edited: frames, preview state, export settings, and the exporter.
///
/// Dropping the session releases every remaining frame.
pub struct Session {
    sequence: Sequence,
    playback: Playback,
    fit: FitPolicy,
    background: [u8; 4],
    file_prefix: String,
    exporter: Exporter,
}

/// Outcome of adding a batch of files.
#[derive(Debug)]
pub struct Added {
    pub handles: Vec<FrameHandle>,
    pub rejected: Vec<Rejected>,
}

impl Session {
    pub fn new(config: &FlipbookConfig) -> FlipbookResult<Self> {
        config.validate()?;
        let factory = Arc::new(GifEncoderFactory::new(config.worker_config()));
        Ok(Self::with_parts(config, factory, TraceRelease))
    }

    pub fn with_parts(
        config: &FlipbookConfig,
        factory: Arc<dyn EncoderFactory>,
        release: impl ReleaseHook + 'static,
    ) -> Self {
        let ExportSettings {
            fit,
            rate,
            background,
            file_prefix,
        } = config.export_settings();
        Self {
            sequence: Sequence::with_release_hook(release),
            playback: Playback::new(rate),
            fit,
            background,
            file_prefix,
            exporter: Exporter::new(factory),
        }
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn export_state(&self) -> JobState {
        self.exporter.state()
    }

    pub fn fit(&self) -> FitPolicy {
        self.fit
    }

    pub fn set_fit(&mut self, fit: FitPolicy) {
        self.fit = fit;
    }

    pub fn rate(&self) -> PlaybackRate {
        self.playback.rate()
    }

    pub fn set_rate(&mut self, rate: PlaybackRate) {
        self.playback.set_rate(rate);
    }

    /// Settings the next export will run with. The rate is the one driving the preview.
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            fit: self.fit,
            rate: self.playback.rate(),
            background: self.background,
            file_prefix: self.file_prefix.clone(),
        }
    }

    pub fn add_paths<P: AsRef<Path>>(
        &mut self,
        paths: impl IntoIterator<Item = P>,
    ) -> FlipbookResult<Added> {
        let report = intake_paths(paths)?;
        Ok(self.accept(report.frames, report.rejected))
    }

    pub fn add_sources(
        &mut self,
        sources: impl IntoIterator<Item = ImageSource>,
    ) -> FlipbookResult<Added> {
        let report = intake_sources(sources)?;
        Ok(self.accept(report.frames, report.rejected))
    }

    pub fn add_images(
        &mut self,
        images: impl IntoIterator<Item = DecodedImage>,
    ) -> Vec<FrameHandle> {
        self.sequence.append(images)
    }

    fn accept(&mut self, frames: Vec<DecodedImage>, rejected: Vec<Rejected>) -> Added {
        Added {
            handles: self.sequence.append(frames),
            rejected,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<FrameHandle> {
        let removed = self.sequence.remove(index);
        if self.sequence.len() < 2 {
            self.playback.stop();
        }
        removed
    }

    pub fn clear(&mut self) {
        self.playback.stop();
        self.sequence.clear();
    }

    pub fn play(&mut self) -> bool {
        self.playback.play(&self.sequence)
    }

    pub fn pause(&mut self) {
        self.playback.stop();
    }

    pub fn toggle_playback(&mut self) -> bool {
        self.playback.toggle(&self.sequence)
    }

    /// Timer tick for the preview.
    pub fn tick(&mut self) -> bool {
        self.playback.tick(&mut self.sequence)
    }

    pub fn next_frame(&mut self) {
        self.playback.stop();
        self.sequence.step_forward();
    }

    pub fn prev_frame(&mut self) {
        self.playback.stop();
        self.sequence.step_back();
    }

    pub fn select(&mut self, index: usize) -> bool {
        self.playback.stop();
        self.sequence.select(index)
    }

    /// Render frame `index` as it will appear in the export, optionally with the previous frame
    /// mixed in at `onion` opacity.
    pub fn preview(&self, index: usize, onion: Option<f32>) -> FlipbookResult<RgbaImage> {
        let frames = self.sequence.frames();
        let frame = frames.get(index).ok_or_else(|| {
            FlipbookError::validation(format!(
                "frame index {index} out of range (have {})",
                frames.len()
            ))
        })?;

        let canvas = target_canvas(frames);
        let mut surface = RgbaImage::new(canvas.width, canvas.height);
        composite_into(&mut surface, frame.image(), self.fit, self.background)?;

        if let Some(opacity) = onion
            && index > 0
        {
            let mut previous = RgbaImage::new(canvas.width, canvas.height);
            composite_into(
                &mut previous,
                frames[index - 1].image(),
                self.fit,
                self.background,
            )?;
            onion_skin(&mut surface, &previous, opacity)?;
        }
        Ok(surface)
    }

    /// Export the current sequence. Playback is left untouched.
    pub fn export(&self, observer: Option<ProgressObserver>) -> FlipbookResult<Artifact> {
        let settings = self.export_settings();
        self.exporter
            .export(self.sequence.frames(), &settings, observer)
    }
}
