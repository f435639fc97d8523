use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::time::SystemTime;

use image::RgbaImage;

use crate::{
    encode::{
        backend::{EncoderConfig, EncoderFactory},
        completion::completion,
    },
    export::{
        artifact::{Artifact, DEFAULT_FILE_PREFIX, artifact_file_name},
        progress::{ProgressObserver, ProgressTracker},
    },
    foundation::{
        core::{CanvasSize, DEFAULT_BACKGROUND, DEFAULT_CANVAS, FitPolicy, PlaybackRate},
        error::{FlipbookError, FlipbookResult},
    },
    render::composite::composite_into,
    sequence::Frame,
};

/// Where the most recent export job stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum JobState {
    #[default]
    Idle,
    PreparingFrames,
    Encoding,
    Done,
    Failed,
}

/// Per-job inputs besides the frames themselves.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSettings {
    pub fit: FitPolicy,
    pub rate: PlaybackRate,
    pub background: [u8; 4],
    pub file_prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            fit: FitPolicy::default(),
            rate: PlaybackRate::default(),
            background: DEFAULT_BACKGROUND,
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
        }
    }
}

/// Canvas for a job: the first frame's natural size, or [`DEFAULT_CANVAS`] when the encoder
/// cannot represent it.
pub fn target_canvas(frames: &[Frame]) -> CanvasSize {
    let Some(first) = frames.first() else {
        return DEFAULT_CANVAS;
    };
    let size = first.natural_size();
    if size.is_empty()
        || size.width > EncoderConfig::MAX_DIMENSION
        || size.height > EncoderConfig::MAX_DIMENSION
    {
        tracing::warn!(
            width = size.width,
            height = size.height,
            "first frame size unusable for export; using default canvas"
        );
        return DEFAULT_CANVAS;
    }
    size
}

/// Runs export jobs, one at a time.
pub struct Exporter {
    factory: Arc<dyn EncoderFactory>,
    busy: AtomicBool,
    state: Mutex<JobState>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Exporter {
    pub fn new(factory: Arc<dyn EncoderFactory>) -> Self {
        Self {
            factory,
            busy: AtomicBool::new(false),
            state: Mutex::new(JobState::Idle),
        }
    }

    pub fn state(&self) -> JobState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_state(&self, next: JobState) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!(from = ?*state, to = ?next, "export state");
        *state = next;
    }

    /// Composite and encode `frames` into one looping animation.
    ///
    /// Returns [`FlipbookError::Busy`] without side effects while another job runs, and
    /// [`FlipbookError::Validation`] without touching the encoder for fewer than two frames.
    /// Every other failure leaves the exporter in [`JobState::Failed`].
    #[tracing::instrument(
        skip_all,
        fields(frames = frames.len(), fit = %settings.fit, fps = settings.rate.fps())
    )]
    pub fn export(
        &self,
        frames: &[Frame],
        settings: &ExportSettings,
        observer: Option<ProgressObserver>,
    ) -> FlipbookResult<Artifact> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::warn!("export requested while another export is running");
            return Err(FlipbookError::Busy);
        };

        if frames.len() < 2 {
            return Err(FlipbookError::validation(format!(
                "at least 2 frames are required to export an animation, got {}",
                frames.len()
            )));
        }

        let tracker = Arc::new(ProgressTracker::new(observer));
        match self.run(frames, settings, &tracker) {
            Ok(artifact) => {
                self.set_state(JobState::Done);
                tracker.complete();
                tracing::info!(
                    file = %artifact.file_name,
                    bytes = artifact.len(),
                    "export finished"
                );
                Ok(artifact)
            }
            Err(e) => {
                self.set_state(JobState::Failed);
                tracing::error!(error = %e, "export failed");
                Err(e)
            }
        }
    }

    fn run(
        &self,
        frames: &[Frame],
        settings: &ExportSettings,
        tracker: &Arc<ProgressTracker>,
    ) -> FlipbookResult<Artifact> {
        self.set_state(JobState::PreparingFrames);
        tracker.preparing(0, frames.len());

        let canvas = target_canvas(frames);
        let mut encoder = self
            .factory
            .create(EncoderConfig::new(canvas.width, canvas.height))?;

        let delay_ms = settings.rate.delay_ms();
        let mut surface = RgbaImage::new(canvas.width, canvas.height);
        for (i, frame) in frames.iter().enumerate() {
            composite_into(&mut surface, frame.image(), settings.fit, settings.background)?;
            encoder.add_frame(&surface, delay_ms)?;
            tracker.preparing(i + 1, frames.len());
        }
        let frame_count = encoder.frame_count();

        self.set_state(JobState::Encoding);
        let (resolver, done) = completion();
        let encode_progress = tracker.clone();
        encoder.render(resolver.into_callbacks(Arc::new(move |pct| encode_progress.encoding(pct))));
        let bytes = done.wait()?;

        if bytes.is_empty() {
            return Err(FlipbookError::EmptyArtifact);
        }

        Ok(Artifact {
            bytes,
            file_name: artifact_file_name(&settings.file_prefix, SystemTime::now()),
            frame_count,
            canvas,
        })
    }
}
