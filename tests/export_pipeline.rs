use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
    mpsc,
};

use flipbook::{
    DecodedImage, EncoderBackend, EncoderConfig, EncoderFactory, ExportSettings, Exporter,
    FitPolicy, FlipbookError, FlipbookResult, Frame, GifEncoderFactory, GifWorkerConfig, JobState,
    PlaybackRate, ProgressObserver, RenderCallbacks, Sequence,
};
use image::{Rgba, RgbaImage};

#[derive(Clone, Copy)]
enum Outcome {
    Bytes,
    Empty,
    Fail,
}

/// Encoder stand-in that records every queued frame.
struct FakeFactory {
    outcome: Outcome,
    created: AtomicUsize,
    queued: Arc<Mutex<Vec<(Vec<u8>, u32)>>>,
    started: Mutex<Option<mpsc::Sender<()>>>,
    gate: Mutex<Option<mpsc::Receiver<()>>>,
}

impl FakeFactory {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            created: AtomicUsize::new(0),
            queued: Arc::new(Mutex::new(Vec::new())),
            started: Mutex::new(None),
            gate: Mutex::new(None),
        }
    }

    /// Block `render` until the returned sender fires; `started` fires on `create`.
    fn gated(outcome: Outcome) -> (Self, mpsc::Sender<()>, mpsc::Receiver<()>) {
        let f = Self::new(outcome);
        let (gate_tx, gate_rx) = mpsc::channel();
        let (started_tx, started_rx) = mpsc::channel();
        *f.gate.lock().unwrap() = Some(gate_rx);
        *f.started.lock().unwrap() = Some(started_tx);
        (f, gate_tx, started_rx)
    }
}

struct FakeEncoder {
    outcome: Outcome,
    queued: Arc<Mutex<Vec<(Vec<u8>, u32)>>>,
    count: usize,
    gate: Option<mpsc::Receiver<()>>,
}

impl EncoderFactory for FakeFactory {
    fn create(&self, cfg: EncoderConfig) -> FlipbookResult<Box<dyn EncoderBackend>> {
        cfg.validate()?;
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = self.started.lock().unwrap().take() {
            tx.send(()).unwrap();
        }
        Ok(Box::new(FakeEncoder {
            outcome: self.outcome,
            queued: self.queued.clone(),
            count: 0,
            gate: self.gate.lock().unwrap().take(),
        }))
    }
}

impl EncoderBackend for FakeEncoder {
    fn add_frame(&mut self, pixels: &RgbaImage, delay_ms: u32) -> FlipbookResult<()> {
        self.queued
            .lock()
            .unwrap()
            .push((pixels.as_raw().clone(), delay_ms));
        self.count += 1;
        Ok(())
    }

    fn frame_count(&self) -> usize {
        self.count
    }

    fn render(self: Box<Self>, cb: RenderCallbacks) {
        std::thread::spawn(move || {
            if let Some(gate) = self.gate {
                gate.recv().unwrap();
            }
            (cb.on_progress)(0);
            (cb.on_progress)(50);
            (cb.on_progress)(100);
            match self.outcome {
                Outcome::Bytes => (cb.on_finished)(b"GIF89a-fake".to_vec()),
                Outcome::Empty => (cb.on_finished)(Vec::new()),
                Outcome::Fail => (cb.on_error)(FlipbookError::encode("worker crashed")),
            }
        });
    }
}

fn solid(w: u32, h: u32, rgb: [u8; 3]) -> DecodedImage {
    DecodedImage::new(
        format!("{rgb:?}"),
        RgbaImage::from_pixel(w, h, Rgba([rgb[0], rgb[1], rgb[2], 255])),
    )
}

fn frames(images: Vec<DecodedImage>) -> Vec<Frame> {
    let mut seq = Sequence::new();
    seq.append(images);
    seq.frames().to_vec()
}

fn recorder() -> (ProgressObserver, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (Arc::new(move |p| sink.lock().unwrap().push(p)), seen)
}

fn assert_non_decreasing(values: &[u8]) {
    assert!(
        values.windows(2).all(|w| w[0] <= w[1]),
        "progress went backwards: {values:?}"
    );
}

#[test]
fn fewer_than_two_frames_never_reach_the_encoder() {
    let factory = Arc::new(FakeFactory::new(Outcome::Bytes));
    let exporter = Exporter::new(factory.clone());

    for n in 0..2 {
        let input = frames((0..n).map(|_| solid(4, 4, [0, 0, 0])).collect());
        let err = exporter
            .export(&input, &ExportSettings::default(), None)
            .unwrap_err();
        assert!(matches!(err, FlipbookError::Validation(_)));
    }
    assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    assert_eq!(exporter.state(), JobState::Idle);
}

#[test]
fn frames_reach_encoder_in_insertion_order() {
    let factory = Arc::new(FakeFactory::new(Outcome::Bytes));
    let exporter = Exporter::new(factory.clone());
    let colors = [[255, 0, 0], [0, 255, 0], [0, 0, 255]];
    let input = frames(colors.iter().map(|&c| solid(6, 6, c)).collect());

    let settings = ExportSettings {
        rate: PlaybackRate::new(10).unwrap(),
        ..ExportSettings::default()
    };
    let artifact = exporter.export(&input, &settings, None).unwrap();
    assert_eq!(artifact.frame_count, 3);

    let queued = factory.queued.lock().unwrap();
    assert_eq!(queued.len(), 3);
    for ((pixels, delay), rgb) in queued.iter().zip(colors) {
        assert_eq!(&pixels[0..4], &[rgb[0], rgb[1], rgb[2], 255]);
        assert_eq!(*delay, 100);
    }
}

#[test]
fn every_frame_is_fitted_to_the_first_frames_canvas() {
    let factory = Arc::new(FakeFactory::new(Outcome::Bytes));
    let exporter = Exporter::new(factory.clone());
    let input = frames(vec![solid(4, 4, [255, 0, 0]), solid(8, 2, [0, 0, 255])]);

    let settings = ExportSettings {
        fit: FitPolicy::Contain,
        background: [0, 0, 0, 255],
        ..ExportSettings::default()
    };
    exporter.export(&input, &settings, None).unwrap();

    let queued = factory.queued.lock().unwrap();
    let second = RgbaImage::from_raw(4, 4, queued[1].0.clone()).unwrap();
    // 8x2 contained in 4x4 -> 4x1 band through the middle.
    assert_eq!(second.get_pixel(0, 0).0, [0, 0, 0, 255]);
    assert_eq!(second.get_pixel(0, 3).0, [0, 0, 0, 255]);
    assert_eq!(second.get_pixel(2, 2).0, [0, 0, 255, 255]);
}

#[test]
fn empty_artifact_fails_the_job() {
    let exporter = Exporter::new(Arc::new(FakeFactory::new(Outcome::Empty)));
    let input = frames(vec![solid(2, 2, [1, 1, 1]), solid(2, 2, [2, 2, 2])]);
    let (observer, seen) = recorder();

    let err = exporter
        .export(&input, &ExportSettings::default(), Some(observer))
        .unwrap_err();
    assert!(matches!(err, FlipbookError::EmptyArtifact));
    assert_eq!(exporter.state(), JobState::Failed);

    let seen = seen.lock().unwrap();
    assert_non_decreasing(&seen);
    assert!(!seen.contains(&100));
}

#[test]
fn encoder_error_is_surfaced_with_its_message() {
    let exporter = Exporter::new(Arc::new(FakeFactory::new(Outcome::Fail)));
    let input = frames(vec![solid(2, 2, [1, 1, 1]), solid(2, 2, [2, 2, 2])]);

    let err = exporter
        .export(&input, &ExportSettings::default(), None)
        .unwrap_err();
    assert!(err.to_string().contains("worker crashed"));
    assert_eq!(exporter.state(), JobState::Failed);
}

#[test]
fn unavailable_encoder_fails_the_job() {
    let exporter = Exporter::new(Arc::new(GifEncoderFactory::new(GifWorkerConfig {
        workers: Some(0),
        ..GifWorkerConfig::default()
    })));
    let input = frames(vec![solid(2, 2, [1, 1, 1]), solid(2, 2, [2, 2, 2])]);

    let err = exporter
        .export(&input, &ExportSettings::default(), None)
        .unwrap_err();
    assert!(matches!(err, FlipbookError::EncoderUnavailable(_)));
    assert_eq!(exporter.state(), JobState::Failed);
}

#[test]
fn second_export_while_running_is_rejected() {
    let (factory, release, started) = FakeFactory::gated(Outcome::Bytes);
    let factory = Arc::new(factory);
    let exporter = Arc::new(Exporter::new(factory.clone()));
    let input = frames(vec![solid(2, 2, [1, 1, 1]), solid(2, 2, [2, 2, 2])]);

    let first = {
        let exporter = exporter.clone();
        let input = input.clone();
        std::thread::spawn(move || exporter.export(&input, &ExportSettings::default(), None))
    };
    started.recv().unwrap();
    assert!(exporter.is_busy());

    let err = exporter
        .export(&input, &ExportSettings::default(), None)
        .unwrap_err();
    assert!(matches!(err, FlipbookError::Busy));

    release.send(()).unwrap();
    first.join().unwrap().unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    assert_eq!(exporter.state(), JobState::Done);
    assert!(!exporter.is_busy());
}

#[test]
fn two_square_frames_at_ten_fps_produce_a_looping_gif() {
    let exporter = Exporter::new(Arc::new(GifEncoderFactory::default()));
    let input = frames(vec![
        solid(100, 100, [200, 30, 30]),
        solid(100, 100, [30, 30, 200]),
    ]);
    let settings = ExportSettings {
        fit: FitPolicy::Contain,
        rate: PlaybackRate::new(10).unwrap(),
        ..ExportSettings::default()
    };
    let (observer, seen) = recorder();

    let artifact = exporter.export(&input, &settings, Some(observer)).unwrap();
    assert_eq!(exporter.state(), JobState::Done);
    assert_eq!((artifact.canvas.width, artifact.canvas.height), (100, 100));
    assert!(artifact.file_name.starts_with("flipbook-"));
    assert!(artifact.file_name.ends_with(".gif"));
    assert!(!artifact.is_empty());

    let seen = seen.lock().unwrap();
    assert_non_decreasing(&seen);
    assert_eq!(seen.last(), Some(&100));
    assert_eq!(seen.iter().filter(|&&p| p == 100).count(), 1);

    let mut opts = gif::DecodeOptions::new();
    opts.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = opts.read_info(artifact.bytes.as_slice()).unwrap();
    let mut delays = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        delays.push(frame.delay);
    }
    assert_eq!(delays, [10, 10]);
}

#[test]
fn exporter_is_reusable_after_failure() {
    let exporter = Exporter::new(Arc::new(GifEncoderFactory::default()));
    let one = frames(vec![solid(3, 3, [9, 9, 9])]);
    assert!(exporter.export(&one, &ExportSettings::default(), None).is_err());

    let two = frames(vec![solid(3, 3, [9, 9, 9]), solid(3, 3, [90, 90, 90])]);
    exporter
        .export(&two, &ExportSettings::default(), None)
        .unwrap();
    assert_eq!(exporter.state(), JobState::Done);
}
