use crate::foundation::error::{FlipbookError, FlipbookResult};

pub use kurbo::Rect;

/// How a source image is mapped onto the fixed export canvas.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FitPolicy {
    /// Preserve aspect ratio and letterbox inside the canvas.
    #[default]
    Contain,
    /// Preserve aspect ratio and fill the canvas, cropping overflow.
    Cover,
    /// Ignore aspect ratio and map onto the canvas exactly.
    Stretch,
}

impl FitPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contain => "contain",
            Self::Cover => "cover",
            Self::Stretch => "stretch",
        }
    }
}

impl std::fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FitPolicy {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contain" => Ok(Self::Contain),
            "cover" => Ok(Self::Cover),
            "stretch" => Ok(Self::Stretch),
            other => Err(FlipbookError::validation(format!(
                "unknown fit policy '{other}' (expected contain, cover or stretch)"
            ))),
        }
    }
}

/// Frames per second shared by preview playback and export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(transparent)]
pub struct PlaybackRate(u32);

impl PlaybackRate {
    pub const MIN_FPS: u32 = 1;
    pub const MAX_FPS: u32 = 30;

    /// GIF delays below this are rewritten by most decoders, so never emit them.
    pub const MIN_DELAY_MS: u32 = 10;

    pub fn new(fps: u32) -> FlipbookResult<Self> {
        if !(Self::MIN_FPS..=Self::MAX_FPS).contains(&fps) {
            return Err(FlipbookError::validation(format!(
                "fps must be in [{}, {}], got {fps}",
                Self::MIN_FPS,
                Self::MAX_FPS
            )));
        }
        Ok(Self(fps))
    }

    /// Clamp arbitrary input into range, like a slider would.
    pub fn clamped(fps: u32) -> Self {
        Self(fps.clamp(Self::MIN_FPS, Self::MAX_FPS))
    }

    pub fn fps(self) -> u32 {
        self.0
    }

    /// `max(10, round(1000 / fps))`.
    pub fn delay_ms(self) -> u32 {
        let rounded = (1000 + self.0 / 2) / self.0;
        rounded.max(Self::MIN_DELAY_MS)
    }

    pub fn interval(self) -> std::time::Duration {
        std::time::Duration::from_millis(u64::from(self.delay_ms()))
    }
}

impl Default for PlaybackRate {
    fn default() -> Self {
        Self(10)
    }
}

impl<'de> serde::Deserialize<'de> for PlaybackRate {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fps = u32::deserialize(deserializer)?;
        Self::new(fps).map_err(serde::de::Error::custom)
    }
}

/// Pixel dimensions of a canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Export canvas used when the first frame cannot provide one.
pub const DEFAULT_CANVAS: CanvasSize = CanvasSize {
    width: 480,
    height: 480,
};

/// Opaque background painted under every composited frame (straight RGBA8).
pub const DEFAULT_BACKGROUND: [u8; 4] = [255, 255, 255, 255];
