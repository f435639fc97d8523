use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::{
    encode::gif::GifWorkerConfig,
    export::{artifact::DEFAULT_FILE_PREFIX, job::ExportSettings},
    foundation::{
        core::{DEFAULT_BACKGROUND, FitPolicy, PlaybackRate},
        error::{FlipbookError, FlipbookResult},
    },
};

/// User-facing settings, loadable from JSON. Every field has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlipbookConfig {
    pub fit: FitPolicy,
    pub fps: PlaybackRate,
    /// Straight RGBA8; alpha must be 255.
    pub background: [u8; 4],
    pub out_dir: PathBuf,
    pub file_prefix: String,
    pub workers: Option<usize>,
    pub onion_opacity: f32,
}

impl Default for FlipbookConfig {
    fn default() -> Self {
        Self {
            fit: FitPolicy::default(),
            fps: PlaybackRate::default(),
            background: DEFAULT_BACKGROUND,
            out_dir: PathBuf::from("."),
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            workers: None,
            onion_opacity: 0.35,
        }
    }
}

impl FlipbookConfig {
    pub fn load(path: &Path) -> FlipbookResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> FlipbookResult<()> {
        if self.background[3] != 255 {
            return Err(FlipbookError::validation(
                "background must be opaque (alpha 255)",
            ));
        }
        if self.file_prefix.is_empty()
            || self
                .file_prefix
                .chars()
                .any(|c| std::path::is_separator(c) || c.is_control())
        {
            return Err(FlipbookError::validation(format!(
                "file_prefix '{}' must be a non-empty plain file name",
                self.file_prefix
            )));
        }
        if self.workers == Some(0) {
            return Err(FlipbookError::validation("workers must be >= 1 when set"));
        }
        if !(0.0..=1.0).contains(&self.onion_opacity) {
            return Err(FlipbookError::validation(format!(
                "onion_opacity must be in [0, 1], got {}",
                self.onion_opacity
            )));
        }
        Ok(())
    }

    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            fit: self.fit,
            rate: self.fps,
            background: self.background,
            file_prefix: self.file_prefix.clone(),
        }
    }

    pub fn worker_config(&self) -> GifWorkerConfig {
        GifWorkerConfig {
            workers: self.workers,
            ..GifWorkerConfig::default()
        }
    }
}
