use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context as _;

use crate::foundation::{core::CanvasSize, error::FlipbookResult};

pub const ARTIFACT_EXTENSION: &str = "gif";

pub const DEFAULT_FILE_PREFIX: &str = "flipbook";

/// `<prefix>-<unix millis>.gif`
pub fn artifact_file_name(prefix: &str, at: SystemTime) -> String {
    let millis = at
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("{prefix}-{millis}.{ARTIFACT_EXTENSION}")
}

/// Encoded animation ready for download.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub frame_count: usize,
    pub canvas: CanvasSize,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write into `dir` under the generated file name, creating `dir` if needed.
    pub fn save_in(&self, dir: &Path) -> FlipbookResult<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), bytes = self.bytes.len(), "artifact saved");
        Ok(path)
    }
}
