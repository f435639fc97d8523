use std::path::Path;

use crate::{
    assets::{
        DecodedImage,
        decode::{decode_image, sniff_image_format},
    },
    foundation::error::{FlipbookError, FlipbookResult},
};

/// One candidate upload held in memory.
#[derive(Clone, Debug)]
pub struct ImageSource {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ImageSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Why a candidate was left out of a batch. None of these abort the batch.
#[derive(Debug)]
pub enum Rejected {
    NotAnImage { name: String },
    Unreadable { name: String, reason: String },
    Decode { name: String, error: FlipbookError },
}

impl Rejected {
    pub fn name(&self) -> &str {
        match self {
            Self::NotAnImage { name }
            | Self::Unreadable { name, .. }
            | Self::Decode { name, .. } => name,
        }
    }
}

impl std::fmt::Display for Rejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnImage { name } => write!(f, "'{name}' is not an image"),
            Self::Unreadable { name, reason } => write!(f, "'{name}' could not be read: {reason}"),
            Self::Decode { name, error } => write!(f, "'{name}' failed to decode: {error}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct IntakeReport {
    /// Accepted images in input order.
    pub frames: Vec<DecodedImage>,
    pub rejected: Vec<Rejected>,
}

/// Decode a batch of in-memory uploads.
///
/// Non-image entries are skipped and decode failures are collected per entry. Fails only when
/// the batch yields no usable image at all.
#[tracing::instrument(skip_all)]
pub fn intake_sources(
    sources: impl IntoIterator<Item = ImageSource>,
) -> FlipbookResult<IntakeReport> {
    let mut report = IntakeReport::default();
    for src in sources {
        accept_one(&mut report, &src.name, &src.bytes);
    }
    finish(report)
}

/// Read and decode a batch of files from disk.
#[tracing::instrument(skip_all)]
pub fn intake_paths<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
) -> FlipbookResult<IntakeReport> {
    let mut report = IntakeReport::default();
    for path in paths {
        let path = path.as_ref();
        let name = display_name(path);
        match std::fs::read(path) {
            Ok(bytes) => accept_one(&mut report, &name, &bytes),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable file");
                report.rejected.push(Rejected::Unreadable {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }
    finish(report)
}

fn accept_one(report: &mut IntakeReport, name: &str, bytes: &[u8]) {
    if sniff_image_format(name, bytes).is_none() {
        tracing::warn!(file = name, "skipping non-image file");
        report.rejected.push(Rejected::NotAnImage {
            name: name.to_string(),
        });
        return;
    }

    match decode_image(name, bytes) {
        Ok(img) => {
            tracing::debug!(file = name, width = img.width(), height = img.height(), "decoded");
            report.frames.push(img);
        }
        Err(error) => {
            tracing::warn!(file = name, %error, "skipping image that failed to decode");
            report.rejected.push(Rejected::Decode {
                name: name.to_string(),
                error,
            });
        }
    }
}

fn finish(report: IntakeReport) -> FlipbookResult<IntakeReport> {
    if report.frames.is_empty() {
        return Err(FlipbookError::validation(format!(
            "no valid image files in batch ({} rejected)",
            report.rejected.len()
        )));
    }
    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
