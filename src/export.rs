//! The export job: composite every frame, feed the encoder, deliver one artifact.

pub mod artifact;
pub mod job;
pub mod progress;
