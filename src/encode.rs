//! Encoder backends.
//!
//! The orchestrator talks to encoders only through [`backend::EncoderFactory`] and
//! [`backend::EncoderBackend`]; completion is callback based and bridged by [`completion`].

pub mod backend;
pub mod completion;
pub mod gif;
