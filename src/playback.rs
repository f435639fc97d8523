use std::time::Duration;

use crate::{foundation::core::PlaybackRate, sequence::Sequence};

/// On-screen preview cycling. Shares its rate with export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Playback {
    rate: PlaybackRate,
    playing: bool,
}

impl Playback {
    pub fn new(rate: PlaybackRate) -> Self {
        Self {
            rate,
            playing: false,
        }
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn set_rate(&mut self, rate: PlaybackRate) {
        self.rate = rate;
    }

    pub fn interval(&self) -> Duration {
        self.rate.interval()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Start cycling; needs at least two frames to have anything to cycle.
    pub fn play(&mut self, seq: &Sequence) -> bool {
        self.playing = seq.len() >= 2;
        self.playing
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn toggle(&mut self, seq: &Sequence) -> bool {
        if self.playing {
            self.stop();
            false
        } else {
            self.play(seq)
        }
    }

    /// One timer tick: advance the cursor, wrapping to the first frame.
    pub fn tick(&mut self, seq: &mut Sequence) -> bool {
        if !self.playing {
            return false;
        }
        if seq.is_empty() {
            self.playing = false;
            return false;
        }
        seq.step_forward();
        true
    }
}
