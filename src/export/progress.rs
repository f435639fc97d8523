use std::sync::{Arc, Mutex};

/// Receives job progress in percent.
pub type ProgressObserver = Arc<dyn Fn(u8) + Send + Sync>;

/// Share of the bar given to frame preparation; encoding fills the rest.
const PREPARE_SHARE: u32 = 50;

/// Monotonic job progress.
///
/// Values never decrease, and 100 is only reachable through [`ProgressTracker::complete`].
pub struct ProgressTracker {
    last: Mutex<Option<u8>>,
    observer: Option<ProgressObserver>,
}

impl ProgressTracker {
    pub fn new(observer: Option<ProgressObserver>) -> Self {
        Self {
            last: Mutex::new(None),
            observer,
        }
    }

    pub fn current(&self) -> u8 {
        self.lock().unwrap_or(0)
    }

    /// `done` of `total` frames composited and queued.
    pub fn preparing(&self, done: usize, total: usize) {
        let total = total.max(1) as u32;
        let done = (done as u32).min(total);
        self.advance((done * PREPARE_SHARE / total) as u8);
    }

    /// Encoder-reported percent, mapped onto the back half.
    pub fn encoding(&self, encoder_pct: u8) {
        let pct = u32::from(encoder_pct.min(100));
        self.advance((PREPARE_SHARE + pct * (100 - PREPARE_SHARE) / 100) as u8);
    }

    pub fn complete(&self) {
        self.emit(100);
    }

    fn advance(&self, pct: u8) {
        self.emit(pct.min(99));
    }

    fn emit(&self, pct: u8) {
        let mut last = self.lock();
        if last.is_some_and(|prev| pct <= prev) {
            return;
        }
        *last = Some(pct);
        if let Some(observer) = &self.observer {
            observer(pct);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<u8>> {
        self.last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorded() -> (ProgressTracker, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let tracker = ProgressTracker::new(Some(Arc::new(move |p| sink.lock().unwrap().push(p))));
        (tracker, seen)
    }

    #[test]
    fn maps_phases_and_stays_monotonic() {
        let (t, seen) = recorded();
        t.preparing(0, 2);
        t.preparing(1, 2);
        t.preparing(2, 2);
        t.encoding(0);
        t.encoding(60);
        t.encoding(30);
        t.encoding(100);
        assert_eq!(seen.lock().unwrap().as_slice(), &[0, 25, 50, 80, 99]);
        assert_eq!(t.current(), 99);
    }

    #[test]
    fn hundred_only_on_complete() {
        let (t, seen) = recorded();
        t.encoding(100);
        t.encoding(100);
        assert_eq!(t.current(), 99);
        t.complete();
        t.encoding(100);
        assert_eq!(seen.lock().unwrap().as_slice(), &[99, 100]);
    }
}
