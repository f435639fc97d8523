use std::sync::{Arc, Mutex, mpsc};

use crate::{
    encode::backend::{ProgressFn, RenderCallbacks},
    foundation::error::{FlipbookError, FlipbookResult},
};

type Outcome = FlipbookResult<Vec<u8>>;

/// Resolving side of a single-resolution completion; cheap to clone.
#[derive(Clone)]
pub struct Resolver {
    slot: Arc<Mutex<Option<mpsc::SyncSender<Outcome>>>>,
}

/// Waiting side of a single-resolution completion.
pub struct Completion {
    rx: mpsc::Receiver<Outcome>,
}

/// A completion that resolves once; later resolutions are ignored.
pub fn completion() -> (Resolver, Completion) {
    let (tx, rx) = mpsc::sync_channel(1);
    (
        Resolver {
            slot: Arc::new(Mutex::new(Some(tx))),
        },
        Completion { rx },
    )
}

impl Resolver {
    /// Returns false if the completion was already resolved.
    pub fn resolve(&self, outcome: Outcome) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => {
                // The waiter may be gone already; nothing to deliver to then.
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Paired finished/error callbacks that both resolve this completion.
    pub fn into_callbacks(self, on_progress: ProgressFn) -> RenderCallbacks {
        let on_error = self.clone();
        RenderCallbacks {
            on_progress,
            on_finished: Box::new(move |bytes| {
                self.resolve(Ok(bytes));
            }),
            on_error: Box::new(move |err| {
                on_error.resolve(Err(err));
            }),
        }
    }
}

impl Completion {
    /// Block until resolved. Fails if every resolver was dropped without resolving.
    pub fn wait(self) -> Outcome {
        self.rx.recv().map_err(|_| {
            FlipbookError::encode("encoder dropped its completion callbacks without finishing")
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_progress() -> ProgressFn {
        Arc::new(|_| {})
    }

    #[test]
    fn first_resolution_wins() {
        let (resolver, completion) = completion();
        assert!(resolver.resolve(Ok(vec![1, 2, 3])));
        assert!(!resolver.resolve(Err(FlipbookError::encode("late"))));
        assert_eq!(completion.wait().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn error_callback_rejects() {
        let (resolver, completion) = completion();
        let cb = resolver.into_callbacks(no_progress());
        std::thread::spawn(move || (cb.on_error)(FlipbookError::encode("boom")))
            .join()
            .unwrap();
        let err = completion.wait().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn dropped_callbacks_do_not_hang() {
        let (resolver, completion) = completion();
        drop(resolver.into_callbacks(no_progress()));
        assert!(matches!(completion.wait(), Err(FlipbookError::Encode(_))));
    }
}
