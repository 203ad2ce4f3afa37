//! Request cancellation.

use std::future::Future;
use tokio::sync::watch;

/// Owner side of a cancellation signal.
///
/// Every [`AbortSignal`] handed out by the controller observes the same flag, including
/// signals created after [`AbortController::abort`] was called.
#[derive(Debug)]
pub struct AbortController {
    /// Watch channel sender; `true` once aborted.
    tx: watch::Sender<bool>,
}

impl AbortController {
    /// Create a new controller in the non-aborted state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// Get a signal bound to this controller.
    pub fn signal(&self) -> AbortSignal {
        AbortSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Abort every dispatch observing this controller's signals.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the controller aborts. Never resolves if the controller is dropped
    /// without aborting.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|aborted| *aborted).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Drive `fut` unless `signal` fires first; `None` means aborted.
pub(crate) async fn until_aborted<F: Future>(signal: Option<&AbortSignal>, fut: F) -> Option<F::Output> {
    match signal {
        Some(signal) => {
            tokio::select! {
                biased;
                () = signal.aborted() => None,
                out = fut => Some(out),
            }
        }
        None => Some(fut.await),
    }
}

pub(crate) fn is_aborted(signal: Option<&AbortSignal>) -> bool {
    signal.is_some_and(AbortSignal::is_aborted)
}

/// Aborts its controller when dropped.
#[derive(Debug)]
pub(crate) struct AbortOnDrop(AbortController);

impl AbortOnDrop {
    pub(crate) fn new(controller: AbortController) -> Self {
        Self(controller)
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
