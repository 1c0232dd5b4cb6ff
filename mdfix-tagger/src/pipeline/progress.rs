//! Progress observers
//!
//! The pipeline pushes a [`Progress`] event after every file. Observers are
//! called synchronously; a failing or panicking observer is logged and
//! otherwise ignored.

use mdfix_common::Progress;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Receiver of `(completed, total)` updates
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: Progress) -> anyhow::Result<()>;
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress) -> anyhow::Result<()> + Send + Sync,
{
    fn on_progress(&self, progress: Progress) -> anyhow::Result<()> {
        self(progress)
    }
}

/// Forwards progress into a bounded channel
///
/// Never blocks: a full or closed channel is reported as an observer error.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::Sender<Progress>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<Progress>) -> Self {
        Self { tx }
    }

    /// Create an observer together with the receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Progress>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn on_progress(&self, progress: Progress) -> anyhow::Result<()> {
        self.tx
            .try_send(progress)
            .map_err(|e| anyhow::anyhow!("progress channel: {}", e))
    }
}

/// Deliver `progress` to `observer`, absorbing errors and panics
pub fn notify(observer: Option<&dyn ProgressObserver>, progress: Progress) {
    let Some(observer) = observer else {
        return;
    };

    match catch_unwind(AssertUnwindSafe(|| observer.on_progress(progress))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            debug!(completed = progress.completed, total = progress.total, "Progress observer failed: {:#}", e);
        }
        Err(_) => {
            warn!(completed = progress.completed, total = progress.total, "Progress observer panicked");
        }
    }
}
