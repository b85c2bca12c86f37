//! Background flashing between two colors.
//!
//! A [`FlashLoop`] owns a spawned task that alternates the beacon between
//! the two colors of a [`FlashPattern`]. The task only checks for
//! cancellation while waiting, so a frame that has started is always
//! written in full.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::host::{LinkError, SharedLink};
use crate::severity::FlashPattern;

/// Why a flash loop stopped.
#[derive(Debug)]
pub enum FlashExit {
    /// Superseded or shut down.
    Cancelled,
    /// A write failed; the port has been closed.
    Failed(LinkError),
}

/// Handle to a running flash task.
pub struct FlashLoop {
    cancel: CancellationToken,
    handle: JoinHandle<FlashExit>,
}

impl FlashLoop {
    /// Spawn a loop on the current runtime. The primary frame is sent
    /// immediately.
    pub fn start(link: SharedLink, pattern: FlashPattern) -> FlashLoop {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(link, pattern, cancel.clone()));
        tracing::debug!(
            to_secondary_ms = pattern.to_secondary.as_millis() as u64,
            to_primary_ms = pattern.to_primary.as_millis() as u64,
            "Flash loop started"
        );
        FlashLoop { cancel, handle }
    }

    /// True once the task has exited on its own (after a write failure).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the loop and wait until the task has exited.
    pub async fn stop(self) -> FlashExit {
        self.cancel.cancel();
        match self.handle.await {
            Ok(exit) => exit,
            Err(err) => {
                // A panicking loop has stopped writing, which is all the
                // caller needs.
                tracing::error!(error = %err, "Flash loop task failed");
                FlashExit::Cancelled
            }
        }
    }
}

async fn run(link: SharedLink, pattern: FlashPattern, cancel: CancellationToken) -> FlashExit {
    let steps = [
        (pattern.primary, pattern.to_secondary),
        (pattern.secondary, pattern.to_primary),
    ];

    loop {
        for (color, hold) in steps {
            if let Err(err) = link.lock().await.send_frame(color) {
                tracing::error!(error = %err, "Flash loop stopped on write failure");
                return FlashExit::Failed(err);
            }
            if wait_or_cancelled(hold, &cancel).await {
                tracing::debug!("Flash loop cancelled");
                return FlashExit::Cancelled;
            }
        }
    }
}

/// Sleep for `hold`. Returns true if cancelled first.
async fn wait_or_cancelled(hold: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep(hold) => false,
    }
}
