//! Periodic polling of active problems into the beacon.
//!
//! Each tick asks a [`ProblemSource`] for the severities of the currently
//! active problems, picks the most severe configured option and applies it
//! to the [`BeaconController`]. Runs until the cancellation token fires.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::beacon::{BeaconController, BeaconOutput};
use crate::severity::{Severity, SeverityTable};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Problem source closed")]
    Closed,
    #[error("Problem source unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can report which severities currently have active problems.
#[allow(async_fn_in_trait)]
pub trait ProblemSource {
    async fn active_severities(&mut self) -> Result<Vec<Severity>, SourceError>;
}

/// Reports the latest value published on the channel.
impl ProblemSource for watch::Receiver<Vec<Severity>> {
    async fn active_severities(&mut self) -> Result<Vec<Severity>, SourceError> {
        if self.has_changed().is_err() {
            return Err(SourceError::Closed);
        }
        Ok(self.borrow_and_update().clone())
    }
}

/// Run the poll loop until `cancel` is triggered, then shut the beacon down.
pub async fn run<S: ProblemSource>(
    mut beacon: BeaconController,
    mut source: S,
    table: &SeverityTable,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        severities = ?table.severities().collect::<Vec<_>>(),
        "Beacon poll started"
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Beacon poll stopping");
                break;
            }
            _ = ticker.tick() => {
                poll_once(&mut beacon, &mut source, table).await;
            }
        }
    }

    beacon.shutdown().await;
}

/// One poll: query, select, apply. Failures are logged and the beacon is
/// left as it is.
pub async fn poll_once<S: ProblemSource>(
    beacon: &mut BeaconController,
    source: &mut S,
    table: &SeverityTable,
) -> Option<BeaconOutput> {
    let active = match source.active_severities().await {
        Ok(active) => active,
        Err(e) => {
            tracing::warn!(error = %e, "Could not obtain active problems, skipping poll");
            return None;
        }
    };

    let option = table.select(active.iter().copied());
    tracing::debug!(
        active = active.len(),
        selected = ?option.map(|o| o.rank),
        "Polled active problems"
    );

    match beacon.apply_state(option).await {
        Ok(output) => Some(output),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to update beacon");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::color::encode;
    use crate::host::testing::MemoryPort;
    use crate::host::BeaconLink;

    struct Scripted(VecDeque<Result<Vec<Severity>, SourceError>>);

    impl ProblemSource for Scripted {
        async fn active_severities(&mut self) -> Result<Vec<Severity>, SourceError> {
            self.0.pop_front().unwrap_or(Ok(Vec::new()))
        }
    }

    fn controller() -> (BeaconController, MemoryPort) {
        let port = MemoryPort::new();
        let link = BeaconLink::new(Box::new(port.clone())).shared();
        (BeaconController::new(link, encode("#01FF01").unwrap(), 9), port)
    }

    #[tokio::test]
    async fn poll_applies_most_severe_option() {
        let (mut beacon, port) = controller();
        let table = SeverityTable::default();
        let mut source = Scripted(VecDeque::from([Ok(vec![Severity::Warning, Severity::Average])]));

        let output = poll_once(&mut beacon, &mut source, &table).await;

        assert_eq!(output, Some(BeaconOutput::Steady));
        assert_eq!(port.lines(), vec!["WR 00 FF A5 01"]);
    }

    #[tokio::test]
    async fn source_error_leaves_beacon_untouched() {
        let (mut beacon, port) = controller();
        let table = SeverityTable::default();
        let mut source = Scripted(VecDeque::from([Err(SourceError::Unavailable("timeout".into()))]));

        assert_eq!(poll_once(&mut beacon, &mut source, &table).await, None);
        assert!(port.lines().is_empty());
        assert_eq!(beacon.clear_streak(), 0);
    }

    #[tokio::test]
    async fn unconfigured_severity_counts_as_clear() {
        let (mut beacon, port) = controller();
        let table = SeverityTable::default();
        let mut source = Scripted(VecDeque::from([Ok(vec![Severity::Information])]));

        assert_eq!(
            poll_once(&mut beacon, &mut source, &table).await,
            Some(BeaconOutput::Idle)
        );
        assert_eq!(port.lines(), vec!["WR 00 01 FF 01"]);
    }

    #[tokio::test]
    async fn watch_source_reports_latest_value() {
        let (tx, mut rx) = watch::channel(Vec::<Severity>::new());
        assert_eq!(rx.active_severities().await.unwrap(), Vec::<Severity>::new());

        tx.send(vec![Severity::High]).unwrap();
        assert_eq!(rx.active_severities().await.unwrap(), vec![Severity::High]);

        drop(tx);
        assert!(matches!(rx.active_severities().await, Err(SourceError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_each_interval_until_cancelled() {
        let (beacon, port) = controller();
        let cancel = CancellationToken::new();
        let (_tx, rx) = watch::channel(Vec::<Severity>::new());

        let table = SeverityTable::default();
        let stop = async {
            // Ticks at 0, 15 and 30 seconds.
            tokio::time::sleep(Duration::from_secs(40)).await;
            cancel.cancel();
        };
        tokio::join!(run(beacon, rx, &table, Duration::from_secs(15), cancel.clone()), stop);

        assert_eq!(port.lines(), vec!["WR 00 01 FF 01"; 3]);
    }
}
