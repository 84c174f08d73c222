use std::time::Duration;

use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tracing::debug;

use crate::LivenessProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No probe has completed yet.
    Unknown,
    Online,
    Offline,
}

/// Fixed-cadence liveness watchdog. Runs independently of the wizard
/// engine and only publishes a status flag; a single failed probe flips to
/// offline and a single successful one flips back, with no debounce and no
/// backoff. The probe task is aborted when the monitor is dropped.
pub struct ConnectionMonitor {
    status: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<()>,
}

impl ConnectionMonitor {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

    pub fn spawn<P>(probe: P, interval: Duration) -> Self
    where
        P: LivenessProbe + 'static,
    {
        let (tx, status) = watch::channel(ConnectionStatus::Unknown);
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let next = match probe.probe().await {
                    Ok(response) if response.is_ok() => ConnectionStatus::Online,
                    Ok(response) => {
                        debug!(status = %response.status, "unexpected liveness payload");
                        ConnectionStatus::Offline
                    }
                    Err(err) => {
                        debug!(error = %err, "liveness probe failed");
                        ConnectionStatus::Offline
                    }
                };
                if tx.send(next).is_err() {
                    break;
                }
            }
        });

        Self { status, task }
    }

    /// Latest observed status.
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Receiver for callers that want to await status changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use shared::protocol::LivenessResponse;
    use tokio::sync::Mutex;

    use super::*;
    use crate::error::SourceError;

    struct SequenceProbe {
        responses: Mutex<VecDeque<Result<LivenessResponse, SourceError>>>,
    }

    impl SequenceProbe {
        fn new(responses: Vec<Result<LivenessResponse, SourceError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LivenessProbe for SequenceProbe {
        async fn probe(&self) -> Result<LivenessResponse, SourceError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Ok(LivenessResponse::ok_now()))
        }
    }

    #[tokio::test]
    async fn one_failed_probe_flips_offline_and_next_success_flips_back() {
        let probe = SequenceProbe::new(vec![
            Err(SourceError::Transport("connection refused".into())),
            Ok(LivenessResponse::ok_now()),
        ]);
        let monitor = ConnectionMonitor::spawn(probe, Duration::from_millis(10));
        let mut status = monitor.subscribe();

        status.changed().await.expect("first probe");
        assert_eq!(*status.borrow(), ConnectionStatus::Offline);

        status.changed().await.expect("second probe");
        assert_eq!(*status.borrow(), ConnectionStatus::Online);
        assert_eq!(monitor.status(), ConnectionStatus::Online);
    }

    #[tokio::test]
    async fn unexpected_payload_counts_as_offline() {
        let degraded = LivenessResponse {
            status: "degraded".into(),
            timestamp: chrono::Utc::now(),
        };
        let monitor = ConnectionMonitor::spawn(
            SequenceProbe::new(vec![Ok(degraded)]),
            Duration::from_millis(10),
        );
        let mut status = monitor.subscribe();

        status.changed().await.expect("first probe");
        assert_eq!(*status.borrow(), ConnectionStatus::Offline);
    }
}
