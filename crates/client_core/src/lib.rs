use async_trait::async_trait;
use shared::{domain::SlaughterNumber, protocol::Action, protocol::LivenessResponse};

pub mod engine;
pub mod error;
pub mod history;
pub mod monitor;
pub mod reset;
pub mod transport;

pub use engine::{Phase, TickOutcome, WizardConfig, WizardEngine};
pub use error::{EngineError, SourceError};
pub use history::{HistoryEntry, HistoryStack, SubmittedValue};
pub use monitor::{ConnectionMonitor, ConnectionStatus};
pub use reset::ResetTimer;
pub use transport::MesClient;

/// Result of pulling one step from the remote queue. `Finished` is the
/// terminal marker, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Step(Action),
    Finished,
}

/// Image staged for a `photo` action before submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoAttachment {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Client of the remote action queue. Not idempotent: every successful
/// call advances the server-side cursor for the unit.
#[async_trait]
pub trait ActionSource: Send + Sync {
    async fn fetch_next(&self, unit: &SlaughterNumber) -> Result<FetchOutcome, SourceError>;
}

/// Delivery of operator answers for the current action.
#[async_trait]
pub trait SubmissionChannel: Send + Sync {
    async fn submit_value(
        &self,
        unit: &SlaughterNumber,
        action_id: &str,
        value: &str,
    ) -> Result<(), SourceError>;

    async fn submit_photo(
        &self,
        unit: &SlaughterNumber,
        action_id: &str,
        photo: &PhotoAttachment,
    ) -> Result<(), SourceError>;
}

/// Advisory session reset; the client returns to its initial state whether
/// or not the backend accepts it.
#[async_trait]
pub trait SessionControl: Send + Sync {
    async fn reset(&self, unit: &SlaughterNumber) -> Result<(), SourceError>;
}

/// Liveness check driving the online/offline indicator.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self) -> Result<LivenessResponse, SourceError>;
}
