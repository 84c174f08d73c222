use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SlaughterNumber;

/// Interaction mode of a wizard step. Determines the input widget on the
/// client and the shape of the submission. `options` only exists for
/// `select`; on the wire the discriminant is the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ActionKind {
    Confirm,
    Input,
    Select { options: Vec<String> },
    Textarea,
    Photo,
    Labels,
}

/// One step of operator work as dictated by the action queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub description: String,
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Set on the last deliverable action of a unit.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedMarker {
    pub finished: bool,
}

impl FinishedMarker {
    pub fn new() -> Self {
        Self { finished: true }
    }
}

impl Default for FinishedMarker {
    fn default() -> Self {
        Self::new()
    }
}

/// Wire shape of `GET /next-action`. Either a single action object,
/// optionally carrying `finished: true` on the last deliverable step, or a
/// bare `[{"finished": true}]` once the cursor is exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextActionResponse {
    Exhausted(Vec<FinishedMarker>),
    Step(Action),
}

impl NextActionResponse {
    pub fn exhausted() -> Self {
        Self::Exhausted(vec![FinishedMarker::new()])
    }
}

/// Body of `POST /submit` for every kind except `photo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub slaughter_number: SlaughterNumber,
    /// Id of the action being answered.
    pub action: String,
    pub value: String,
}

/// Response of `GET /station`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationInfo {
    pub name: String,
    pub printer: String,
}

/// Response of `GET /animal-info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub species: String,
    pub date: NaiveDate,
}

pub const LIVENESS_OK: &str = "ok";

/// Response of the `GET /session` liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl LivenessResponse {
    pub fn ok_now() -> Self {
        Self {
            status: LIVENESS_OK.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == LIVENESS_OK
    }
}

/// Response of `POST /reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
}
