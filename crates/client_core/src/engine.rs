use shared::{
    domain::SlaughterNumber,
    protocol::{Action, ActionKind},
};
use tracing::{info, warn};

use crate::{
    error::EngineError,
    history::{HistoryEntry, HistoryStack, SubmittedValue},
    ActionSource, FetchOutcome, PhotoAttachment, SessionControl, SubmissionChannel,
};

#[derive(Debug, Clone, Copy)]
pub struct WizardConfig {
    /// Number of ticks between entering the done state and the automatic
    /// session reset.
    pub reset_ticks: u32,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self { reset_ticks: 5 }
    }
}

/// Where the session currently is. A unit is set iff the phase is not
/// `PreStart`, and a current action and the done state are mutually
/// exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    PreStart,
    Active { action: Action },
    Done { countdown: u32 },
}

/// Result of one reset-countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not in the done state; nothing to count down.
    Idle,
    /// Countdown decremented; this many ticks remain.
    Pending(u32),
    /// Countdown hit zero: the reset request was issued (best-effort) and
    /// the session is back at its initial state.
    Reset,
}

/// The wizard session state machine. Pulls actions from the remote queue,
/// submits operator input, keeps the undo history, and runs the
/// post-completion countdown. All suspension points are the backend calls;
/// `&mut self` keeps requests single-flight per session.
pub struct WizardEngine<B> {
    backend: B,
    config: WizardConfig,
    unit: Option<SlaughterNumber>,
    phase: Phase,
    draft: String,
    staged_photo: Option<PhotoAttachment>,
    history: HistoryStack,
    /// Set when the current action's answer was delivered but the follow-up
    /// fetch has not succeeded yet.
    awaiting_next: bool,
}

impl<B> WizardEngine<B>
where
    B: ActionSource + SubmissionChannel + SessionControl,
{
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, WizardConfig::default())
    }

    pub fn with_config(backend: B, config: WizardConfig) -> Self {
        Self {
            backend,
            config,
            unit: None,
            phase: Phase::PreStart,
            draft: String::new(),
            staged_photo: None,
            history: HistoryStack::new(),
            awaiting_next: false,
        }
    }

    pub fn unit(&self) -> Option<&SlaughterNumber> {
        self.unit.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current_action(&self) -> Option<&Action> {
        match &self.phase {
            Phase::Active { action } => Some(action),
            _ => None,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn history(&self) -> &HistoryStack {
        &self.history
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done { .. })
    }

    pub fn countdown(&self) -> Option<u32> {
        match self.phase {
            Phase::Done { countdown } => Some(countdown),
            _ => None,
        }
    }

    /// Begins a session for `unit`. Valid only from the pre-start state.
    /// If the first fetch fails the session stays unstarted and the
    /// operator may retry.
    pub async fn start(&mut self, unit: SlaughterNumber) -> Result<(), EngineError> {
        if !matches!(self.phase, Phase::PreStart) {
            let running = self
                .unit
                .clone()
                .unwrap_or_else(|| SlaughterNumber::new(""));
            return Err(EngineError::AlreadyStarted(running));
        }

        let outcome = self.backend.fetch_next(&unit).await?;
        info!(unit = %unit, "wizard session started");
        self.unit = Some(unit);
        self.apply_fetch(outcome);
        Ok(())
    }

    /// Updates the in-progress input for the current action.
    pub fn set_draft(&mut self, value: impl Into<String>) {
        self.draft = value.into();
    }

    pub fn stage_photo(&mut self, photo: PhotoAttachment) {
        self.staged_photo = Some(photo);
    }

    pub fn staged_photo(&self) -> Option<&PhotoAttachment> {
        self.staged_photo.as_ref()
    }

    /// Submits the current draft for the current action.
    pub async fn submit(&mut self) -> Result<(), EngineError> {
        let value = self.draft.clone();
        self.submit_inner(value).await
    }

    /// Submits an explicit value, bypassing the draft. Used by fixed-choice
    /// kinds such as `labels` where the chosen button carries the value.
    pub async fn submit_with_value(
        &mut self,
        value: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.submit_inner(value.into()).await
    }

    async fn submit_inner(&mut self, value: String) -> Result<(), EngineError> {
        let Phase::Active { action } = &self.phase else {
            return Err(EngineError::NoCurrentAction);
        };
        let action = action.clone();
        let unit = self.unit.clone().ok_or(EngineError::NoCurrentAction)?;

        if !self.awaiting_next {
            let submitted = if matches!(action.kind, ActionKind::Photo) {
                let photo =
                    self.staged_photo.as_ref().ok_or(EngineError::NoPhotoStaged)?;
                self.backend.submit_photo(&unit, &action.id, photo).await?;
                SubmittedValue::Photo {
                    filename: photo.filename.clone(),
                }
            } else {
                self.backend.submit_value(&unit, &action.id, &value).await?;
                SubmittedValue::Text(value)
            };

            // One history entry per successful submission, recorded before
            // the follow-up fetch.
            self.record_completed(action.clone(), submitted);

            if action.finished {
                self.enter_done();
                return Ok(());
            }
            self.awaiting_next = true;
        }

        // The answer is already delivered and recorded; a failed follow-up
        // fetch is retried here without re-posting it.
        let outcome = self.backend.fetch_next(&unit).await?;
        self.awaiting_next = false;
        self.apply_fetch(outcome);
        Ok(())
    }

    /// Pops the most recent history entry and re-presents it as the
    /// current action, with its submitted value as the new draft. No-op
    /// when the history is empty or the session is done.
    pub fn undo(&mut self) -> bool {
        if !matches!(self.phase, Phase::Active { .. }) {
            return false;
        }
        let Some(entry) = self.history.pop() else {
            return false;
        };

        self.draft = match &entry.value {
            SubmittedValue::Text(value) => value.clone(),
            SubmittedValue::Photo { .. } => String::new(),
        };
        self.staged_photo = None;
        self.awaiting_next = false;
        self.phase = Phase::Active {
            action: entry.action,
        };
        true
    }

    /// Advances the reset countdown by one tick. On reaching zero it
    /// issues one best-effort reset request and returns the session to its
    /// initial state; a failed reset request is logged, never blocking.
    pub async fn countdown_tick(&mut self) -> TickOutcome {
        let Phase::Done { countdown } = &mut self.phase else {
            return TickOutcome::Idle;
        };

        *countdown = countdown.saturating_sub(1);
        if *countdown > 0 {
            return TickOutcome::Pending(*countdown);
        }

        if let Some(unit) = self.unit.clone() {
            match self.backend.reset(&unit).await {
                Ok(()) => info!(unit = %unit, "session reset issued"),
                Err(err) => {
                    warn!(unit = %unit, error = %err, "session reset request failed")
                }
            }
        }
        self.reset_to_pre_start();
        TickOutcome::Reset
    }

    /// Discards the session without contacting the backend. Used when the
    /// operator navigates away before the countdown fires.
    pub fn reset_to_pre_start(&mut self) {
        self.unit = None;
        self.phase = Phase::PreStart;
        self.draft.clear();
        self.staged_photo = None;
        self.awaiting_next = false;
        self.history.clear();
    }

    fn record_completed(&mut self, action: Action, value: SubmittedValue) {
        self.history.push(HistoryEntry { action, value });
        self.draft.clear();
        self.staged_photo = None;
    }

    fn apply_fetch(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Step(action) => {
                match &action.kind {
                    ActionKind::Select { options } => {
                        // Never leave a select draft unset: a submission
                        // with no operator interaction sends the first
                        // option.
                        self.draft = options.first().cloned().unwrap_or_default();
                    }
                    ActionKind::Textarea => self.draft.clear(),
                    _ => {}
                }
                self.phase = Phase::Active { action };
            }
            FetchOutcome::Finished => self.enter_done(),
        }
    }

    fn enter_done(&mut self) {
        self.phase = Phase::Done {
            countdown: self.config.reset_ticks,
        };
    }
}

#[cfg(test)]
#[path = "tests/engine_tests.rs"]
mod tests;
