use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::{
    engine::{TickOutcome, WizardEngine},
    ActionSource, SessionControl, SubmissionChannel,
};

/// Drives the post-completion countdown at a fixed cadence. The returned
/// future doubles as the cancellation handle: dropping it abandons the
/// countdown without issuing the reset request.
pub struct ResetTimer {
    tick: Duration,
}

impl ResetTimer {
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    pub fn new(tick: Duration) -> Self {
        Self { tick }
    }

    /// Ticks the engine countdown until the reset fires or the engine
    /// leaves the done state. `on_tick` receives the remaining tick count
    /// after each decrement, for display.
    pub async fn run<B, F>(&self, engine: &mut WizardEngine<B>, mut on_tick: F)
    where
        B: ActionSource + SubmissionChannel + SessionControl,
        F: FnMut(u32),
    {
        let mut ticks = tokio::time::interval(self.tick);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval's first tick completes immediately; skip it so the
        // countdown waits a full period before the first decrement.
        ticks.tick().await;

        loop {
            ticks.tick().await;
            match engine.countdown_tick().await {
                TickOutcome::Pending(remaining) => on_tick(remaining),
                TickOutcome::Reset | TickOutcome::Idle => break,
            }
        }
    }
}

impl Default for ResetTimer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TICK)
    }
}
