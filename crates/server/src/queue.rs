use std::collections::HashMap;

use shared::protocol::{Action, ActionKind, NextActionResponse};
use tokio::sync::Mutex;

/// The remotely dictated step script, with one cursor per slaughter
/// number. Keying cursors by unit keeps concurrent units from advancing
/// each other's progress.
pub struct ActionQueue {
    script: Vec<Action>,
    cursors: Mutex<HashMap<String, usize>>,
}

impl ActionQueue {
    pub fn new(script: Vec<Action>) -> Self {
        Self {
            script,
            cursors: Mutex::new(HashMap::new()),
        }
    }

    /// The recovery-station flow served when no script is configured.
    pub fn default_script() -> Vec<Action> {
        let step = |id: &str, description: &str, kind: ActionKind| Action {
            id: id.to_string(),
            description: description.to_string(),
            kind,
            finished: false,
        };
        vec![
            step("confirm-shoulder", "Is the animal divided?", ActionKind::Confirm),
            step(
                "remove-injury",
                "Remove shoulder injury from carcass",
                ActionKind::Confirm,
            ),
            step(
                "input-weight",
                "Enter weight of removed part (kg)",
                ActionKind::Input,
            ),
            step(
                "upload-photo",
                "Upload picture of removed part",
                ActionKind::Photo,
            ),
            step("print-labels", "Print new label", ActionKind::Labels),
        ]
    }

    /// Serves the next action for `unit` and advances its cursor. The last
    /// deliverable action carries the finished flag; an exhausted cursor
    /// yields the bare terminal marker.
    pub async fn next_for(&self, unit: &str) -> NextActionResponse {
        let mut cursors = self.cursors.lock().await;
        let cursor = cursors.entry(unit.to_string()).or_insert(0);
        if *cursor >= self.script.len() {
            return NextActionResponse::exhausted();
        }

        let mut action = self.script[*cursor].clone();
        *cursor += 1;
        if *cursor >= self.script.len() {
            action.finished = true;
        }
        NextActionResponse::Step(action)
    }

    /// Rewinds the cursor for `unit` to the beginning of the script.
    pub async fn reset(&self, unit: &str) {
        self.cursors.lock().await.remove(unit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_step_queue() -> ActionQueue {
        ActionQueue::new(vec![
            Action {
                id: "first".into(),
                description: "first step".into(),
                kind: ActionKind::Confirm,
                finished: false,
            },
            Action {
                id: "second".into(),
                description: "second step".into(),
                kind: ActionKind::Input,
                finished: false,
            },
        ])
    }

    fn step_id(response: NextActionResponse) -> String {
        match response {
            NextActionResponse::Step(action) => action.id,
            NextActionResponse::Exhausted(_) => panic!("expected a step"),
        }
    }

    #[tokio::test]
    async fn marks_last_deliverable_step_as_finished() {
        let queue = two_step_queue();

        let NextActionResponse::Step(first) = queue.next_for("12345").await else {
            panic!("expected a step");
        };
        assert_eq!(first.id, "first");
        assert!(!first.finished);

        let NextActionResponse::Step(second) = queue.next_for("12345").await else {
            panic!("expected a step");
        };
        assert_eq!(second.id, "second");
        assert!(second.finished);
    }

    #[tokio::test]
    async fn exhausted_cursor_yields_bare_terminal_marker() {
        let queue = two_step_queue();
        queue.next_for("12345").await;
        queue.next_for("12345").await;

        assert_eq!(
            queue.next_for("12345").await,
            NextActionResponse::exhausted()
        );
    }

    #[tokio::test]
    async fn cursors_are_isolated_per_unit() {
        let queue = two_step_queue();

        assert_eq!(step_id(queue.next_for("11111").await), "first");
        // A second unit starting in between must not observe the first
        // unit's cursor advancement.
        assert_eq!(step_id(queue.next_for("22222").await), "first");
        assert_eq!(step_id(queue.next_for("11111").await), "second");
        assert_eq!(step_id(queue.next_for("22222").await), "second");
    }

    #[tokio::test]
    async fn reset_rewinds_only_the_given_unit() {
        let queue = two_step_queue();
        queue.next_for("11111").await;
        queue.next_for("22222").await;

        queue.reset("11111").await;
        assert_eq!(step_id(queue.next_for("11111").await), "first");
        assert_eq!(step_id(queue.next_for("22222").await), "second");
    }
}
