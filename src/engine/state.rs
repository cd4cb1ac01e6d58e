// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use crate::observability::messages::engine::StateTransition;
use crate::observability::messages::StructuredLog;

/// Lifecycle of one task inside the engine.
///
/// ```text
/// Idle -> BundleFetchPending -> Executing -> ResultPending -> Completed
///                  |               |  ^           |
///                  |               |  +-----------+ (next item)
///                  +---------------+--------------+---> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    BundleFetchPending,
    Executing,
    ResultPending,
    Completed,
    Failed,
}

impl EngineState {
    pub fn can_transition_to(self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Idle, BundleFetchPending)
                | (BundleFetchPending, Executing)
                | (BundleFetchPending, Failed)
                | (Executing, ResultPending)
                // No items in each-item mode: nothing runs.
                | (Executing, Completed)
                | (Executing, Failed)
                | (ResultPending, Executing)
                | (ResultPending, Completed)
                | (ResultPending, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Completed | EngineState::Failed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Idle => "idle",
            EngineState::BundleFetchPending => "bundle-fetch-pending",
            EngineState::Executing => "executing",
            EngineState::ResultPending => "result-pending",
            EngineState::Completed => "completed",
            EngineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// State tracker for one task run.
#[derive(Debug)]
pub struct TaskRun {
    task_id: String,
    state: EngineState,
}

impl TaskRun {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            state: EngineState::Idle,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Move to `next`. An illegal transition is a bug in the engine.
    pub fn transition(&mut self, next: EngineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal engine transition {} -> {}",
            self.state,
            next
        );
        StateTransition {
            task_id: &self.task_id,
            from: self.state,
            to: next,
        }
        .log();
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EngineState::*;

    #[test]
    fn test_happy_paths_are_legal() {
        let all_items = [Idle, BundleFetchPending, Executing, ResultPending, Completed];
        for pair in all_items.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(ResultPending.can_transition_to(Executing));
        assert!(Executing.can_transition_to(Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [Idle, BundleFetchPending, Executing, ResultPending, Completed, Failed] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Completed.is_terminal() && Failed.is_terminal());
    }

    #[test]
    fn test_execution_requires_a_bundle() {
        assert!(!Idle.can_transition_to(Executing));
        assert!(!Idle.can_transition_to(Failed));
    }

    #[test]
    fn test_task_run_tracks_state() {
        let mut run = TaskRun::new("t-1");
        run.transition(BundleFetchPending);
        run.transition(Failed);
        assert_eq!(run.state(), Failed);
    }

    #[test]
    #[should_panic(expected = "illegal engine transition")]
    #[cfg(debug_assertions)]
    fn test_illegal_transition_panics_in_debug() {
        let mut run = TaskRun::new("t-1");
        run.transition(Completed);
    }
}
