//! Workflow states and the routing rules between them.
//!
//! ```text
//! Generating -> TestingAndRanking -> Validating -> Done
//!     ^                                  |
//!     +---------- (failure, budget left) +
//! ```

use std::fmt;

use crate::core::state::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowState {
    /// Solution generator is producing candidates.
    Generating,
    /// Test-case generator and ranker run side by side.
    TestingAndRanking,
    /// Best solution is checked against the accumulated test cases.
    Validating,
    /// Terminal.
    Done,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generating => write!(f, "Generating"),
            Self::TestingAndRanking => write!(f, "TestingAndRanking"),
            Self::Validating => write!(f, "Validating"),
            Self::Done => write!(f, "Done"),
        }
    }
}

/// A single recorded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRecord {
    pub from: WorkflowState,
    pub to: WorkflowState,
    /// Solution-generator passes completed when the transition happened.
    pub iteration: u32,
}

impl TransitionRecord {
    /// Whether this transition sends the run back for another generation pass.
    pub fn is_retry(&self) -> bool {
        self.from == WorkflowState::Validating && self.to == WorkflowState::Generating
    }
}

/// Pick the state that follows `current` given the merged run state.
///
/// Only `Validating` branches: a run with no failure status, or one that has
/// used up `max_iterations` generator passes, finishes.
pub fn next_state(current: WorkflowState, state: &RunState, max_iterations: u32) -> WorkflowState {
    match current {
        WorkflowState::Generating => WorkflowState::TestingAndRanking,
        WorkflowState::TestingAndRanking => WorkflowState::Validating,
        WorkflowState::Validating => {
            if !state.has_failure() || state.iterations >= max_iterations {
                WorkflowState::Done
            } else {
                WorkflowState::Generating
            }
        }
        WorkflowState::Done => WorkflowState::Done,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Status;

    fn state_with(status: Option<Status>, iterations: u32) -> RunState {
        let mut state = RunState::new("q");
        state.status = status;
        state.iterations = iterations;
        state
    }

    fn failure() -> Option<Status> {
        Some(Status::Failure {
            reason: "tests failed".to_string(),
            code: "code".to_string(),
        })
    }

    #[test]
    fn linear_edges_are_unconditional() {
        let state = state_with(failure(), 1);
        assert_eq!(
            next_state(WorkflowState::Generating, &state, 3),
            WorkflowState::TestingAndRanking
        );
        assert_eq!(
            next_state(WorkflowState::TestingAndRanking, &state, 3),
            WorkflowState::Validating
        );
        assert_eq!(next_state(WorkflowState::Done, &state, 3), WorkflowState::Done);
    }

    #[test]
    fn failure_with_budget_left_retries() {
        for iterations in 0..3 {
            let state = state_with(failure(), iterations);
            assert_eq!(
                next_state(WorkflowState::Validating, &state, 3),
                WorkflowState::Generating,
                "iterations={iterations}"
            );
        }
    }

    #[test]
    fn failure_at_ceiling_finishes() {
        let state = state_with(failure(), 3);
        assert_eq!(
            next_state(WorkflowState::Validating, &state, 3),
            WorkflowState::Done
        );
    }

    #[test]
    fn no_failure_always_finishes() {
        let success = Some(Status::Success {
            code: "c".to_string(),
            imports: String::new(),
            prefix: "p".to_string(),
        });
        for iterations in 0..5 {
            for status in [None, success.clone()] {
                let state = state_with(status, iterations);
                assert_eq!(
                    next_state(WorkflowState::Validating, &state, 3),
                    WorkflowState::Done
                );
            }
        }
    }

    #[test]
    fn only_validating_to_generating_is_a_retry() {
        let retry = TransitionRecord {
            from: WorkflowState::Validating,
            to: WorkflowState::Generating,
            iteration: 1,
        };
        let forward = TransitionRecord {
            from: WorkflowState::Generating,
            to: WorkflowState::TestingAndRanking,
            iteration: 1,
        };
        assert!(retry.is_retry());
        assert!(!forward.is_retry());
        assert!(WorkflowState::Done.is_terminal());
        assert!(!WorkflowState::Validating.is_terminal());
    }
}
