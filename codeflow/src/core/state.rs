//! Run state and the per-field reducers that merge node updates into it.
//!
//! Nodes never mutate [`RunState`] directly. Each node returns a
//! [`StateUpdate`] and the controller folds it in with [`RunState::merge`]:
//! collections concatenate, scalars overwrite, the iteration counter sums.

use serde::{Deserialize, Serialize};

use crate::core::types::{Candidate, Message, Status, TestCase};

/// Every candidate and test case produced so far in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationPool {
    pub solutions: Vec<Candidate>,
    pub test_cases: Vec<TestCase>,
}

/// The single record threaded through one end-to-end run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    /// Append-only conversation log, seeded with the user query.
    pub messages: Vec<Message>,
    /// Set once at run start.
    pub query: String,
    /// Outcome of the most recent validation pass only.
    pub status: Option<Status>,
    pub pool: GenerationPool,
    /// Overwritten on every ranking pass.
    pub best_solution: Option<Candidate>,
    /// Number of solution-generator passes.
    pub iterations: u32,
    /// Notes reserved for feeding validation failures back into generation.
    pub reflections: Vec<String>,
}

impl RunState {
    pub fn new(query: impl Into<String>) -> Self {
        let query = query.into();
        Self {
            messages: vec![Message::user(query.clone())],
            query,
            status: None,
            pool: GenerationPool::default(),
            best_solution: None,
            iterations: 0,
            reflections: Vec::new(),
        }
    }

    /// Fold a node's partial update into the state.
    pub fn merge(&mut self, update: StateUpdate) {
        self.messages.extend(update.messages);
        if let Some(status) = update.status {
            self.status = Some(status);
        }
        self.pool.solutions.extend(update.solutions);
        self.pool.test_cases.extend(update.test_cases);
        if let Some(best) = update.best_solution {
            self.best_solution = Some(best);
        }
        self.iterations += update.iterations;
        self.reflections.extend(update.reflections);
    }

    pub fn has_failure(&self) -> bool {
        self.status.as_ref().is_some_and(Status::is_failure)
    }
}

/// Partial update produced by a single node invocation.
///
/// Empty collections and `None` fields leave the state untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub status: Option<Status>,
    pub solutions: Vec<Candidate>,
    pub test_cases: Vec<TestCase>,
    pub best_solution: Option<Candidate>,
    pub iterations: u32,
    pub reflections: Vec<String>,
}
