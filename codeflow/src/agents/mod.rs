//! Workflow nodes: each turns the current run state into a partial update.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::state::RunState;
use crate::io::prompt::PromptInputs;

pub mod ranker;
pub mod solutions;
pub mod test_cases;
pub mod validator;

pub(crate) fn prompt_inputs(state: &RunState) -> PromptInputs {
    PromptInputs {
        query: state.query.clone(),
        reflections: state.reflections.clone(),
    }
}

/// Raw structured result recorded in the conversation log.
pub(crate) fn log_entry<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("serialize log entry")
}
