//! Test-case generator node.

use anyhow::Result;
use tracing::{info, instrument};

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{Message, TestCasesOutput};
use crate::io::gateway::{CompletionGateway, CompletionRequest, OutputSchema, complete_json};
use crate::io::prompt::PromptBuilder;

use super::{log_entry, prompt_inputs};

/// Asks the gateway for test cases; independent of the generated solutions.
#[derive(Debug, Clone)]
pub struct TestCaseAgent {
    prompt_budget_bytes: usize,
}

impl TestCaseAgent {
    pub fn new(prompt_budget_bytes: usize) -> Self {
        Self {
            prompt_budget_bytes,
        }
    }

    #[instrument(skip_all)]
    pub fn run<G: CompletionGateway + ?Sized>(
        &self,
        gateway: &G,
        state: &RunState,
    ) -> Result<StateUpdate> {
        let prompt = PromptBuilder::new(self.prompt_budget_bytes)
            .build_test_cases(&prompt_inputs(state))?
            .render();
        let output: TestCasesOutput = complete_json(
            gateway,
            &CompletionRequest {
                prompt,
                schema: OutputSchema::TestCases,
            },
        )?;
        info!(count = output.test_cases.len(), "generated test cases");

        Ok(StateUpdate {
            messages: vec![Message::assistant(log_entry(&output)?)],
            test_cases: output.test_cases,
            ..StateUpdate::default()
        })
    }
}
