//! Solution generator node.

use anyhow::{Result, bail};
use tracing::{info, instrument};

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{Message, SolutionsOutput};
use crate::io::gateway::{CompletionGateway, CompletionRequest, OutputSchema, complete_json};
use crate::io::prompt::PromptBuilder;

use super::{log_entry, prompt_inputs};

/// Asks the gateway for two distinct candidate solutions to the query.
#[derive(Debug, Clone)]
pub struct SolutionAgent {
    prompt_budget_bytes: usize,
}

impl SolutionAgent {
    pub fn new(prompt_budget_bytes: usize) -> Self {
        Self {
            prompt_budget_bytes,
        }
    }

    #[instrument(skip_all, fields(iteration = state.iterations + 1))]
    pub fn run<G: CompletionGateway + ?Sized>(
        &self,
        gateway: &G,
        state: &RunState,
    ) -> Result<StateUpdate> {
        if state.query.trim().is_empty() {
            bail!("query must not be empty");
        }
        let prompt = PromptBuilder::new(self.prompt_budget_bytes)
            .build_solutions(&prompt_inputs(state))?
            .render();
        let output: SolutionsOutput = complete_json(
            gateway,
            &CompletionRequest {
                prompt,
                schema: OutputSchema::Solutions,
            },
        )?;
        info!(count = output.solutions.len(), "generated candidate solutions");

        Ok(StateUpdate {
            messages: vec![Message::assistant(log_entry(&output)?)],
            iterations: 1,
            solutions: output.solutions,
            ..StateUpdate::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Role;
    use crate::test_support::{ScriptedGateway, candidate, solutions_value};

    #[test]
    fn appends_candidates_and_counts_one_iteration() {
        let gateway = ScriptedGateway::new();
        gateway.push(
            OutputSchema::Solutions,
            solutions_value(&[candidate("a + b"), candidate("sum([a, b])")]),
        );

        let update = SolutionAgent::new(10_000)
            .run(&gateway, &RunState::new("add two numbers"))
            .expect("run");

        assert_eq!(update.iterations, 1);
        assert_eq!(update.solutions, vec![candidate("a + b"), candidate("sum([a, b])")]);
        assert_eq!(update.messages.len(), 1);
        assert_eq!(update.messages[0].role, Role::Assistant);
        assert!(update.messages[0].content.contains("sum([a, b])"));
        assert!(update.test_cases.is_empty());
        assert!(update.best_solution.is_none());

        let prompts = gateway.prompts(OutputSchema::Solutions);
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("add two numbers"));
    }

    #[test]
    fn non_conforming_output_is_fatal() {
        let gateway = ScriptedGateway::new();
        gateway.push(OutputSchema::Solutions, serde_json::json!({"solutions": "nope"}));

        let err = SolutionAgent::new(10_000)
            .run(&gateway, &RunState::new("q"))
            .unwrap_err();
        assert!(format!("{err:#}").contains("does not match schema"));
    }

    #[test]
    fn empty_query_is_rejected_before_calling_gateway() {
        let gateway = ScriptedGateway::new();
        let err = SolutionAgent::new(10_000)
            .run(&gateway, &RunState::new("   "))
            .unwrap_err();
        assert!(err.to_string().contains("query must not be empty"));
        assert!(gateway.prompts(OutputSchema::Solutions).is_empty());
    }
}
