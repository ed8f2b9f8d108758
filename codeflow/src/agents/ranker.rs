//! Ranker node: picks the best candidate from the accumulated pool.

use anyhow::{Result, anyhow, bail};
use tracing::{debug, info, instrument};

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::Candidate;
use crate::io::gateway::{CompletionGateway, CompletionRequest, OutputSchema, complete_json};
use crate::io::prompt::PromptBuilder;

use super::prompt_inputs;

#[derive(Debug, Clone)]
pub struct RankerAgent {
    prompt_budget_bytes: usize,
}

impl RankerAgent {
    pub fn new(prompt_budget_bytes: usize) -> Self {
        Self {
            prompt_budget_bytes,
        }
    }

    /// Rank every solution generated so far, not just the latest batch.
    #[instrument(skip_all, fields(pool_size = state.pool.solutions.len()))]
    pub fn run<G: CompletionGateway + ?Sized>(
        &self,
        gateway: &G,
        state: &RunState,
    ) -> Result<StateUpdate> {
        let pool = &state.pool.solutions;
        if pool.is_empty() {
            bail!("ranker requires at least one candidate solution");
        }
        let prompt = PromptBuilder::new(self.prompt_budget_bytes)
            .build_ranker(&prompt_inputs(state), pool)?
            .render();
        let picked: Candidate = complete_json(
            gateway,
            &CompletionRequest {
                prompt,
                schema: OutputSchema::BestSolution,
            },
        )?;
        let best = resolve_in_pool(&picked, pool)?;
        info!(prefix = %best.prefix, "selected best solution");

        Ok(StateUpdate {
            best_solution: Some(best.clone()),
            ..StateUpdate::default()
        })
    }
}

/// Map the model's pick back onto the pool entry it names.
///
/// Code is compared ignoring surrounding whitespace; the prefix is the fallback
/// key. The pool's copy is returned so the stored best solution is always an
/// existing candidate.
fn resolve_in_pool<'a>(picked: &Candidate, pool: &'a [Candidate]) -> Result<&'a Candidate> {
    if let Some(found) = pool.iter().find(|c| c.code.trim() == picked.code.trim()) {
        return Ok(found);
    }
    if let Some(found) = pool.iter().find(|c| c.prefix.trim() == picked.prefix.trim()) {
        debug!("ranker pick matched by prefix only");
        return Ok(found);
    }
    Err(anyhow!(
        "ranker selected a solution that is not among the {} candidates",
        pool.len()
    ))
}
