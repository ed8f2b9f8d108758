//! Validator node and the pluggable check it delegates to.
//!
//! The [`SolutionValidator`] trait is where a sandboxed test runner plugs in.
//! The shipped [`PlaceholderValidator`] accepts every solution.

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::state::{RunState, StateUpdate};
use crate::core::types::{Candidate, Status, TestCase, Verdict};

/// Decides whether a candidate passes the accumulated test cases.
pub trait SolutionValidator: Sync {
    fn validate(&self, solution: &Candidate, test_cases: &[TestCase]) -> Result<Verdict>;
}

/// Stand-in that reports every solution as passing without executing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderValidator;

impl SolutionValidator for PlaceholderValidator {
    fn validate(&self, _solution: &Candidate, _test_cases: &[TestCase]) -> Result<Verdict> {
        Ok(Verdict::Pass)
    }
}

/// Check the best solution and translate the verdict into a status update.
#[instrument(skip_all, fields(test_cases = state.pool.test_cases.len()))]
pub fn validate_best<V: SolutionValidator + ?Sized>(
    validator: &V,
    state: &RunState,
) -> Result<StateUpdate> {
    let best = state
        .best_solution
        .as_ref()
        .ok_or_else(|| anyhow!("validator requires a ranked best solution"))?;

    let status = match validator.validate(best, &state.pool.test_cases)? {
        Verdict::Pass => {
            info!("best solution passed validation");
            Status::Success {
                code: best.code.clone(),
                imports: best.imports.clone(),
                prefix: best.prefix.clone(),
            }
        }
        Verdict::Fail { reason } => {
            warn!(%reason, "best solution failed validation");
            Status::Failure {
                reason,
                code: best.code.clone(),
            }
        }
    };

    Ok(StateUpdate {
        status: Some(status),
        ..StateUpdate::default()
    })
}
