//! Workflow controller: drives the generate / (test ∥ rank) / validate loop.
//!
//! The controller is an explicit state machine over [`WorkflowState`]. Each
//! node returns a [`StateUpdate`] that is merged into the [`RunState`] only
//! after the node (or both fan-out branches) completed successfully.

use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, instrument, warn};

use crate::agents::ranker::RankerAgent;
use crate::agents::solutions::SolutionAgent;
use crate::agents::test_cases::TestCaseAgent;
use crate::agents::validator::{SolutionValidator, validate_best};
use crate::core::router::{TransitionRecord, WorkflowState, next_state};
use crate::core::state::{RunState, StateUpdate};
use crate::io::config::FlowConfig;
use crate::io::gateway::CompletionGateway;

/// Tunables for a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Retry ceiling: maximum solution-generator passes.
    pub max_iterations: u32,
    pub prompt_budget_bytes: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            prompt_budget_bytes: 40_000,
        }
    }
}

impl WorkflowSettings {
    pub fn from_config(config: &FlowConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            prompt_budget_bytes: config.prompt_budget_bytes,
        }
    }
}

/// Why a run reached `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStop {
    /// The last validation pass did not report a failure.
    Succeeded,
    /// The ceiling was reached with the last validation still failing.
    RetriesExhausted { iterations: u32 },
}

pub struct Workflow<'a, G: ?Sized, V: ?Sized> {
    gateway: &'a G,
    validator: &'a V,
    settings: WorkflowSettings,
    solutions: SolutionAgent,
    test_cases: TestCaseAgent,
    ranker: RankerAgent,
}

impl<'a, G, V> Workflow<'a, G, V>
where
    G: CompletionGateway + ?Sized,
    V: SolutionValidator + ?Sized,
{
    pub fn new(gateway: &'a G, validator: &'a V, settings: WorkflowSettings) -> Self {
        let budget = settings.prompt_budget_bytes;
        Self {
            gateway,
            validator,
            settings,
            solutions: SolutionAgent::new(budget),
            test_cases: TestCaseAgent::new(budget),
            ranker: RankerAgent::new(budget),
        }
    }

    /// Run the workflow to `Done`, merging every node's update into `state`.
    ///
    /// `on_transition` observes each state change, including retries. Any node
    /// error aborts the run; updates from the failing step are not merged, so
    /// `state` reflects the last fully completed step.
    #[instrument(skip_all, fields(max_iterations = self.settings.max_iterations))]
    pub fn run<F: FnMut(&TransitionRecord)>(
        &self,
        state: &mut RunState,
        mut on_transition: F,
    ) -> Result<RunStop> {
        if self.settings.max_iterations == 0 {
            bail!("max_iterations must be > 0");
        }
        if state.iterations >= self.settings.max_iterations {
            bail!(
                "run already used {} of {} iterations",
                state.iterations,
                self.settings.max_iterations
            );
        }

        let mut current = WorkflowState::Generating;
        info!(query = %state.query, "starting workflow");
        while !current.is_terminal() {
            match current {
                WorkflowState::Generating => {
                    let update = self
                        .solutions
                        .run(self.gateway, state)
                        .context("generate solutions")?;
                    state.merge(update);
                }
                WorkflowState::TestingAndRanking => {
                    let (tests, ranked) = self.fan_out(state)?;
                    state.merge(tests);
                    state.merge(ranked);
                }
                WorkflowState::Validating => {
                    let update =
                        validate_best(self.validator, state).context("validate best solution")?;
                    state.merge(update);
                }
                WorkflowState::Done => {}
            }

            let next = next_state(current, state, self.settings.max_iterations);
            let record = TransitionRecord {
                from: current,
                to: next,
                iteration: state.iterations,
            };
            if record.is_retry() {
                warn!(
                    iteration = state.iterations,
                    max_iterations = self.settings.max_iterations,
                    "validation failed, retrying solution generation"
                );
            }
            on_transition(&record);
            current = next;
        }

        let stop = if state.has_failure() {
            RunStop::RetriesExhausted {
                iterations: state.iterations,
            }
        } else {
            RunStop::Succeeded
        };
        info!(iterations = state.iterations, ?stop, "workflow finished");
        Ok(stop)
    }

    /// Run the test-case generator and the ranker side by side and wait for both.
    ///
    /// The test-case branch's error wins when both fail.
    fn fan_out(&self, state: &RunState) -> Result<(StateUpdate, StateUpdate)> {
        let (tests, ranked) = thread::scope(|scope| {
            let tests = scope.spawn(|| self.test_cases.run(self.gateway, state));
            let ranked = scope.spawn(|| self.ranker.run(self.gateway, state));
            (tests.join(), ranked.join())
        });
        let tests = tests
            .map_err(|_| anyhow!("test-case generator thread panicked"))?
            .context("generate test cases")?;
        let ranked = ranked
            .map_err(|_| anyhow!("ranker thread panicked"))?
            .context("rank solutions")?;
        Ok((tests, ranked))
    }
}
