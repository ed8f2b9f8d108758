//! Iterative code-generation workflow driven by a language model.
//!
//! A query flows through a fixed graph: generate candidate solutions, then
//! generate test cases and rank the accumulated candidates side by side, then
//! validate the best one. Failed validation loops back to generation until the
//! iteration ceiling is reached.
//!
//! - **[`core`]**: Pure logic (state, reducers, routing, graph shape). No I/O.
//! - **[`io`]**: Model gateways, child processes, prompts, config and files.
//! - **[`agents`]**: One node per workflow step, each producing a state update.
//!
//! [`workflow`] wires the nodes into the state machine the CLI runs.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
