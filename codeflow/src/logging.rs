//! Diagnostic tracing for workflow runs.
//!
//! Tracing goes to stderr and is controlled by `RUST_LOG`. The run's product
//! output (best solution and final state) is printed to stdout separately and
//! is unaffected by the filter.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `warn` so retry warnings are visible.
///
/// # Example
/// ```bash
/// RUST_LOG=codeflow=debug codeflow run --query "reverse a string"
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
