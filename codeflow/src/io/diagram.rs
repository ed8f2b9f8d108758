//! Writes the workflow diagram next to the run output.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};

use crate::core::graph::WorkflowGraph;
use crate::io::process::run_command;

pub const DOT_FILE: &str = "workflow.dot";
pub const PNG_FILE: &str = "workflow.png";

const RENDER_TIMEOUT: Duration = Duration::from_secs(30);
const RENDER_OUTPUT_LIMIT_BYTES: usize = 64 * 1024;
const STDERR_EXCERPT_BYTES: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramPaths {
    pub dot_path: PathBuf,
    /// Absent when Graphviz is unavailable or rendering failed.
    pub png_path: Option<PathBuf>,
}

/// Write `workflow.dot` into `dir` and try to render `workflow.png` with `dot`.
pub fn write_diagram(dir: &Path, graph: &WorkflowGraph) -> Result<DiagramPaths> {
    write_diagram_with(dir, graph, "dot")
}

/// Like [`write_diagram`], with an explicit Graphviz executable.
pub fn write_diagram_with(
    dir: &Path,
    graph: &WorkflowGraph,
    renderer: &str,
) -> Result<DiagramPaths> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let dot_path = dir.join(DOT_FILE);
    let dot = graph.to_dot();
    fs::write(&dot_path, &dot).with_context(|| format!("write {}", dot_path.display()))?;
    debug!(path = %dot_path.display(), "wrote workflow dot file");

    let png_path = dir.join(PNG_FILE);
    let png_path = match render_png(renderer, &dot, &png_path) {
        Ok(()) => {
            info!(path = %png_path.display(), "rendered workflow diagram");
            Some(png_path)
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "workflow image not rendered; dot file kept");
            None
        }
    };

    Ok(DiagramPaths { dot_path, png_path })
}

fn render_png(renderer: &str, dot: &str, png_path: &Path) -> Result<()> {
    let mut cmd = Command::new(renderer);
    cmd.arg("-Tpng").arg("-o").arg(png_path);
    let output = run_command(
        cmd,
        Some(dot.as_bytes()),
        Some(RENDER_TIMEOUT),
        RENDER_OUTPUT_LIMIT_BYTES,
    )
    .with_context(|| format!("run {renderer}"))?;
    if output.timed_out {
        bail!("{renderer} timed out after {}s", RENDER_TIMEOUT.as_secs());
    }
    if !output.status.success() {
        bail!(
            "{renderer} exited with {:?}: {}",
            output.status.code(),
            output.stderr_excerpt(STDERR_EXCERPT_BYTES)
        );
    }
    Ok(())
}
