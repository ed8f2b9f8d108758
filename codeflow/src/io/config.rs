//! Workflow configuration loaded from `codeflow.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "codeflow.toml";

/// Workflow configuration (TOML).
///
/// Missing fields default to the values the reference workflow uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowConfig {
    /// Maximum number of solution-generator passes per run.
    pub max_iterations: u32,

    /// Maximum bytes for a rendered prompt before droppable sections are removed.
    pub prompt_budget_bytes: usize,

    /// Directory the workflow diagram is written to.
    pub output_dir: PathBuf,

    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBackend {
    /// OpenAI-compatible `/chat/completions` endpoint with structured outputs.
    Openai,
    /// Local `codex exec` CLI with `--output-schema`.
    Codex,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GatewayConfig {
    pub backend: GatewayBackend,

    pub model: String,

    /// Base URL of the OpenAI-compatible API (without `/chat/completions`).
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Connection timeout for HTTP backends. Requests themselves are unbounded.
    pub connect_timeout_secs: u64,

    /// Truncate captured CLI output beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: GatewayBackend::Openai,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            connect_timeout_secs: 15,
            output_limit_bytes: 100_000,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            prompt_budget_bytes: 40_000,
            output_dir: PathBuf::from("output"),
            gateway: GatewayConfig::default(),
        }
    }
}

impl FlowConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be > 0"));
        }
        if self.prompt_budget_bytes == 0 {
            return Err(anyhow!("prompt_budget_bytes must be > 0"));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must not be empty"));
        }
        if self.gateway.model.trim().is_empty() {
            return Err(anyhow!("gateway.model must not be empty"));
        }
        if self.gateway.base_url.trim().is_empty() {
            return Err(anyhow!("gateway.base_url must not be empty"));
        }
        if self.gateway.api_key_env.trim().is_empty() {
            return Err(anyhow!("gateway.api_key_env must not be empty"));
        }
        if self.gateway.output_limit_bytes == 0 {
            return Err(anyhow!("gateway.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `FlowConfig::default()`.
pub fn load_config(path: &Path) -> Result<FlowConfig> {
    if !path.exists() {
        let cfg = FlowConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: FlowConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
