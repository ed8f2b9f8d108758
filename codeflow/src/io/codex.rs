//! Gateway that shells out to `codex exec` with an output schema.

use std::fs;
use std::process::Command;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::io::config::GatewayConfig;
use crate::io::gateway::{CompletionGateway, CompletionRequest, parse_completion_text};
use crate::io::process::run_command;

const STDERR_EXCERPT_BYTES: usize = 2_000;

/// Gateway that spawns `codex exec` once per completion.
pub struct CodexGateway {
    program: String,
    model: String,
    output_limit_bytes: usize,
}

impl CodexGateway {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            program: "codex".to_string(),
            model: config.model.clone(),
            output_limit_bytes: config.output_limit_bytes,
        }
    }

    /// Use a different executable (e.g. a wrapper script).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl CompletionGateway for CodexGateway {
    #[instrument(skip_all, fields(schema = request.schema.name(), program = %self.program))]
    fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let scratch = tempfile::tempdir().context("create codex scratch dir")?;
        let schema_path = scratch.path().join(format!("{}.schema.json", request.schema.name()));
        let output_path = scratch.path().join("last_message.json");
        fs::write(&schema_path, request.schema.raw())
            .with_context(|| format!("write schema {}", schema_path.display()))?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("exec")
            .arg("--model")
            .arg(&self.model)
            .arg("--sandbox")
            .arg("read-only")
            // The scratch directory is never a git repository.
            .arg("--skip-git-repo-check")
            .arg("--output-schema")
            .arg(&schema_path)
            .arg("--output-last-message")
            .arg(&output_path)
            .arg("-")
            .current_dir(scratch.path());

        info!("starting codex exec");
        let output = run_command(
            cmd,
            Some(request.prompt.as_bytes()),
            None,
            self.output_limit_bytes,
        )
        .context("run codex exec")?;

        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "codex exec failed");
            return Err(anyhow!(
                "codex exec failed with status {:?}: {}",
                output.status.code(),
                output.stderr_excerpt(STDERR_EXCERPT_BYTES)
            ));
        }
        if !output_path.exists() {
            return Err(anyhow!("codex exec wrote no output message"));
        }

        let contents = fs::read_to_string(&output_path)
            .with_context(|| format!("read codex output {}", output_path.display()))?;
        debug!(bytes = contents.len(), "codex exec completed");
        parse_completion_text(&contents)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::io::gateway::OutputSchema;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    /// Write an executable shell script standing in for `codex`.
    fn fake_codex(dir: &Path, body: &str) -> String {
        let path = dir.join("fake-codex");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path.to_string_lossy().into_owned()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            prompt: "prompt".to_string(),
            schema: OutputSchema::BestSolution,
        }
    }

    #[test]
    fn reads_last_message_written_by_cli() {
        let temp = tempfile::tempdir().expect("tempdir");
        // `--output-last-message` is the 10th argument.
        let script = fake_codex(
            temp.path(),
            r#"cat > /dev/null
out="${10}"
printf '{"prefix":"p","imports":"","code":"c"}' > "$out""#,
        );
        let gateway = CodexGateway::new(&GatewayConfig::default()).with_program(script);

        let value = gateway.complete(&request()).expect("complete");
        assert_eq!(value["code"], "c");
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = fake_codex(temp.path(), "cat > /dev/null\necho 'not logged in' >&2\nexit 3");
        let gateway = CodexGateway::new(&GatewayConfig::default()).with_program(script);

        let err = gateway.complete(&request()).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("codex exec failed"));
        assert!(msg.contains("not logged in"));
    }

    #[test]
    fn early_exit_without_reading_prompt_reports_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = fake_codex(temp.path(), "echo 'not logged in' >&2\nexit 3");
        let gateway = CodexGateway::new(&GatewayConfig::default()).with_program(script);
        let request = CompletionRequest {
            prompt: "p".repeat(1 << 20),
            schema: OutputSchema::BestSolution,
        };

        let err = gateway.complete(&request).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("codex exec failed with status Some(3)"), "{msg}");
        assert!(msg.contains("not logged in"), "{msg}");
        assert!(!msg.contains("Broken pipe"), "{msg}");
    }

    #[test]
    fn missing_output_message_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let script = fake_codex(temp.path(), "cat > /dev/null\nexit 0");
        let gateway = CodexGateway::new(&GatewayConfig::default()).with_program(script);

        let err = gateway.complete(&request()).unwrap_err();
        assert!(err.to_string().contains("no output message"));
    }
}
