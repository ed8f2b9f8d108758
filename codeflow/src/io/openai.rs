//! Gateway backed by an OpenAI-compatible `/chat/completions` endpoint.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::io::config::GatewayConfig;
use crate::io::gateway::{CompletionGateway, CompletionRequest, parse_completion_text};

/// Maximum bytes of an error body quoted back in error messages.
const ERROR_BODY_PREVIEW_BYTES: usize = 512;

pub struct OpenAiGateway {
    client: Client,
    endpoint: String,
    model: String,
    api_key_env: String,
}

impl OpenAiGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            // No total timeout: completions may take arbitrarily long.
            .timeout(None::<Duration>)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: chat_completions_url(&config.base_url),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// The key is read per call so a missing credential only fails the calls that need it.
    fn api_key(&self) -> Result<String> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(anyhow!(
                "missing API key: set the {} environment variable",
                self.api_key_env
            )),
        }
    }
}

impl CompletionGateway for OpenAiGateway {
    #[instrument(skip_all, fields(schema = request.schema.name(), model = %self.model))]
    fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        let api_key = self.api_key()?;
        let body = request_body(&self.model, request)?;

        info!(endpoint = %self.endpoint, "sending completion request");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .with_context(|| format!("POST {}", self.endpoint))?;

        let status = response.status();
        let text = response.text().context("read completion response body")?;
        if !status.is_success() {
            warn!(status = status.as_u16(), "completion request failed");
            bail!(
                "completion request failed with status {}: {}",
                status.as_u16(),
                preview(&text)
            );
        }

        let payload: Value =
            serde_json::from_str(&text).context("parse completion response envelope")?;
        let content = extract_content(&payload)?;
        debug!(content_bytes = content.len(), "completion received");
        parse_completion_text(content)
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

/// Build the request payload with a strict `json_schema` response format.
fn request_body(model: &str, request: &CompletionRequest) -> Result<Value> {
    let mut schema = request.schema.to_value()?;
    // Structured outputs reject the meta keywords.
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    Ok(json!({
        "model": model,
        "messages": [
            {"role": "user", "content": request.prompt},
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": request.schema.name(),
                "schema": schema,
                "strict": true,
            },
        },
    }))
}

fn extract_content(payload: &Value) -> Result<&str> {
    let message = payload
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("completion response has no choices"))?;
    if let Some(refusal) = message.get("refusal").and_then(Value::as_str) {
        bail!("model refused the request: {refusal}");
    }
    message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("completion response has no message content"))
}

fn preview(text: &str) -> &str {
    if text.len() <= ERROR_BODY_PREVIEW_BYTES {
        return text;
    }
    let mut end = ERROR_BODY_PREVIEW_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gateway::OutputSchema;

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        assert_eq!(
            chat_completions_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("http://localhost:8080/v1"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_uses_strict_json_schema() {
        let request = CompletionRequest {
            prompt: "write add".to_string(),
            schema: OutputSchema::TestCases,
        };
        let body = request_body("gpt-4o-mini", &request).expect("body");

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["content"], "write add");
        let format = &body["response_format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "test_cases");
        assert_eq!(format["json_schema"]["strict"], true);
        assert!(format["json_schema"]["schema"].get("$schema").is_none());
        assert_eq!(format["json_schema"]["schema"]["type"], "object");
    }

    #[test]
    fn extract_content_reads_first_choice() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}}]
        });
        assert_eq!(extract_content(&payload).expect("content"), "{\"a\":1}");
    }

    #[test]
    fn extract_content_reports_refusal() {
        let payload = json!({
            "choices": [{"message": {"role": "assistant", "content": null, "refusal": "no"}}]
        });
        let err = extract_content(&payload).unwrap_err();
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn missing_api_key_fails_the_call() {
        let config = GatewayConfig {
            api_key_env: "CODEFLOW_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..GatewayConfig::default()
        };
        let gateway = OpenAiGateway::new(&config).expect("gateway");
        let err = gateway
            .complete(&CompletionRequest {
                prompt: "p".to_string(),
                schema: OutputSchema::Solutions,
            })
            .unwrap_err();
        assert!(err.to_string().contains("CODEFLOW_TEST_KEY_THAT_IS_NEVER_SET"));
    }

    #[test]
    fn preview_respects_char_boundaries() {
        let text = "é".repeat(ERROR_BODY_PREVIEW_BYTES);
        let cut = preview(&text);
        assert!(cut.len() <= ERROR_BODY_PREVIEW_BYTES);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
