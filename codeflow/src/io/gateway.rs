//! Completion gateway abstraction.
//!
//! The [`CompletionGateway`] trait decouples the workflow from the model
//! provider. Every request carries the JSON Schema its answer must satisfy;
//! [`complete_json`] enforces it before handing a typed value back. Tests use
//! scripted gateways that return canned values without touching the network.

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

const SOLUTIONS_SCHEMA: &str = include_str!("../../schemas/solutions.schema.json");
const TEST_CASES_SCHEMA: &str = include_str!("../../schemas/test_cases.schema.json");
const BEST_SOLUTION_SCHEMA: &str = include_str!("../../schemas/best_solution.schema.json");

/// Named JSON Schema constraining a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputSchema {
    Solutions,
    TestCases,
    BestSolution,
}

impl OutputSchema {
    pub fn name(self) -> &'static str {
        match self {
            Self::Solutions => "solutions",
            Self::TestCases => "test_cases",
            Self::BestSolution => "best_solution",
        }
    }

    pub fn raw(self) -> &'static str {
        match self {
            Self::Solutions => SOLUTIONS_SCHEMA,
            Self::TestCases => TEST_CASES_SCHEMA,
            Self::BestSolution => BEST_SOLUTION_SCHEMA,
        }
    }

    pub fn to_value(self) -> Result<Value> {
        serde_json::from_str(self.raw()).with_context(|| format!("parse {} schema", self.name()))
    }
}

/// Parameters for a gateway invocation.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub schema: OutputSchema,
}

/// Abstraction over completion backends.
///
/// Implementations must be shareable across the threads the workflow fans out to.
pub trait CompletionGateway: Sync {
    /// Return the model's structured answer to `request`.
    fn complete(&self, request: &CompletionRequest) -> Result<Value>;
}

/// Run the gateway and load its answer as `T` after schema validation.
#[instrument(skip_all, fields(schema = request.schema.name(), prompt_bytes = request.prompt.len()))]
pub fn complete_json<G: CompletionGateway + ?Sized, T: DeserializeOwned>(
    gateway: &G,
    request: &CompletionRequest,
) -> Result<T> {
    let value = gateway
        .complete(request)
        .with_context(|| format!("{} completion", request.schema.name()))?;
    let schema = request.schema.to_value()?;
    validate_schema(&value, &schema)
        .with_context(|| format!("{} completion does not match schema", request.schema.name()))?;
    let parsed = serde_json::from_value(value)
        .with_context(|| format!("parse {} completion", request.schema.name()))?;
    debug!("completion parsed");
    Ok(parsed)
}

/// Validate a JSON instance against a JSON Schema (Draft 2020-12).
pub fn validate_schema(instance: &Value, schema: &Value) -> Result<()> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .map_err(|err| anyhow!("compile json schema: {err}"))?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("schema validation failed:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

/// Parse the text a model returned as a JSON document.
///
/// Some backends wrap the document in a fenced code block; the fence is stripped.
pub fn parse_completion_text(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).context("completion is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{SolutionsOutput, TestCasesOutput};
    use serde_json::json;

    struct FixedGateway {
        value: Value,
    }

    impl CompletionGateway for FixedGateway {
        fn complete(&self, _request: &CompletionRequest) -> Result<Value> {
            Ok(self.value.clone())
        }
    }

    fn request(schema: OutputSchema) -> CompletionRequest {
        CompletionRequest {
            prompt: "prompt".to_string(),
            schema,
        }
    }

    #[test]
    fn bundled_schemas_compile() {
        for schema in [
            OutputSchema::Solutions,
            OutputSchema::TestCases,
            OutputSchema::BestSolution,
        ] {
            let value = schema.to_value().expect("schema json");
            jsonschema::options()
                .with_draft(Draft::Draft202012)
                .build(&value)
                .expect("schema compiles");
        }
    }

    #[test]
    fn complete_json_accepts_conforming_output() {
        let gateway = FixedGateway {
            value: json!({
                "solutions": [
                    {"prefix": "iterative", "imports": "", "code": "def add(a, b): return a + b"}
                ]
            }),
        };
        let out: SolutionsOutput =
            complete_json(&gateway, &request(OutputSchema::Solutions)).expect("complete");
        assert_eq!(out.solutions.len(), 1);
        assert_eq!(out.solutions[0].prefix, "iterative");
    }

    #[test]
    fn complete_json_rejects_missing_fields() {
        let gateway = FixedGateway {
            value: json!({"test_cases": [{"prefix": "no code"}]}),
        };
        let err = complete_json::<_, TestCasesOutput>(&gateway, &request(OutputSchema::TestCases))
            .unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }

    #[test]
    fn complete_json_rejects_extra_properties() {
        let gateway = FixedGateway {
            value: json!({"prefix": "p", "imports": "", "code": "c", "score": 9}),
        };
        let err = complete_json::<_, crate::core::types::Candidate>(
            &gateway,
            &request(OutputSchema::BestSolution),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("does not match schema"));
    }

    #[test]
    fn parse_completion_text_strips_code_fence() {
        let value = parse_completion_text("```json\n{\"a\": 1}\n```").expect("parse");
        assert_eq!(value, json!({"a": 1}));
        let value = parse_completion_text("  {\"b\": 2} ").expect("parse");
        assert_eq!(value, json!({"b": 2}));
        assert!(parse_completion_text("not json").is_err());
    }
}
