//! Test-only helpers: scripted gateway and validator doubles plus fixtures.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use crate::agents::validator::SolutionValidator;
use crate::core::types::{Candidate, TestCase, Verdict};
use crate::io::gateway::{CompletionGateway, CompletionRequest, OutputSchema};

/// Deterministic candidate whose prefix is derived from its code.
pub fn candidate(code: &str) -> Candidate {
    Candidate {
        prefix: format!("{code} prefix"),
        imports: String::new(),
        code: code.to_string(),
    }
}

pub fn test_case(test_code: &str) -> TestCase {
    TestCase {
        prefix: format!("{test_code} prefix"),
        test_code: test_code.to_string(),
    }
}

pub fn candidate_value(candidate: &Candidate) -> Value {
    json!({
        "prefix": candidate.prefix,
        "imports": candidate.imports,
        "code": candidate.code,
    })
}

pub fn solutions_value(candidates: &[Candidate]) -> Value {
    json!({ "solutions": candidates.iter().map(candidate_value).collect::<Vec<_>>() })
}

pub fn test_cases_value(test_cases: &[TestCase]) -> Value {
    json!({
        "test_cases": test_cases
            .iter()
            .map(|t| json!({"prefix": t.prefix, "test_code": t.test_code}))
            .collect::<Vec<_>>()
    })
}

type Scripted = std::result::Result<Value, String>;

/// Gateway that replays queued responses per output schema and records prompts.
///
/// An exhausted queue is an error, so unexpected extra calls fail loudly.
#[derive(Default)]
pub struct ScriptedGateway {
    responses: Mutex<HashMap<OutputSchema, VecDeque<Scripted>>>,
    prompts: Mutex<HashMap<OutputSchema, Vec<String>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, schema: OutputSchema, value: Value) {
        self.enqueue(schema, Ok(value));
    }

    pub fn push_error(&self, schema: OutputSchema, message: &str) {
        self.enqueue(schema, Err(message.to_string()));
    }

    /// Prompts received for `schema`, in call order.
    pub fn prompts(&self, schema: OutputSchema) -> Vec<String> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .get(&schema)
            .cloned()
            .unwrap_or_default()
    }

    fn enqueue(&self, schema: OutputSchema, response: Scripted) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(schema)
            .or_default()
            .push_back(response);
    }
}

impl CompletionGateway for ScriptedGateway {
    fn complete(&self, request: &CompletionRequest) -> Result<Value> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .entry(request.schema)
            .or_default()
            .push(request.prompt.clone());
        let next = self
            .responses
            .lock()
            .expect("responses lock")
            .get_mut(&request.schema)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!(
                "no scripted response for {}",
                request.schema.name()
            )),
        }
    }
}

/// Validator returning a fixed verdict and counting invocations.
pub struct ScriptedValidator {
    verdict: Verdict,
    calls: AtomicUsize,
}

impl ScriptedValidator {
    pub fn always_pass() -> Self {
        Self {
            verdict: Verdict::Pass,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always_fail(reason: &str) -> Self {
        Self {
            verdict: Verdict::Fail {
                reason: reason.to_string(),
            },
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SolutionValidator for ScriptedValidator {
    fn validate(&self, _solution: &Candidate, _test_cases: &[TestCase]) -> Result<Verdict> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict.clone())
    }
}
