//! Shared deterministic types for the workflow core.
//!
//! These types define the contracts between nodes. They carry no I/O and
//! serialize to the same JSON shapes the gateway schemas describe.

use serde::{Deserialize, Serialize};

/// A generated code solution plus its human-readable description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Description of the approach, rationale and complexity analysis.
    pub prefix: String,
    /// Import statements required by `code`.
    pub imports: String,
    /// Self-contained implementation, excluding imports.
    pub code: String,
}

/// A generated test case for the user query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Description of what the test exercises.
    pub prefix: String,
    pub test_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Outcome of the most recent validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Status {
    Success {
        code: String,
        imports: String,
        prefix: String,
    },
    Failure {
        reason: String,
        code: String,
    },
}

impl Status {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }
}

/// Result reported by a [`SolutionValidator`](crate::agents::validator::SolutionValidator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail { reason: String },
}

/// Structured output of the solution generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionsOutput {
    pub solutions: Vec<Candidate>,
}

/// Structured output of the test-case generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCasesOutput {
    pub test_cases: Vec<TestCase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_with_outcome_tag() {
        let status = Status::Failure {
            reason: "assertion failed".to_string(),
            code: "fn add() {}".to_string(),
        };
        let value = serde_json::to_value(&status).expect("serialize");
        assert_eq!(value["outcome"], "failure");
        assert_eq!(value["reason"], "assertion failed");
        assert!(status.is_failure());
    }

    #[test]
    fn success_is_not_failure() {
        let status = Status::Success {
            code: "c".to_string(),
            imports: String::new(),
            prefix: "p".to_string(),
        };
        assert!(!status.is_failure());
    }
}
