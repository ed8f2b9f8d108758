//! Prompt pack builder for the generator and ranker nodes.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use minijinja::{Environment, context};
use regex::Regex;
use tracing::debug;

use crate::core::types::Candidate;

const SOLUTIONS_TEMPLATE: &str = include_str!("prompts/solutions.md");
const TEST_CASES_TEMPLATE: &str = include_str!("prompts/test_cases.md");
const RANKER_TEMPLATE: &str = include_str!("prompts/ranker.md");

/// Droppable sections, least important first.
const DROP_ORDER: [&str; 2] = ["reflections", "query"];

/// Markers follow the format `<!-- section:KEY required|droppable -->`.
static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*section:(\w+)\s+(required|droppable)\s*-->")
        .expect("section marker pattern is valid")
});

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("solutions", SOLUTIONS_TEMPLATE)
            .context("load solutions template")?;
        env.add_template("test_cases", TEST_CASES_TEMPLATE)
            .context("load test_cases template")?;
        env.add_template("ranker", RANKER_TEMPLATE)
            .context("load ranker template")?;
        Ok(Self { env })
    }

    fn render_solutions(&self, input: &PromptInputs) -> Result<String> {
        let template = self.env.get_template("solutions")?;
        let reflections: Vec<&str> = input
            .reflections
            .iter()
            .map(|note| note.trim())
            .filter(|note| !note.is_empty())
            .collect();
        let rendered = template.render(context! {
            query => input.query.trim(),
            reflections => reflections,
        })?;
        Ok(rendered)
    }

    fn render_test_cases(&self, input: &PromptInputs) -> Result<String> {
        let template = self.env.get_template("test_cases")?;
        let rendered = template.render(context! {
            query => input.query.trim(),
        })?;
        Ok(rendered)
    }

    fn render_ranker(&self, input: &PromptInputs, candidates: &str) -> Result<String> {
        let template = self.env.get_template("ranker")?;
        let rendered = template.render(context! {
            query => input.query.trim(),
            candidates => candidates,
        })?;
        Ok(rendered)
    }
}

/// A parsed section from rendered template output.
#[derive(Debug, Clone)]
struct ParsedSection {
    key: String,
    required: bool,
    /// Section content after the marker.
    content: String,
}

fn parse_sections(rendered: &str) -> Vec<ParsedSection> {
    let markers: Vec<(usize, usize, String, bool)> = SECTION_RE
        .captures_iter(rendered)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?.as_str().to_string();
            let required = caps.get(2)?.as_str() == "required";
            Some((whole.start(), whole.end(), key, required))
        })
        .collect();

    let mut sections = Vec::new();
    for (i, (_, content_start, key, required)) in markers.iter().enumerate() {
        let end = markers
            .get(i + 1)
            .map(|next| next.0)
            .unwrap_or(rendered.len());
        let content = rendered[*content_start..end].trim().to_string();
        if !content.is_empty() || *required {
            sections.push(ParsedSection {
                key: key.clone(),
                required: *required,
                content,
            });
        }
    }
    sections
}

/// Drop droppable sections in [`DROP_ORDER`] until the pack fits.
///
/// Required sections are never cut. Returns the resulting content size.
fn apply_budget_to_sections(sections: &mut Vec<ParsedSection>, budget: usize) -> usize {
    let total_len =
        |secs: &[ParsedSection]| -> usize { secs.iter().map(|s| s.content.len()).sum() };

    for key in DROP_ORDER {
        if total_len(sections) <= budget {
            break;
        }
        if let Some(idx) = sections.iter().position(|s| s.key == key && !s.required) {
            debug!(
                section = key,
                bytes_dropped = sections[idx].content.len(),
                "dropped section for budget"
            );
            sections.remove(idx);
        }
    }
    total_len(sections)
}

fn render_sections(sections: &[ParsedSection]) -> String {
    sections
        .iter()
        .map(|s| s.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Run-level inputs shared by every prompt.
#[derive(Debug, Clone)]
pub struct PromptInputs {
    pub query: String,
    pub reflections: Vec<String>,
}

/// Builds prompt packs within a byte budget, dropping less critical sections first.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn build_solutions(&self, input: &PromptInputs) -> Result<PromptPack> {
        let rendered = PromptEngine::new()?
            .render_solutions(input)
            .context("render solutions prompt")?;
        self.pack("solutions", &rendered, self.budget_bytes)
    }

    pub fn build_test_cases(&self, input: &PromptInputs) -> Result<PromptPack> {
        let rendered = PromptEngine::new()?
            .render_test_cases(input)
            .context("render test_cases prompt")?;
        self.pack("test_cases", &rendered, self.budget_bytes)
    }

    /// The serialized candidate list does not count against the budget: the
    /// ranker always sees the whole pool.
    pub fn build_ranker(
        &self,
        input: &PromptInputs,
        candidates: &[Candidate],
    ) -> Result<PromptPack> {
        let serialized =
            serde_json::to_string_pretty(candidates).context("serialize candidates")?;
        let rendered = PromptEngine::new()?
            .render_ranker(input, &serialized)
            .context("render ranker prompt")?;
        let budget = self.budget_bytes.saturating_add(serialized.len());
        self.pack("ranker", &rendered, budget)
    }

    fn pack(&self, name: &str, rendered: &str, budget: usize) -> Result<PromptPack> {
        let mut sections = parse_sections(rendered);
        let size = apply_budget_to_sections(&mut sections, budget);
        if size > budget {
            bail!(
                "{name} prompt needs {size} bytes for its required sections, \
                 over the {budget} byte budget"
            );
        }
        Ok(PromptPack {
            content: render_sections(&sections),
        })
    }
}

/// A rendered prompt ready to send to the gateway.
#[derive(Debug, Clone)]
pub struct PromptPack {
    content: String,
}

impl PromptPack {
    pub fn render(&self) -> String {
        self.content.clone()
    }
}
