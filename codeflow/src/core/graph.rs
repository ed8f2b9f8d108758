//! Static description of the workflow graph, used for the diagram side-file.

use std::fmt::Write as _;

pub const START: &str = "__start__";
pub const END: &str = "__end__";

pub const GENERATE_SOLUTIONS: &str = "generate_solutions";
pub const GENERATE_TEST_CASES: &str = "generate_test_cases";
pub const RANK_SOLUTIONS: &str = "rank_solutions";
pub const VALIDATE_SOLUTION: &str = "validate_solution";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: &'static str,
    pub to: &'static str,
    /// Label for conditional edges; `None` for unconditional ones.
    pub condition: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    pub nodes: Vec<&'static str>,
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    /// The generate / (test ∥ rank) / validate graph with its retry edge.
    pub fn standard() -> Self {
        let edge = |from, to| Edge {
            from,
            to,
            condition: None,
        };
        Self {
            nodes: vec![
                START,
                GENERATE_SOLUTIONS,
                GENERATE_TEST_CASES,
                RANK_SOLUTIONS,
                VALIDATE_SOLUTION,
                END,
            ],
            edges: vec![
                edge(START, GENERATE_SOLUTIONS),
                edge(GENERATE_SOLUTIONS, GENERATE_TEST_CASES),
                edge(GENERATE_SOLUTIONS, RANK_SOLUTIONS),
                edge(GENERATE_TEST_CASES, VALIDATE_SOLUTION),
                edge(RANK_SOLUTIONS, VALIDATE_SOLUTION),
                Edge {
                    from: VALIDATE_SOLUTION,
                    to: END,
                    condition: Some("success or retries exhausted"),
                },
                Edge {
                    from: VALIDATE_SOLUTION,
                    to: GENERATE_SOLUTIONS,
                    condition: Some("failure"),
                },
            ],
        }
    }

    /// Render as Graphviz DOT. Conditional edges are dashed.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph workflow {\n    rankdir=TB;\n");
        for node in &self.nodes {
            let shape = if *node == START || *node == END {
                "oval"
            } else {
                "box"
            };
            let _ = writeln!(out, "    {node} [shape={shape}, label=\"{node}\"];");
        }
        for edge in &self.edges {
            match edge.condition {
                Some(label) => {
                    let _ = writeln!(
                        out,
                        "    {} -> {} [style=dashed, label=\"{label}\"];",
                        edge.from, edge.to
                    );
                }
                None => {
                    let _ = writeln!(out, "    {} -> {};", edge.from, edge.to);
                }
            }
        }
        out.push_str("}\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_graph_has_single_conditional_back_edge() {
        let graph = WorkflowGraph::standard();
        let back_edges: Vec<&Edge> = graph
            .edges
            .iter()
            .filter(|e| e.to == GENERATE_SOLUTIONS && e.from != START)
            .collect();
        assert_eq!(back_edges.len(), 1);
        assert_eq!(back_edges[0].from, VALIDATE_SOLUTION);
        assert_eq!(back_edges[0].condition, Some("failure"));
    }

    #[test]
    fn validator_joins_both_branches() {
        let graph = WorkflowGraph::standard();
        let mut into_validator: Vec<&str> = graph
            .edges
            .iter()
            .filter(|e| e.to == VALIDATE_SOLUTION)
            .map(|e| e.from)
            .collect();
        into_validator.sort_unstable();
        assert_eq!(into_validator, vec![GENERATE_TEST_CASES, RANK_SOLUTIONS]);
    }

    #[test]
    fn dot_output_lists_nodes_and_dashed_conditionals() {
        let dot = WorkflowGraph::standard().to_dot();
        assert!(dot.starts_with("digraph workflow {"));
        assert!(dot.contains("rank_solutions [shape=box"));
        assert!(dot.contains("validate_solution -> generate_solutions [style=dashed"));
        assert!(dot.contains("generate_solutions -> generate_test_cases;"));
        assert!(dot.trim_end().ends_with('}'));
    }
}
