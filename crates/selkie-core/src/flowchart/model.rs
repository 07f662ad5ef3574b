use super::lexical::{ArrowKind, NodeShape};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A byte span inside one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LineSpan {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowNode {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    /// Literal delimiter pair used in the source; `None` when the shape was
    /// assigned through an annotation line (or defaulted).
    pub shape_open: Option<String>,
    pub shape_close: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Line index of the explicit declaration; `None` for virtual nodes
    /// that are only ever referenced inside edges.
    pub source_line: Option<usize>,
    #[serde(skip)]
    pub(crate) decl_span: Option<LineSpan>,
    #[serde(skip)]
    pub(crate) ref_span: Option<LineSpan>,
    #[serde(skip)]
    pub(crate) annotation_line: Option<usize>,
    /// How many times the id occurs across statement lines.
    #[serde(skip)]
    pub(crate) occurrences: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    pub arrow: ArrowKind,
    /// Layout separation hint derived from extra arrow glyphs; always >= 1.
    pub minlen: usize,
    pub source_line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSubgraph {
    pub id: String,
    pub label: String,
    pub direction: Option<String>,
    /// First line of the group body (the line after `subgraph ...`).
    pub start_line: usize,
    /// Line of the matching `end`, exclusive bound of the body. `None` when
    /// the group never closes; such groups are excluded from containment.
    pub end_line: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignment {
    pub target: String,
    pub class_name: String,
    pub source_line: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartModel {
    pub direction: Option<String>,
    pub nodes: Vec<FlowNode>,
    pub edges: Vec<FlowEdge>,
    pub subgraphs: Vec<FlowSubgraph>,
    pub class_defs: IndexMap<String, Vec<String>>,
    pub class_assignments: Vec<ClassAssignment>,
    /// Ids of groups with no matching `end` (structural anomaly, reported
    /// as data).
    pub unclosed_subgraphs: Vec<String>,
    /// Pass-through directive lines (`style`, `click`, `linkStyle`).
    #[serde(skip)]
    pub(crate) style_lines: Vec<usize>,
    #[serde(skip)]
    pub(crate) header_line: Option<usize>,
}

impl FlowchartModel {
    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&FlowEdge> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    pub fn subgraph(&self, id: &str) -> Option<&FlowSubgraph> {
        self.subgraphs.iter().find(|s| s.id == id)
    }

    /// The line a node lives on: explicit declaration preferred, first bare
    /// reference otherwise.
    pub(crate) fn node_line(&self, id: &str) -> Option<usize> {
        let node = self.node(id)?;
        node.decl_span
            .as_ref()
            .or(node.ref_span.as_ref())
            .map(|s| s.line)
    }

    /// Innermost closed group whose line range contains `line`.
    pub(crate) fn enclosing_subgraph(&self, line: usize) -> Option<&FlowSubgraph> {
        self.subgraphs
            .iter()
            .filter(|s| s.end_line.is_some_and(|end| s.start_line <= line && line < end))
            .max_by_key(|s| s.start_line)
    }
}
