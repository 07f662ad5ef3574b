//! Dialect adapter registry.
//!
//! Every supported dialect answers the same five-operation contract:
//! `parse` into the dialect-neutral [`GraphModel`], plus the four structural
//! mutators. Dispatch is an exhaustive match over the closed [`Dialect`]
//! enum; dialects with parse-only support implement the mutators as
//! identity, leaving [`append_line`] as their only textual edit.

pub mod class;
pub mod er;
pub mod sequence;
pub mod simple;
pub mod state;

use crate::flowchart::{self, ArrowKind, NodeShape};
use crate::gantt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dialect {
    Flowchart,
    Class,
    Er,
    State,
    Sequence,
    Gantt,
    Pie,
    Mindmap,
    Timeline,
    C4,
    GitGraph,
    Quadrant,
    Unsupported,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Flowchart => "flowchart",
            Dialect::Class => "classDiagram",
            Dialect::Er => "erDiagram",
            Dialect::State => "stateDiagram",
            Dialect::Sequence => "sequenceDiagram",
            Dialect::Gantt => "gantt",
            Dialect::Pie => "pie",
            Dialect::Mindmap => "mindmap",
            Dialect::Timeline => "timeline",
            Dialect::C4 => "c4",
            Dialect::GitGraph => "gitGraph",
            Dialect::Quadrant => "quadrantChart",
            Dialect::Unsupported => "unsupported",
        }
    }

    pub fn parse(&self, text: &str) -> GraphModel {
        match self {
            Dialect::Flowchart => flowchart_graph(text),
            Dialect::Class => class::parse(text),
            Dialect::Er => er::parse(text),
            Dialect::State => state::parse(text),
            Dialect::Sequence => sequence::parse(text),
            Dialect::Gantt => gantt_graph(text),
            Dialect::Pie => simple::parse_pie(text),
            Dialect::Mindmap => simple::parse_mindmap(text),
            Dialect::Timeline => simple::parse_timeline(text),
            Dialect::C4 => simple::parse_c4(text),
            Dialect::GitGraph => simple::parse_git_graph(text),
            Dialect::Quadrant => simple::parse_quadrant(text),
            Dialect::Unsupported => GraphModel::new("unsupported"),
        }
    }

    pub fn add_node(&self, code: &str, id: &str, label: &str) -> String {
        match self {
            Dialect::Flowchart => flowchart::mutate::add_node(code, id, label, &NodeShape::Rect),
            Dialect::Class => class::add_node(code, id, label),
            Dialect::Er => er::add_node(code, id),
            Dialect::State => state::add_node(code, id, label),
            Dialect::Sequence => sequence::add_node(code, id, label),
            _ => code.to_string(),
        }
    }

    pub fn remove_node(&self, code: &str, id: &str) -> String {
        match self {
            Dialect::Flowchart => flowchart::mutate::remove_node(code, id),
            Dialect::Class => class::remove_node(code, id),
            Dialect::Er => er::remove_node(code, id),
            Dialect::State => state::remove_node(code, id),
            Dialect::Sequence => sequence::remove_node(code, id),
            _ => code.to_string(),
        }
    }

    pub fn add_edge(&self, code: &str, source: &str, target: &str, label: Option<&str>) -> String {
        match self {
            Dialect::Flowchart => {
                flowchart::mutate::add_edge(code, source, target, &ArrowKind::solid_point(), label)
            }
            Dialect::Class => class::add_edge(code, source, target, label),
            Dialect::Er => er::add_edge(code, source, target, label),
            Dialect::State => state::add_edge(code, source, target, label),
            Dialect::Sequence => sequence::add_edge(code, source, target, label),
            _ => code.to_string(),
        }
    }

    pub fn remove_edge(&self, code: &str, source: &str, target: &str) -> String {
        match self {
            Dialect::Flowchart => flowchart::mutate::remove_edge(code, source, target),
            Dialect::Class => class::remove_edge(code, source, target),
            Dialect::Er => er::remove_edge(code, source, target),
            Dialect::State => state::remove_edge(code, source, target),
            Dialect::Sequence => sequence::remove_edge(code, source, target),
            _ => code.to_string(),
        }
    }
}

/// Appends one raw line, preserving the document's newline discipline. The
/// only textual mutation parse-only dialects expose.
pub fn append_line(code: &str, line: &str) -> String {
    if code.is_empty() {
        return format!("{line}\n");
    }
    if code.ends_with('\n') {
        format!("{code}{line}\n")
    } else {
        format!("{code}\n{line}")
    }
}

/// Drops every line the predicate flags, preserving newline discipline.
/// Shared by the structural adapters, whose removals are whole-line.
pub(crate) fn remove_lines(code: &str, drop: impl Fn(usize, &str) -> bool) -> String {
    let trailing_newline = code.ends_with('\n');
    let mut lines: Vec<&str> = code.split('\n').collect();
    if trailing_newline {
        lines.pop();
    }
    let kept: Vec<&str> = lines
        .into_iter()
        .enumerate()
        .filter(|(idx, line)| !drop(*idx, line))
        .map(|(_, line)| line)
        .collect();
    let mut out = kept.join("\n");
    if trailing_newline && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Dialect-neutral editor model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphModel {
    pub kind: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Declaration line; `None` for entities only seen inside relations.
    pub line: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLink {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
    pub line: usize,
}

impl GraphModel {
    pub(crate) fn new(kind: &str) -> Self {
        GraphModel {
            kind: kind.to_string(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn edge(&self, source: &str, target: &str) -> Option<&GraphLink> {
        self.edges
            .iter()
            .find(|e| e.source == source && e.target == target)
    }

    /// Registers a node, upgrading a relation-only record when an explicit
    /// declaration shows up later.
    pub(crate) fn touch_node(&mut self, id: &str, label: Option<&str>, line: Option<usize>) {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) => {
                if node.line.is_none() && line.is_some() {
                    node.line = line;
                    if let Some(label) = label {
                        node.label = label.to_string();
                    }
                }
            }
            None => self.nodes.push(GraphNode {
                id: id.to_string(),
                label: label.unwrap_or(id).to_string(),
                line,
            }),
        }
    }
}

fn flowchart_graph(text: &str) -> GraphModel {
    let fc = flowchart::parse_flowchart(text);
    let mut model = GraphModel::new("flowchart");
    for node in &fc.nodes {
        model.nodes.push(GraphNode {
            id: node.id.clone(),
            label: node.label.clone(),
            line: node.source_line,
        });
    }
    for edge in &fc.edges {
        model.edges.push(GraphLink {
            source: edge.source.clone(),
            target: edge.target.clone(),
            label: edge.label.clone(),
            line: edge.source_line,
        });
    }
    model
}

fn gantt_graph(text: &str) -> GraphModel {
    let chart = gantt::parse_gantt(text);
    let mut model = GraphModel::new("gantt");
    for task in &chart.tasks {
        model.nodes.push(GraphNode {
            id: task.key(),
            label: task.label.clone(),
            line: Some(task.source_line),
        });
        for dep in &task.after_deps {
            model.edges.push(GraphLink {
                source: dep.clone(),
                target: task.key(),
                label: None,
                line: task.source_line,
            });
        }
    }
    model
}
