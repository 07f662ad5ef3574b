//! Span-precise flowchart mutations.
//!
//! Every operation is total: it re-parses the input, locates its target and
//! returns the input unchanged when the target is missing. Edits replace
//! only the character span owned by the target; lines are spliced in or out
//! only when nothing else remains on them. When a line carries several
//! statements, the untouched parts are reconstructed from their original
//! token slices, not re-printed.

use super::lexer::{self, ArrowToken, NodeToken, Token};
use super::lexical::{self, ArrowKind, NodeShape};
use super::model::{FlowchartModel, LineSpan};
use super::parse::{parse_flowchart, strip_keyword};
use tracing::debug;

/// Appends an explicit declaration for a new node. No-op when the id is
/// already declared (by brackets or by an annotation line).
pub fn add_node(code: &str, id: &str, label: &str, shape: &NodeShape) -> String {
    let model = parse_flowchart(code);
    if model
        .node(id)
        .is_some_and(|n| n.decl_span.is_some() || n.annotation_line.is_some())
    {
        return code.to_string();
    }

    let mut doc = Doc::new(code);
    let indent = doc.statement_indent();
    let at = doc.insertion_index();
    match lexical::delimiters_for(shape) {
        Some((open, close)) => {
            doc.insert(at, format!("{indent}{id}{open}{}{close}", render_label(label)));
        }
        None => {
            // Extended shapes have no bracket spelling: bracketed fallback
            // plus an annotation line.
            doc.insert(at, format!("{indent}{id}[\"{label}\"]"));
            doc.insert(at + 1, annotation_line(&indent, id, shape, label));
        }
    }
    doc.render()
}

/// Removes a node's declaration, its annotation line, and every edge that
/// touches it; lines left empty are dropped.
pub fn remove_node(code: &str, id: &str) -> String {
    let model = parse_flowchart(code);
    if model.node(id).is_none() {
        return code.to_string();
    }

    let mut doc = Doc::new(code);
    for idx in (0..doc.lines.len()).rev() {
        let line = doc.lines[idx].clone();
        let trimmed = line.trim();
        if is_annotation_for(trimmed, id) {
            doc.remove(idx);
            continue;
        }
        let is_stmt = is_statement_line(trimmed) || header_prefix_len(&line) > 0;
        if !is_stmt || !line.contains(id) {
            continue;
        }
        match rebuild_statement_line(&line, &model, &|_, _| true, Some(id)) {
            Rebuilt::Unchanged => {}
            Rebuilt::Replaced(new) => doc.lines[idx] = new,
            Rebuilt::Empty => doc.remove(idx),
        }
    }
    debug!(id, "removed node");
    doc.render()
}

/// Rewrites the node's label in place. Prefers the annotation line when one
/// exists (it owns the effective label), then the explicit declaration, then
/// the first bare reference (which this promotes to a declaration).
pub fn update_node_label(code: &str, id: &str, label: &str) -> String {
    let model = parse_flowchart(code);
    let Some(node) = model.node(id) else {
        return code.to_string();
    };

    let mut doc = Doc::new(code);
    if let Some(line) = node.annotation_line {
        let indent = indent_of(&doc.lines[line]).to_string();
        doc.lines[line] = annotation_line(&indent, id, &node.shape, label);
        return doc.render();
    }
    let Some(span) = node.decl_span.as_ref().or(node.ref_span.as_ref()) else {
        return code.to_string();
    };
    let (open, close) = match (&node.shape_open, &node.shape_close) {
        (Some(open), Some(close)) if node.decl_span.is_some() => {
            (open.as_str(), close.as_str())
        }
        _ => ("[", "]"),
    };
    doc.replace_span(span, &format!("{id}{open}{}{close}", render_label(label)));
    doc.render()
}

/// Rewrites the node's shape, keeping its current label. A target shape with
/// no bracket spelling becomes a bracketed fallback plus a fresh annotation
/// line; any stale annotation line is removed first.
pub fn update_node_shape(code: &str, id: &str, shape: &NodeShape) -> String {
    let model = parse_flowchart(code);
    let Some(node) = model.node(id) else {
        return code.to_string();
    };
    let label = node.label.clone();
    let span = node.decl_span.clone().or(node.ref_span.clone());

    let mut doc = Doc::new(code);
    match lexical::delimiters_for(shape) {
        Some((open, close)) => {
            let decl = format!("{id}{open}{}{close}", render_label(&label));
            match span {
                Some(span) => doc.replace_span(&span, &decl),
                None => {
                    // Annotation-only node: give it a real declaration.
                    let indent = doc.statement_indent();
                    let at = doc.insertion_index();
                    doc.insert(at, format!("{indent}{decl}"));
                }
            }
            doc.remove_annotations_for(id);
        }
        None => {
            if let Some(span) = span {
                doc.replace_span(&span, &format!("{id}[\"{label}\"]"));
            }
            doc.remove_annotations_for(id);
            let indent = doc.statement_indent();
            let at = doc.insertion_index();
            doc.insert(at, annotation_line(&indent, id, shape, &label));
        }
    }
    doc.render()
}

/// Appends an edge statement. No-op when an identical `(source, target)`
/// edge already exists.
pub fn add_edge(
    code: &str,
    source: &str,
    target: &str,
    kind: &ArrowKind,
    label: Option<&str>,
) -> String {
    let model = parse_flowchart(code);
    if model.edge(source, target).is_some() {
        return code.to_string();
    }

    let mut doc = Doc::new(code);
    let indent = doc.statement_indent();
    let arrow = lexical::arrow_text(kind, 1);
    let stmt = match label {
        Some(label) => format!("{indent}{source} {arrow}|{label}| {target}"),
        None => format!("{indent}{source} {arrow} {target}"),
    };
    let at = doc.insertion_index();
    doc.insert(at, stmt);
    doc.render()
}

/// Removes every `(source, target)` edge; lines left with nothing else are
/// dropped. Unchanged input when no such edge exists.
pub fn remove_edge(code: &str, source: &str, target: &str) -> String {
    let model = parse_flowchart(code);
    if model.edge(source, target).is_none() {
        return code.to_string();
    }

    let mut lines: Vec<usize> = model
        .edges
        .iter()
        .filter(|e| e.source == source && e.target == target)
        .map(|e| e.source_line)
        .collect();
    lines.sort_unstable();
    lines.dedup();

    let mut doc = Doc::new(code);
    for idx in lines.into_iter().rev() {
        let line = doc.lines[idx].clone();
        let keep = |g: &LineGraph, e: &LineEdge| {
            let (s, t) = g.endpoints(e);
            !(s == source && t == target)
        };
        match rebuild_statement_line(&line, &model, &keep, None) {
            Rebuilt::Unchanged => {}
            Rebuilt::Replaced(new) => doc.lines[idx] = new,
            Rebuilt::Empty => doc.remove(idx),
        }
    }
    debug!(source, target, "removed edge");
    doc.render()
}

/// Replaces (or with `None`, removes) the label of the first matching edge,
/// leaving the arrow spelling alone. Inline `-- text -->` labels are
/// rewritten into pipe form.
pub fn update_edge_label(code: &str, source: &str, target: &str, label: Option<&str>) -> String {
    with_edge_arrow_slice(code, source, target, |slice, arrow| {
        let core = match slice.find('|') {
            Some(pipe) => slice[..pipe].trim_end().to_string(),
            None if arrow.label.is_some() => {
                directed_arrow_text(&arrow.kind, arrow.minlen, arrow.points_left)
            }
            None => slice.to_string(),
        };
        match label {
            Some(label) => format!("{core}|{label}|"),
            None => core,
        }
    })
}

/// Replaces the arrow of the first matching edge, preserving its label and
/// stretch.
pub fn update_edge_arrow(code: &str, source: &str, target: &str, kind: &ArrowKind) -> String {
    with_edge_arrow_slice(code, source, target, |slice, arrow| {
        let core = directed_arrow_text(kind, arrow.minlen, arrow.points_left);
        match slice.find('|') {
            Some(pipe) => format!("{core}{}", &slice[pipe..]),
            None => match &arrow.label {
                Some(label) => format!("{core}|{label}|"),
                None => core,
            },
        }
    })
}

/// Appends an empty `subgraph ... end` pair. No-op when the id exists.
pub fn add_subgraph(code: &str, id: &str, label: &str) -> String {
    let model = parse_flowchart(code);
    if model.subgraph(id).is_some() {
        return code.to_string();
    }

    let mut doc = Doc::new(code);
    let indent = doc.statement_indent();
    let header = if label.is_empty() || label == id {
        format!("{indent}subgraph {id}")
    } else {
        format!("{indent}subgraph {id} [{label}]")
    };
    let at = doc.insertion_index();
    doc.insert(at, header);
    doc.insert(at + 1, format!("{indent}end"));
    doc.render()
}

/// Removes the wrapper lines of a group, keeping its contents and outdenting
/// them back to the header's level.
pub fn remove_subgraph(code: &str, id: &str) -> String {
    let model = parse_flowchart(code);
    let Some(sg) = model.subgraph(id) else {
        return code.to_string();
    };
    let header = sg.start_line - 1;
    let body_end = sg.end_line.unwrap_or(model_line_count(code));

    let mut doc = Doc::new(code);
    let header_indent = indent_of(&doc.lines[header]).len();
    let extra = doc.lines[sg.start_line..body_end]
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| indent_of(l).len().saturating_sub(header_indent))
        .min()
        .unwrap_or(0);
    if extra > 0 {
        for line in &mut doc.lines[sg.start_line..body_end] {
            if line.trim().is_empty() {
                continue;
            }
            line.drain(..extra);
        }
    }
    if let Some(end) = sg.end_line {
        doc.remove(end);
    }
    doc.remove(header);
    doc.render()
}

/// Rewrites a group's title. A group declared with a quoted title has no
/// separate id, so the quoted title itself is replaced.
pub fn rename_subgraph(code: &str, id: &str, label: &str) -> String {
    let model = parse_flowchart(code);
    let Some(sg) = model.subgraph(id) else {
        return code.to_string();
    };
    let header = sg.start_line - 1;

    let mut doc = Doc::new(code);
    let indent = indent_of(&doc.lines[header]).to_string();
    doc.lines[header] = if id.chars().all(|c| lexer::is_ident_continue(c)) {
        format!("{indent}subgraph {id} [{label}]")
    } else {
        format!("{indent}subgraph \"{label}\"")
    };
    doc.render()
}

/// Moves a node's declaration line to just before the group's `end`. No-op
/// for virtual nodes and for unclosed groups.
pub fn move_node_to_subgraph(code: &str, id: &str, subgraph: &str) -> String {
    let model = parse_flowchart(code);
    let Some(node) = model.node(id) else {
        return code.to_string();
    };
    let Some(span) = node.decl_span.clone() else {
        return code.to_string();
    };
    let Some(sg) = model.subgraph(subgraph) else {
        return code.to_string();
    };
    let Some(end) = sg.end_line else {
        return code.to_string();
    };
    if model
        .enclosing_subgraph(span.line)
        .is_some_and(|s| s.id == subgraph)
    {
        return code.to_string();
    }

    let mut doc = Doc::new(code);
    let body_indent = format!("{}    ", indent_of(&doc.lines[end]));
    let (decl, end_idx) = doc.extract_declaration(&span, id, end);
    doc.insert(end_idx, format!("{body_indent}{decl}"));
    debug!(id, subgraph, "moved node into group");
    doc.render()
}

/// Moves a node's declaration line to just after its enclosing group's
/// closing line. No-op when the node is not inside a closed group.
pub fn move_node_out_of_subgraph(code: &str, id: &str) -> String {
    let model = parse_flowchart(code);
    let Some(node) = model.node(id) else {
        return code.to_string();
    };
    let Some(span) = node.decl_span.clone() else {
        return code.to_string();
    };
    let Some(sg) = model.enclosing_subgraph(span.line) else {
        return code.to_string();
    };
    let Some(end) = sg.end_line else {
        return code.to_string();
    };

    let mut doc = Doc::new(code);
    let indent = indent_of(&doc.lines[end]).to_string();
    let (decl, end_idx) = doc.extract_declaration(&span, id, end);
    doc.insert(end_idx + 1, format!("{indent}{decl}"));
    debug!(id, group = %sg.id, "moved node out of group");
    doc.render()
}

// ---------------------------------------------------------------------------
// Document surface

/// Line buffer that preserves the original newline discipline; indices match
/// the parser's line numbering.
struct Doc {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Doc {
    fn new(code: &str) -> Self {
        let trailing_newline = code.ends_with('\n');
        let mut lines: Vec<String> = code.split('\n').map(str::to_string).collect();
        if trailing_newline {
            lines.pop();
        }
        Doc {
            lines,
            trailing_newline,
        }
    }

    fn render(self) -> String {
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    fn insert(&mut self, idx: usize, line: String) {
        let idx = idx.min(self.lines.len());
        self.lines.insert(idx, line);
    }

    fn remove(&mut self, idx: usize) {
        self.lines.remove(idx);
    }

    fn replace_span(&mut self, span: &LineSpan, new: &str) {
        self.lines[span.line].replace_range(span.start..span.end, new);
    }

    /// Index after the last line of logical content: trailing blank lines
    /// and style/class directives stay below new declarations.
    fn insertion_index(&self) -> usize {
        let mut at = self.lines.len();
        while at > 0 {
            let t = self.lines[at - 1].trim();
            if t.is_empty() || is_style_directive(t) {
                at -= 1;
            } else {
                break;
            }
        }
        at
    }

    /// Indentation used by statement lines, falling back to four spaces.
    fn statement_indent(&self) -> String {
        for line in &self.lines {
            let t = line.trim();
            if is_statement_line(t) && !t.is_empty() {
                return indent_of(line).to_string();
            }
        }
        "    ".to_string()
    }

    fn remove_annotations_for(&mut self, id: &str) {
        let mut idx = self.lines.len();
        while idx > 0 {
            idx -= 1;
            if is_annotation_for(self.lines[idx].trim(), id) {
                self.remove(idx);
            }
        }
    }

    /// Pulls a node's declaration text out of its line. A line holding only
    /// the declaration is removed; otherwise the declaration token collapses
    /// to a bare reference. Returns the declaration slice and `anchor`
    /// shifted for any removed line above it.
    fn extract_declaration(&mut self, span: &LineSpan, id: &str, anchor: usize) -> (String, usize) {
        let line = &self.lines[span.line];
        let decl = line[span.start..span.end].to_string();
        let standalone = lexer::tokenize_line(line).len() == 1;
        if standalone {
            self.remove(span.line);
            let anchor = if span.line < anchor { anchor - 1 } else { anchor };
            (decl, anchor)
        } else {
            self.replace_span(span, id);
            (decl, anchor)
        }
    }
}

fn indent_of(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

fn model_line_count(code: &str) -> usize {
    code.lines().count()
}

fn is_style_directive(t: &str) -> bool {
    ["classDef", "class", "style", "linkStyle", "click"]
        .iter()
        .any(|kw| strip_keyword(t, kw).is_some())
}

fn is_statement_line(t: &str) -> bool {
    if t.is_empty() || t.starts_with("%%") || t == "end" || t == "end;" {
        return false;
    }
    if t.starts_with("accTitle") || t.starts_with("accDescr") {
        return false;
    }
    // Annotation lines are owned by their node, never relexed as statements.
    if let Some((_, end)) = lexer::scan_ident(t, 0) {
        if t[end..].trim_start().starts_with("@{") {
            return false;
        }
    }
    !["flowchart", "graph", "subgraph", "direction"]
        .iter()
        .any(|kw| strip_keyword(t, kw).is_some())
        && !is_style_directive(t)
}

fn is_annotation_for(t: &str, id: &str) -> bool {
    t.strip_prefix(id)
        .is_some_and(|rest| rest.trim_start().starts_with("@{"))
}

fn render_label(label: &str) -> String {
    let structural = label
        .chars()
        .any(|c| "[](){}<>|&\"".contains(c));
    if !structural {
        label.to_string()
    } else if label.contains('"') {
        format!("\"{}\"", label.replace('"', "#quot;"))
    } else {
        format!("\"{label}\"")
    }
}

fn annotation_line(indent: &str, id: &str, shape: &NodeShape, label: &str) -> String {
    format!(
        "{indent}{id}@{{ shape: {}, label: \"{label}\" }}",
        lexical::shape_name(shape)
    )
}

/// Canonical arrow spelling, mirrored when the original pointed left.
fn directed_arrow_text(kind: &ArrowKind, minlen: usize, points_left: bool) -> String {
    let text = lexical::arrow_text(kind, minlen);
    if !points_left || kind.bidirectional {
        return text;
    }
    let mut chars: Vec<char> = text.chars().collect();
    match chars.pop() {
        Some('>') => format!("<{}", chars.into_iter().collect::<String>()),
        Some(head @ ('o' | 'x')) => {
            format!("{head}{}", chars.into_iter().collect::<String>())
        }
        Some(other) => {
            chars.push(other);
            chars.into_iter().collect()
        }
        None => text,
    }
}

/// Shared locate-and-rewrite for the two edge update operations: finds the
/// first `(source, target)` edge and maps its arrow slice through `rewrite`.
fn with_edge_arrow_slice(
    code: &str,
    source: &str,
    target: &str,
    rewrite: impl Fn(&str, &ArrowToken) -> String,
) -> String {
    let model = parse_flowchart(code);
    let Some(edge) = model.edge(source, target) else {
        return code.to_string();
    };
    let line_idx = edge.source_line;

    let mut doc = Doc::new(code);
    let line = doc.lines[line_idx].clone();
    let g = relex(&line);
    let Some(hit) = g.edges.iter().find(|e| {
        let (s, t) = g.endpoints(e);
        s == source && t == target
    }) else {
        return code.to_string();
    };
    let arrow = g.arrow(hit.arrow);
    let slice = &line[arrow.span.clone()];
    let new = rewrite(slice, arrow);
    doc.lines[line_idx].replace_range(arrow.span.clone(), &new);
    doc.render()
}

// ---------------------------------------------------------------------------
// Line reconstruction

/// An edge within one line, as indices into the line's token list.
struct LineEdge {
    source: usize,
    arrow: usize,
    target: usize,
}

struct LineGraph {
    tokens: Vec<Token>,
    edges: Vec<LineEdge>,
}

impl LineGraph {
    fn node(&self, idx: usize) -> &NodeToken {
        match &self.tokens[idx] {
            Token::Node(n) => n,
            _ => unreachable!("edge endpoint indexes a node token"),
        }
    }

    fn arrow(&self, idx: usize) -> &ArrowToken {
        match &self.tokens[idx] {
            Token::Arrow(a) => a,
            _ => unreachable!("edge arrow indexes an arrow token"),
        }
    }

    /// Edge endpoints in model orientation (left-pointing arrows swap).
    fn endpoints(&self, e: &LineEdge) -> (&str, &str) {
        let (s, t) = (self.node(e.source).id.as_str(), self.node(e.target).id.as_str());
        if self.arrow(e.arrow).points_left {
            (t, s)
        } else {
            (s, t)
        }
    }
}

/// Re-runs the statement fold over one line, keeping token indices so the
/// caller can splice around individual edges.
fn relex(line: &str) -> LineGraph {
    let tokens = lexer::tokenize_line(line);
    let mut edges = Vec::new();
    let mut lhs: Vec<usize> = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut pending: Option<usize> = None;
    let mut last_amp = false;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::Ampersand(_) => last_amp = true,
            Token::Arrow(_) => {
                lhs = std::mem::take(&mut current);
                pending = Some(i);
                last_amp = false;
            }
            Token::Node(_) => {
                if current.is_empty() || last_amp {
                    current.push(i);
                    if let Some(arrow) = pending {
                        for &source in &lhs {
                            edges.push(LineEdge {
                                source,
                                arrow,
                                target: i,
                            });
                        }
                    }
                } else {
                    lhs.clear();
                    pending = None;
                    current = vec![i];
                }
                last_amp = false;
            }
        }
    }
    LineGraph { tokens, edges }
}

enum Rebuilt {
    Unchanged,
    Replaced(String),
    Empty,
}

/// Byte length of a `flowchart TD;` / `graph LR;` prefix when the header
/// line carries trailing statements, zero otherwise.
fn header_prefix_len(line: &str) -> usize {
    let trim_off = line.len() - line.trim_start().len();
    let t = line.trim_start();
    let Some(rest) = strip_keyword(t, "flowchart").or(strip_keyword(t, "graph")) else {
        return 0;
    };
    let mut at = t.len() - rest.len();
    let token: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != ';')
        .collect();
    if super::parse::normalize_direction(&token).is_some() {
        at += token.len();
    }
    while t[at..].starts_with([';', ' ', '\t']) {
        at += 1;
    }
    if t[at..].trim().is_empty() {
        return 0;
    }
    trim_off + at
}

/// [`rebuild_line`], but aware of statements trailing a diagram header on
/// the same line; the header prefix is never touched.
fn rebuild_statement_line(
    line: &str,
    model: &FlowchartModel,
    keep: &dyn Fn(&LineGraph, &LineEdge) -> bool,
    drop_node: Option<&str>,
) -> Rebuilt {
    let off = header_prefix_len(line);
    if off == 0 {
        return rebuild_line(line, model, keep, drop_node);
    }
    match rebuild_line(&line[off..], model, keep, drop_node) {
        Rebuilt::Unchanged => Rebuilt::Unchanged,
        Rebuilt::Replaced(body) => Rebuilt::Replaced(format!("{}{}", &line[..off], body)),
        Rebuilt::Empty => {
            Rebuilt::Replaced(line[..off].trim_end_matches([';', ' ', '\t']).to_string())
        }
    }
}

/// Rebuilds a statement line keeping only the edges `keep` accepts and
/// dropping every appearance of `drop_node`. Surviving edges are re-emitted
/// from their original token slices, chains and fan-outs re-merged. A node
/// left without any edge keeps a standalone statement only when it is
/// declared here or appears nowhere else in the document.
fn rebuild_line(
    line: &str,
    model: &FlowchartModel,
    keep: &dyn Fn(&LineGraph, &LineEdge) -> bool,
    drop_node: Option<&str>,
) -> Rebuilt {
    let g = relex(line);

    let touches_dropped = |e: &LineEdge| {
        drop_node.is_some_and(|id| g.node(e.source).id == id || g.node(e.target).id == id)
    };
    let surviving: Vec<&LineEdge> = g
        .edges
        .iter()
        .filter(|e| keep(&g, e) && !touches_dropped(e))
        .collect();

    let node_dropped = drop_node.is_some_and(|id| {
        g.tokens
            .iter()
            .any(|t| matches!(t, Token::Node(n) if n.id == id))
    });
    if surviving.len() == g.edges.len() && !node_dropped {
        return Rebuilt::Unchanged;
    }

    struct Stmt {
        text: String,
        tail_id: String,
        source_id: String,
        arrow_slice: String,
    }
    let mut stmts: Vec<Stmt> = Vec::new();
    let mut emitted: Vec<usize> = Vec::new();

    for e in &surviving {
        let src = g.node(e.source);
        let tgt = g.node(e.target);
        let arrow_slice = &line[g.arrow(e.arrow).span.clone()];
        let src_slice = &line[src.span.clone()];
        let tgt_slice = &line[tgt.span.clone()];

        if let Some(last) = stmts.last_mut() {
            if last.tail_id == src.id {
                last.text.push_str(&format!(" {arrow_slice} {tgt_slice}"));
                last.tail_id = tgt.id.clone();
                last.source_id = src.id.clone();
                last.arrow_slice = arrow_slice.to_string();
                emitted.extend([e.source, e.arrow, e.target]);
                continue;
            }
            if last.source_id == src.id && last.arrow_slice == arrow_slice {
                last.text.push_str(&format!(" & {tgt_slice}"));
                last.tail_id = tgt.id.clone();
                emitted.extend([e.source, e.arrow, e.target]);
                continue;
            }
        }
        stmts.push(Stmt {
            text: format!("{src_slice} {arrow_slice} {tgt_slice}"),
            tail_id: tgt.id.clone(),
            source_id: src.id.clone(),
            arrow_slice: arrow_slice.to_string(),
        });
        emitted.extend([e.source, e.arrow, e.target]);
    }

    // Standalone declarations and last-reference nodes survive on their own.
    for (i, tok) in g.tokens.iter().enumerate() {
        let Token::Node(n) = tok else { continue };
        if emitted.contains(&i) || drop_node == Some(n.id.as_str()) {
            continue;
        }
        let on_line = g
            .tokens
            .iter()
            .filter(|t| matches!(t, Token::Node(m) if m.id == n.id))
            .count();
        let elsewhere = model.node(&n.id).map_or(0, |m| m.occurrences) > on_line;
        if n.shape.is_some() || !elsewhere {
            let slice = &line[n.span.clone()];
            if !stmts.iter().any(|s| s.text == slice) {
                stmts.push(Stmt {
                    text: slice.to_string(),
                    tail_id: n.id.clone(),
                    source_id: String::new(),
                    arrow_slice: String::new(),
                });
            }
        }
    }

    if stmts.is_empty() {
        return Rebuilt::Empty;
    }
    let body: Vec<String> = stmts.into_iter().map(|s| s.text).collect();
    Rebuilt::Replaced(format!("{}{}", indent_of(line), body.join("; ")))
}
