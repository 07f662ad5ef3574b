//! Flowchart parser.
//!
//! Line-oriented and best-effort: every parse call starts from the raw text
//! (nothing is cached between calls), records source lines and byte spans
//! for each entity, and silently skips anything it does not understand.
//! Unrecognized lines stay in the document untouched; they are simply
//! absent from the model.

use super::lexer::{self, ArrowToken, NodeToken, Token};
use super::lexical::NodeShape;
use super::model::{
    ClassAssignment, FlowEdge, FlowNode, FlowSubgraph, FlowchartModel, LineSpan,
};
use rustc_hash::FxHashMap;
use tracing::debug;

pub fn parse_flowchart(code: &str) -> FlowchartModel {
    let lines: Vec<&str> = code.lines().collect();
    let fm = crate::frontmatter::scan(code);

    let mut b = Builder::default();
    let mut header_seen = false;
    // Open `subgraph` headers: (id, label, direction, header line).
    let mut stack: Vec<(String, String, Option<String>, usize)> = Vec::new();

    for (idx, raw) in lines.iter().enumerate().skip(fm.lines) {
        let trim_off = raw.len() - raw.trim_start().len();
        let line = raw.trim();
        if line.is_empty() || line.starts_with("%%") {
            continue;
        }

        if !header_seen {
            if let Some(rest) = strip_keyword(line, "flowchart").or(strip_keyword(line, "graph")) {
                header_seen = true;
                b.model.header_line = Some(idx);
                let (dir, consumed) = scan_direction(rest);
                b.model.direction = dir;
                // `graph TD;A-->B;` keeps statements on the header line.
                let rest_off = line.len() - rest.len() + consumed;
                if !rest[consumed..].trim_matches([';', ' ']).is_empty() {
                    b.statement(raw, trim_off + rest_off, idx);
                }
                continue;
            }
        }

        if let Some(rest) = strip_keyword(line, "direction") {
            let dir = normalize_direction(rest.trim_end_matches(';').trim());
            match stack.last_mut() {
                Some(open) => open.2 = dir,
                None => b.model.direction = dir,
            }
            continue;
        }

        if let Some(rest) = strip_keyword(line, "subgraph") {
            let (id, label) = parse_subgraph_header(rest);
            stack.push((id, label, None, idx));
            continue;
        }

        if line == "end" || line == "end;" {
            if let Some((id, label, direction, header)) = stack.pop() {
                b.model.subgraphs.push(FlowSubgraph {
                    id,
                    label,
                    direction,
                    start_line: header + 1,
                    end_line: Some(idx),
                });
            }
            continue;
        }

        if let Some(rest) = strip_keyword(line, "classDef") {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let names = parts.next().unwrap_or("");
            let styles: Vec<String> = parts
                .next()
                .unwrap_or("")
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            for name in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                b.model.class_defs.insert(name.to_string(), styles.clone());
            }
            continue;
        }

        if let Some(rest) = strip_keyword(line, "class") {
            let mut parts = rest.splitn(2, char::is_whitespace);
            let targets = parts.next().unwrap_or("");
            let class_name = parts.next().unwrap_or("").trim().trim_end_matches(';');
            if !class_name.is_empty() {
                for target in targets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    b.model.class_assignments.push(ClassAssignment {
                        target: target.to_string(),
                        class_name: class_name.to_string(),
                        source_line: idx,
                    });
                }
            }
            continue;
        }

        if strip_keyword(line, "style").is_some()
            || strip_keyword(line, "linkStyle").is_some()
            || strip_keyword(line, "click").is_some()
        {
            b.model.style_lines.push(idx);
            continue;
        }

        // Accessibility metadata is pass-through, not node statements.
        if line.starts_with("accTitle") || line.starts_with("accDescr") {
            continue;
        }

        if let Some((id, props)) = parse_annotation(line) {
            b.apply_annotation(&id, props, idx);
            continue;
        }

        b.statement(raw, 0, idx);
    }

    // Unclosed groups are tolerated: they extend to end of document and are
    // excluded from containment queries.
    for (id, label, direction, header) in stack.into_iter().rev() {
        b.model.unclosed_subgraphs.push(id.clone());
        b.model.subgraphs.push(FlowSubgraph {
            id,
            label,
            direction,
            start_line: header + 1,
            end_line: None,
        });
    }

    debug!(
        nodes = b.model.nodes.len(),
        edges = b.model.edges.len(),
        subgraphs = b.model.subgraphs.len(),
        "parsed flowchart"
    );
    b.model
}

/// Name of the innermost closed group containing the node, if any.
pub fn find_node_subgraph(code: &str, id: &str) -> Option<String> {
    let model = parse_flowchart(code);
    let line = model.node_line(id)?;
    model.enclosing_subgraph(line).map(|s| s.id.clone())
}

#[derive(Default)]
struct Builder {
    model: FlowchartModel,
    index: FxHashMap<String, usize>,
}

impl Builder {
    fn ensure_node(&mut self, id: &str) -> &mut FlowNode {
        let idx = match self.index.get(id) {
            Some(&idx) => idx,
            None => {
                let idx = self.model.nodes.len();
                self.model.nodes.push(FlowNode {
                    id: id.to_string(),
                    label: id.to_string(),
                    shape: NodeShape::Rect,
                    shape_open: None,
                    shape_close: None,
                    classes: Vec::new(),
                    source_line: None,
                    decl_span: None,
                    ref_span: None,
                    annotation_line: None,
                    occurrences: 0,
                });
                self.index.insert(id.to_string(), idx);
                idx
            }
        };
        &mut self.model.nodes[idx]
    }

    fn register(&mut self, tok: &NodeToken, line: usize) {
        if let Some(tag) = &tok.class_tag {
            self.model.class_assignments.push(ClassAssignment {
                target: tok.id.clone(),
                class_name: tag.clone(),
                source_line: line,
            });
        }
        let node = self.ensure_node(&tok.id);
        node.occurrences += 1;
        if let Some(tag) = &tok.class_tag {
            if !node.classes.contains(tag) {
                node.classes.push(tag.clone());
            }
        }

        if tok.shape.is_some() {
            // Explicit declaration. The first one is canonical; later
            // redeclarations never demote it.
            if node.decl_span.is_none() {
                node.shape = tok.shape.clone().unwrap_or(NodeShape::Rect);
                node.shape_open = tok.shape_open.map(str::to_string);
                node.shape_close = tok.shape_close.map(str::to_string);
                if let Some(label) = &tok.label {
                    if !label.is_empty() {
                        node.label = label.clone();
                    }
                }
                node.source_line = Some(line);
                node.decl_span = Some(LineSpan {
                    line,
                    start: tok.span.start,
                    end: tok.span.end,
                });
            }
        } else if node.ref_span.is_none() {
            node.ref_span = Some(LineSpan {
                line,
                start: tok.span.start,
                end: tok.span.end,
            });
        }
    }

    fn apply_annotation(&mut self, id: &str, props: Vec<(String, String)>, line: usize) {
        let node = self.ensure_node(id);
        for (key, value) in props {
            match key.as_str() {
                "shape" => {
                    node.shape = super::lexical::shape_from_name(&value);
                    node.shape_open = None;
                    node.shape_close = None;
                }
                "label" => node.label = value,
                _ => {}
            }
        }
        node.annotation_line = Some(line);
    }

    fn push_edge(&mut self, source: &str, target: &str, arrow: &ArrowToken, line: usize) {
        let (source, target) = if arrow.points_left {
            (target, source)
        } else {
            (source, target)
        };
        self.model.edges.push(FlowEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: arrow.label.clone(),
            arrow: arrow.kind,
            minlen: arrow.minlen,
            source_line: line,
        });
    }

    /// Tokenizes a statement slice and folds node/arrow/`&` runs into edges.
    fn statement(&mut self, raw: &str, from: usize, line: usize) {
        let mut tokens = lexer::tokenize_line(&raw[from..]);
        if from > 0 {
            for tok in &mut tokens {
                match tok {
                    Token::Node(n) => n.span = n.span.start + from..n.span.end + from,
                    Token::Arrow(a) => a.span = a.span.start + from..a.span.end + from,
                    Token::Ampersand(s) => *s = s.start + from..s.end + from,
                }
            }
        }

        let mut lhs: Vec<String> = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut pending: Option<ArrowToken> = None;
        let mut last_amp = false;

        for tok in &tokens {
            match tok {
                Token::Ampersand(_) => last_amp = true,
                Token::Arrow(arrow) => {
                    lhs = std::mem::take(&mut current);
                    pending = Some(arrow.clone());
                    last_amp = false;
                }
                Token::Node(n) => {
                    self.register(n, line);
                    if current.is_empty() || last_amp {
                        current.push(n.id.clone());
                        if let Some(arrow) = &pending {
                            for source in &lhs {
                                self.push_edge(source, &n.id, arrow, line);
                            }
                        }
                    } else {
                        // Two node groups with no connector: a new statement
                        // begins on the same line.
                        lhs.clear();
                        pending = None;
                        current = vec![n.id.clone()];
                    }
                    last_amp = false;
                }
            }
        }
    }
}

pub(crate) fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    match rest.chars().next() {
        None => Some(""),
        Some(c) if c.is_whitespace() => Some(rest.trim_start()),
        _ => None,
    }
}

pub(crate) fn normalize_direction(token: &str) -> Option<String> {
    match token.to_ascii_uppercase().as_str() {
        "TD" | "TB" => Some("TB".to_string()),
        "BT" => Some("BT".to_string()),
        "LR" => Some("LR".to_string()),
        "RL" => Some("RL".to_string()),
        _ => None,
    }
}

/// Reads the direction token off a header remainder, returning the
/// direction and how many bytes were consumed.
fn scan_direction(rest: &str) -> (Option<String>, usize) {
    let token: String = rest
        .chars()
        .take_while(|c| !c.is_whitespace() && *c != ';')
        .collect();
    match normalize_direction(&token) {
        Some(dir) => (Some(dir), token.len()),
        None => (None, 0),
    }
}

/// `subgraph id`, `subgraph id [Title]`, `subgraph "Title"`.
fn parse_subgraph_header(rest: &str) -> (String, String) {
    let rest = rest.trim().trim_end_matches(';').trim_end();
    if rest.starts_with('"') || rest.starts_with('\'') {
        if let Some((title, _)) = lexer::scan_quoted(rest, 0) {
            return (title.clone(), title);
        }
    }

    let id_end = rest
        .char_indices()
        .find(|(_, c)| c.is_whitespace() || *c == '[')
        .map(|(off, _)| off)
        .unwrap_or(rest.len());
    let id = rest[..id_end].to_string();
    let tail = rest[id_end..].trim();

    if let Some(inner) = tail.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        let inner = inner.trim();
        let label = if inner.starts_with('"') || inner.starts_with('\'') {
            lexer::scan_quoted(inner, 0)
                .map(|(t, _)| t)
                .unwrap_or_else(|| inner.to_string())
        } else {
            inner.to_string()
        };
        return (id, label);
    }
    if !tail.is_empty() {
        return (id, tail.to_string());
    }
    (id.clone(), id)
}

/// `id@{ shape: rounded, label: "Hi" }`.
fn parse_annotation(line: &str) -> Option<(String, Vec<(String, String)>)> {
    let (id, end) = lexer::scan_ident(line, 0)?;
    let rest = line[end..].trim_start();
    let body = rest.strip_prefix("@{")?;
    let body = &body[..body.rfind('}')?];

    let mut props = Vec::new();
    for pair in split_unquoted(body, ',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim();
        let value = if value.starts_with('"') || value.starts_with('\'') {
            lexer::scan_quoted(value, 0)
                .map(|(t, _)| t)
                .unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };
        props.push((key, value));
    }
    Some((id, props))
}

fn split_unquoted(s: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    for c in s.chars() {
        match quote {
            Some(q) => {
                cur.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                cur.push(c);
                quote = Some(c);
            }
            None if c == sep => {
                parts.push(std::mem::take(&mut cur));
            }
            None => cur.push(c),
        }
    }
    if !cur.trim().is_empty() {
        parts.push(cur);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "flowchart TD\n    A[Start] --> B{Decide}\n    B -->|yes| C([Ship])\n    B -->|no| D\n";

    #[test]
    fn parses_nodes_edges_and_direction() {
        let model = parse_flowchart(BASIC);
        assert_eq!(model.direction.as_deref(), Some("TB"));
        assert_eq!(model.nodes.len(), 4);
        assert_eq!(model.edges.len(), 3);
        let b = model.node("B").unwrap();
        assert_eq!(b.shape, NodeShape::Diamond);
        assert_eq!(b.label, "Decide");
        assert_eq!(b.source_line, Some(1));
        let edge = model.edge("B", "C").unwrap();
        assert_eq!(edge.label.as_deref(), Some("yes"));
    }

    #[test]
    fn virtual_node_defaults_to_rect_with_id_label() {
        let model = parse_flowchart(BASIC);
        let d = model.node("D").unwrap();
        assert_eq!(d.shape, NodeShape::Rect);
        assert_eq!(d.label, "D");
        assert_eq!(d.source_line, None);
    }

    #[test]
    fn header_line_statements_are_parsed() {
        let model = parse_flowchart("graph LR;A-->B;\n");
        assert_eq!(model.direction.as_deref(), Some("LR"));
        assert_eq!(model.edges.len(), 1);
        assert_eq!(model.edges[0].source_line, 0);
    }

    #[test]
    fn fan_out_and_fan_in_with_ampersand() {
        let model = parse_flowchart("flowchart LR\n    A & B --> C & D\n");
        let pairs: Vec<(&str, &str)> = model
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "C"), ("B", "C"), ("A", "D"), ("B", "D")]);
    }

    #[test]
    fn open_link_before_pointed_link_stays_two_edges() {
        let model = parse_flowchart("flowchart LR\n    A --- B --> C\n");
        let edges: Vec<(&str, &str, Option<&str>)> = model
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.label.as_deref()))
            .collect();
        assert_eq!(edges, vec![("A", "B", None), ("B", "C", None)]);
    }

    #[test]
    fn chained_statement_produces_consecutive_edges() {
        let model = parse_flowchart("flowchart LR\n    A --> B --> C\n");
        assert_eq!(model.edges.len(), 2);
        assert_eq!(model.edges[1].source, "B");
        assert_eq!(model.edges[1].target, "C");
    }

    #[test]
    fn left_pointing_arrow_swaps_endpoints() {
        let model = parse_flowchart("flowchart LR\n    A <-- B\n");
        assert_eq!(model.edges[0].source, "B");
        assert_eq!(model.edges[0].target, "A");
    }

    #[test]
    fn first_declaration_wins_over_redeclaration() {
        let model = parse_flowchart("flowchart TD\n    A[First]\n    A(Second)\n");
        let a = model.node("A").unwrap();
        assert_eq!(a.shape, NodeShape::Rect);
        assert_eq!(a.label, "First");
        assert_eq!(a.source_line, Some(1));
    }

    #[test]
    fn subgraphs_nest_and_track_body_ranges() {
        let code = "flowchart TD\n    subgraph outer [Outer Title]\n        subgraph inner\n            A --> B\n        end\n        C\n    end\n    D\n";
        let model = parse_flowchart(code);
        let outer = model.subgraph("outer").unwrap();
        assert_eq!(outer.label, "Outer Title");
        assert_eq!((outer.start_line, outer.end_line), (2, Some(6)));
        let inner = model.subgraph("inner").unwrap();
        assert_eq!((inner.start_line, inner.end_line), (3, Some(4)));
        assert_eq!(find_node_subgraph(code, "A").as_deref(), Some("inner"));
        assert_eq!(find_node_subgraph(code, "C").as_deref(), Some("outer"));
        assert_eq!(find_node_subgraph(code, "D"), None);
    }

    #[test]
    fn unclosed_subgraph_is_reported_and_skipped_for_containment() {
        let code = "flowchart TD\n    subgraph grp\n    A --> B\n";
        let model = parse_flowchart(code);
        assert_eq!(model.unclosed_subgraphs, vec!["grp".to_string()]);
        assert_eq!(find_node_subgraph(code, "A"), None);
    }

    #[test]
    fn subgraph_direction_stays_local() {
        let model =
            parse_flowchart("flowchart TD\n    subgraph g\n    direction LR\n    A\n    end\n");
        assert_eq!(model.direction.as_deref(), Some("TB"));
        assert_eq!(model.subgraph("g").unwrap().direction.as_deref(), Some("LR"));
    }

    #[test]
    fn class_defs_and_assignments() {
        let code = "flowchart TD\n    A:::hot --> B\n    classDef hot fill:#f96,stroke:#333\n    class B,C cold\n";
        let model = parse_flowchart(code);
        assert_eq!(
            model.class_defs.get("hot"),
            Some(&vec!["fill:#f96".to_string(), "stroke:#333".to_string()])
        );
        assert!(model.node("A").unwrap().classes.contains(&"hot".to_string()));
        let cold: Vec<&str> = model
            .class_assignments
            .iter()
            .filter(|a| a.class_name == "cold")
            .map(|a| a.target.as_str())
            .collect();
        assert_eq!(cold, vec!["B", "C"]);
    }

    #[test]
    fn annotation_overrides_shape_and_label() {
        let code = "flowchart TD\n    A[Start] --> B\n    A@{ shape: cloud, label: \"Up high\" }\n";
        let model = parse_flowchart(code);
        let a = model.node("A").unwrap();
        assert_eq!(a.shape, NodeShape::Named("cloud".to_string()));
        assert_eq!(a.label, "Up high");
        assert!(a.shape_open.is_none());
        assert_eq!(a.annotation_line, Some(2));
    }

    #[test]
    fn comments_and_unknown_lines_are_skipped() {
        let code = "flowchart TD\n%% note to self\n    A --> B\n    ??? not a statement\n";
        let model = parse_flowchart(code);
        assert_eq!(model.edges.len(), 1);
        assert!(model.node("note").is_none());
    }

    #[test]
    fn quoted_subgraph_title_is_id_and_label() {
        let model = parse_flowchart("flowchart TD\n    subgraph \"My Group\"\n    A\n    end\n");
        let g = model.subgraph("My Group").unwrap();
        assert_eq!(g.label, "My Group");
    }
}
