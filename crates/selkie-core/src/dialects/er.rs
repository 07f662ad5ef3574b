//! `erDiagram` adapter. Entities (attribute blocks are opaque) and
//! cardinality relations like `CUSTOMER ||--o{ ORDER : places`.

use super::{append_line, remove_lines, GraphLink, GraphModel};
use regex::Regex;
use std::sync::OnceLock;

fn relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // left cardinality, solid or dashed connector, right cardinality
        Regex::new(
            r"^(\w+)\s*(\|\||\|o|\}o|\}\|)(--|\.\.)(\|\||o\||o\{|\|\{)\s*(\w+)\s*(?::\s*(.+))?$",
        )
        .expect("static er relation regex")
    })
}

fn entity_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)\s*(\{)?\s*$").expect("static er entity regex"))
}

pub fn parse(text: &str) -> GraphModel {
    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("erDiagram");
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if in_block {
            if line == "}" {
                in_block = false;
            }
            continue;
        }
        if line.is_empty() || line.starts_with("%%") || line.starts_with("erDiagram") {
            continue;
        }

        if let Some(caps) = relation_re().captures(line) {
            let (source, target) = (&caps[1], &caps[5]);
            model.touch_node(source, None, None);
            model.touch_node(target, None, None);
            model.edges.push(GraphLink {
                source: source.to_string(),
                target: target.to_string(),
                label: caps.get(6).map(|m| m.as_str().trim().to_string()),
                line: idx,
            });
            continue;
        }
        if let Some(caps) = entity_decl_re().captures(line) {
            model.touch_node(&caps[1], None, Some(idx));
            in_block = caps.get(2).is_some();
        }
    }
    model
}

pub fn add_node(code: &str, id: &str) -> String {
    if parse(code).node(id).is_some() {
        return code.to_string();
    }
    append_line(code, &format!("    {id}"))
}

pub fn remove_node(code: &str, id: &str) -> String {
    let model = parse(code);
    if model.node(id).is_none() {
        return code.to_string();
    }

    let mut drop: Vec<usize> = Vec::new();
    let mut block_of_target = false;
    for (idx, raw) in code.lines().enumerate() {
        let line = raw.trim();
        if block_of_target {
            drop.push(idx);
            if line == "}" {
                block_of_target = false;
            }
            continue;
        }
        if let Some(caps) = relation_re().captures(line) {
            if &caps[1] == id || &caps[5] == id {
                drop.push(idx);
            }
            continue;
        }
        if let Some(caps) = entity_decl_re().captures(line) {
            if &caps[1] == id {
                drop.push(idx);
                block_of_target = caps.get(2).is_some();
            }
        }
    }
    remove_lines(code, |idx, _| drop.contains(&idx))
}

pub fn add_edge(code: &str, source: &str, target: &str, label: Option<&str>) -> String {
    if parse(code).edge(source, target).is_some() {
        return code.to_string();
    }
    // "exactly one" to "zero or more" is the workable default pairing.
    let stmt = format!(
        "    {source} ||--o{{ {target} : {}",
        label.unwrap_or("relates")
    );
    append_line(code, &stmt)
}

pub fn remove_edge(code: &str, source: &str, target: &str) -> String {
    let model = parse(code);
    if model.edge(source, target).is_none() {
        return code.to_string();
    }
    let hit: Vec<usize> = model
        .edges
        .iter()
        .filter(|e| e.source == source && e.target == target)
        .map(|e| e.line)
        .collect();
    remove_lines(code, |idx, _| hit.contains(&idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGRAM: &str = "erDiagram\n    CUSTOMER ||--o{ ORDER : places\n    ORDER ||--|{ LINE_ITEM : contains\n    CUSTOMER {\n        string name\n        int id\n    }\n";

    #[test]
    fn parses_relations_and_entity_blocks() {
        let model = parse(DIAGRAM);
        assert_eq!(model.nodes.len(), 3);
        assert_eq!(model.node("CUSTOMER").unwrap().line, Some(3));
        assert!(model.node("string").is_none());
        assert_eq!(
            model.edge("CUSTOMER", "ORDER").unwrap().label.as_deref(),
            Some("places")
        );
    }

    #[test]
    fn dashed_connector_and_other_cardinalities_match() {
        let model = parse("erDiagram\n    A }o..|| B\n");
        assert!(model.edge("A", "B").is_some());
    }

    #[test]
    fn remove_entity_takes_relations_and_block() {
        let out = remove_node(DIAGRAM, "CUSTOMER");
        assert!(!out.contains("CUSTOMER"));
        assert!(!out.contains("string name"));
        assert!(out.contains("ORDER ||--|{ LINE_ITEM"));
    }

    #[test]
    fn add_then_remove_edge_round_trips() {
        let out = add_edge(DIAGRAM, "ORDER", "INVOICE", Some("billed as"));
        assert!(out.contains("ORDER ||--o{ INVOICE : billed as"));
        assert_eq!(remove_edge(&out, "ORDER", "INVOICE"), DIAGRAM);
    }
}
