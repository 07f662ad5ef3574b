//! `sequenceDiagram` adapter. Participant declarations (with `as` aliases)
//! and the message arrow family.

use super::{append_line, remove_lines, GraphLink, GraphModel};
use regex::Regex;
use std::sync::OnceLock;

fn message_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // arrow alternatives ordered longest-first; optional +/- activation
        Regex::new(r"^(\w+)\s*(-->>|->>|-->|->|--[x)]|-[x)])\s*[+-]?\s*(\w+)\s*:\s*(.*)$")
            .expect("static sequence message regex")
    })
}

fn participant_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:participant|actor)\s+(\w+)(?:\s+as\s+(.+))?$")
            .expect("static participant regex")
    })
}

pub fn parse(text: &str) -> GraphModel {
    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("sequenceDiagram");

    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("%%") || line.starts_with("sequenceDiagram") {
            continue;
        }

        if let Some(caps) = participant_re().captures(line) {
            let label = caps.get(2).map(|m| m.as_str().trim());
            model.touch_node(&caps[1], label, Some(idx));
            continue;
        }
        if let Some(caps) = message_re().captures(line) {
            let (source, target) = (&caps[1], &caps[3]);
            model.touch_node(source, None, None);
            model.touch_node(target, None, None);
            let text = caps[4].trim();
            model.edges.push(GraphLink {
                source: source.to_string(),
                target: target.to_string(),
                label: (!text.is_empty()).then(|| text.to_string()),
                line: idx,
            });
        }
        // alt/opt/loop/par blocks and notes pass through
    }
    model
}

pub fn add_node(code: &str, id: &str, label: &str) -> String {
    if parse(code).node(id).is_some() {
        return code.to_string();
    }
    let decl = if label.is_empty() || label == id {
        format!("    participant {id}")
    } else {
        format!("    participant {id} as {label}")
    };
    append_line(code, &decl)
}

pub fn remove_node(code: &str, id: &str) -> String {
    let model = parse(code);
    if model.node(id).is_none() {
        return code.to_string();
    }

    let mut drop: Vec<usize> = Vec::new();
    for (idx, raw) in code.lines().enumerate() {
        let line = raw.trim();
        if participant_re().captures(line).is_some_and(|c| &c[1] == id) {
            drop.push(idx);
            continue;
        }
        if let Some(caps) = message_re().captures(line) {
            if &caps[1] == id || &caps[3] == id {
                drop.push(idx);
            }
        }
    }
    remove_lines(code, |idx, _| drop.contains(&idx))
}

pub fn add_edge(code: &str, source: &str, target: &str, label: Option<&str>) -> String {
    if parse(code).edge(source, target).is_some() {
        return code.to_string();
    }
    let stmt = format!("    {source}->>{target}: {}", label.unwrap_or(""));
    append_line(code, stmt.trim_end())
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

    const DIAGRAM: &str = "sequenceDiagram\n    participant A as Alice\n    actor B\n    A->>+B: hello\n    B-->>-A: hi\n    A-x B: bye\n";

    #[test]
    fn parses_participants_aliases_and_messages() {
        let model = parse(DIAGRAM);
        assert_eq!(model.node("A").unwrap().label, "Alice");
        assert_eq!(model.node("B").unwrap().label, "B");
        assert_eq!(model.edges.len(), 3);
        assert_eq!(model.edge("A", "B").unwrap().label.as_deref(), Some("hello"));
        assert!(model.edge("B", "A").is_some());
    }

    #[test]
    fn cross_and_async_arrows_match() {
        let model = parse("sequenceDiagram\n    A--)B: done\n    B--x A: lost\n");
        assert_eq!(model.edges.len(), 2);
    }

    #[test]
    fn remove_participant_takes_messages() {
        let out = remove_node(DIAGRAM, "B");
        assert!(!out.contains('B'));
        assert!(out.contains("participant A as Alice"));
    }

    #[test]
    fn add_edge_spells_a_solid_async_message() {
        let out = add_edge(DIAGRAM, "B", "B", Some("think"));
        assert!(out.contains("B->>B: think"));
    }
}
