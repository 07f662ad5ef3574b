//! `classDiagram` adapter. Class declarations (member blocks are opaque)
//! and the classic relation glyphs.

use super::{append_line, remove_lines, GraphLink, GraphModel};
use regex::Regex;
use std::sync::OnceLock;

fn relation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Glyph alternatives are ordered longest-first; cardinality strings
        // on either side are tolerated and ignored.
        Regex::new(
            r#"^(\w+)(?:\s+"[^"]*")?\s*(<\|--|<\|\.\.|\.\.\|>|--\|>|\*--|--\*|o--|--o|<--|-->|<\.\.|\.\.>|--|\.\.)\s*(?:"[^"]*"\s+)?(\w+)\s*(?::\s*(.+))?$"#,
        )
        .expect("static class relation regex")
    })
}

fn class_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^class\s+(\w+)(?:~[^~]*~)?(?:\["([^"]*)"\])?\s*(\{)?\s*$"#)
            .expect("static class decl regex")
    })
}

pub fn parse(text: &str) -> GraphModel {
    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("classDiagram");
    let mut in_block = false;

    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if in_block {
            if line == "}" {
                in_block = false;
            }
            continue;
        }
        if line.is_empty()
            || line.starts_with("%%")
            || line.starts_with("classDiagram")
            || line.starts_with("direction")
            || line.starts_with("note")
        {
            continue;
        }

        if let Some(caps) = class_decl_re().captures(line) {
            let id = &caps[1];
            let label = caps.get(2).map(|m| m.as_str());
            model.touch_node(id, label, Some(idx));
            in_block = caps.get(3).is_some();
            continue;
        }
        if let Some(caps) = relation_re().captures(line) {
            let (source, target) = (&caps[1], &caps[3]);
            model.touch_node(source, None, None);
            model.touch_node(target, None, None);
            model.edges.push(GraphLink {
                source: source.to_string(),
                target: target.to_string(),
                label: caps.get(4).map(|m| m.as_str().trim().to_string()),
                line: idx,
            });
        }
    }
    model
}

pub fn add_node(code: &str, id: &str, label: &str) -> String {
    if parse(code).node(id).is_some() {
        return code.to_string();
    }
    let decl = if label.is_empty() || label == id {
        format!("    class {id}")
    } else {
        format!("    class {id}[\"{label}\"]")
    };
    append_line(code, &decl)
}

/// Removes the class declaration (with its member block) and every relation
/// touching the class.
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
        if let Some(caps) = class_decl_re().captures(line) {
            if &caps[1] == id {
                drop.push(idx);
                block_of_target = caps.get(3).is_some();
            }
            continue;
        }
        if let Some(caps) = relation_re().captures(line) {
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
    let stmt = match label {
        Some(label) => format!("    {source} --> {target} : {label}"),
        None => format!("    {source} --> {target}"),
    };
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
