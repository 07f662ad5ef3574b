//! `stateDiagram` / `stateDiagram-v2` adapter. `[*]` pseudo-states map to
//! the synthetic ids [`START`] and [`END`].

use super::{append_line, remove_lines, GraphLink, GraphModel};
use regex::Regex;
use std::sync::OnceLock;

/// Synthetic id for the `[*]` initial pseudo-state.
pub const START: &str = "__start__";
/// Synthetic id for the `[*]` final pseudo-state.
pub const END: &str = "__end__";

fn transition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\[\*\]|\w+)\s*-->\s*(\[\*\]|\w+)\s*(?::\s*(.+))?$")
            .expect("static state transition regex")
    })
}

fn decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^state\s+(?:"([^"]*)"\s+as\s+)?(\w+)\s*(\{)?\s*$"#)
            .expect("static state decl regex")
    })
}

fn bare_state_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\w+)$").expect("static bare state regex"))
}

fn endpoint(token: &str, synthetic: &str) -> String {
    if token == "[*]" {
        synthetic.to_string()
    } else {
        token.to_string()
    }
}

fn spelled(id: &str) -> String {
    if id == START || id == END {
        "[*]".to_string()
    } else {
        id.to_string()
    }
}

pub fn parse(text: &str) -> GraphModel {
    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("stateDiagram");
    let mut in_note = false;

    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if in_note {
            if line == "end note" {
                in_note = false;
            }
            continue;
        }
        if line.is_empty()
            || line.starts_with("%%")
            || line.starts_with("stateDiagram")
            || line.starts_with("direction")
            || line == "}"
            || line == "--"
        {
            continue;
        }
        if line.starts_with("note ") {
            // single-line notes carry a colon; block notes run to `end note`
            in_note = !line.contains(':');
            continue;
        }

        if let Some(caps) = transition_re().captures(line) {
            let source = endpoint(&caps[1], START);
            let target = endpoint(&caps[2], END);
            model.touch_node(&source, None, None);
            model.touch_node(&target, None, None);
            model.edges.push(GraphLink {
                source,
                target,
                label: caps.get(3).map(|m| m.as_str().trim().to_string()),
                line: idx,
            });
            continue;
        }
        if let Some(caps) = decl_re().captures(line) {
            let label = caps.get(1).map(|m| m.as_str());
            model.touch_node(&caps[2], label, Some(idx));
            // composite blocks keep scanning; inner transitions are real
            continue;
        }
        if let Some(caps) = bare_state_re().captures(line) {
            model.touch_node(&caps[1], None, Some(idx));
        }
    }
    model
}

pub fn add_node(code: &str, id: &str, label: &str) -> String {
    if id == START || id == END || parse(code).node(id).is_some() {
        return code.to_string();
    }
    let decl = if label.is_empty() || label == id {
        format!("    {id}")
    } else {
        format!("    state \"{label}\" as {id}")
    };
    append_line(code, &decl)
}

/// Removes the state's declaration (with any composite block) and every
/// transition touching it. The `[*]` pseudo-states have no declaration and
/// cannot be removed.
pub fn remove_node(code: &str, id: &str) -> String {
    if id == START || id == END {
        return code.to_string();
    }
    let model = parse(code);
    if model.node(id).is_none() {
        return code.to_string();
    }

    let mut drop: Vec<usize> = Vec::new();
    let mut block_depth = 0usize;
    for (idx, raw) in code.lines().enumerate() {
        let line = raw.trim();
        if block_depth > 0 {
            drop.push(idx);
            if line.ends_with('{') {
                block_depth += 1;
            } else if line == "}" {
                block_depth -= 1;
            }
            continue;
        }
        if let Some(caps) = transition_re().captures(line) {
            if &caps[1] == id || &caps[2] == id {
                drop.push(idx);
            }
            continue;
        }
        if let Some(caps) = decl_re().captures(line) {
            if &caps[2] == id {
                drop.push(idx);
                if caps.get(3).is_some() {
                    block_depth = 1;
                }
            }
            continue;
        }
        if bare_state_re().captures(line).is_some_and(|c| &c[1] == id) {
            drop.push(idx);
        }
    }
    remove_lines(code, |idx, _| drop.contains(&idx))
}

pub fn add_edge(code: &str, source: &str, target: &str, label: Option<&str>) -> String {
    if parse(code).edge(source, target).is_some() {
        return code.to_string();
    }
    let stmt = match label {
        Some(label) => format!("    {} --> {} : {label}", spelled(source), spelled(target)),
        None => format!("    {} --> {}", spelled(source), spelled(target)),
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

#[cfg(test)]
mod tests {
    use super::*;

    const DIAGRAM: &str = "stateDiagram-v2\n    state \"Waiting for input\" as idle\n    [*] --> idle\n    idle --> busy : job\n    busy --> [*]\n";

    #[test]
    fn pseudo_states_map_to_synthetic_ids() {
        let model = parse(DIAGRAM);
        assert!(model.edge(START, "idle").is_some());
        assert!(model.edge("busy", END).is_some());
        assert_eq!(model.edge("idle", "busy").unwrap().label.as_deref(), Some("job"));
    }

    #[test]
    fn described_state_keeps_its_label() {
        let model = parse(DIAGRAM);
        let idle = model.node("idle").unwrap();
        assert_eq!(idle.label, "Waiting for input");
        assert_eq!(idle.line, Some(1));
    }

    #[test]
    fn remove_state_takes_transitions() {
        let out = remove_node(DIAGRAM, "idle");
        assert!(!out.contains("idle"));
        assert!(out.contains("busy --> [*]"));
    }

    #[test]
    fn synthetic_endpoints_spell_back_as_pseudo_states() {
        let out = add_edge(DIAGRAM, "idle", END, Some("abort"));
        assert!(out.contains("idle --> [*] : abort"));
        assert_eq!(remove_node(DIAGRAM, START), DIAGRAM);
    }

    #[test]
    fn composite_block_is_removed_with_its_state() {
        let code = "stateDiagram-v2\n    state outer {\n        a --> b\n    }\n    c --> d\n";
        let out = remove_node(code, "outer");
        assert!(!out.contains("outer"));
        assert!(!out.contains("a --> b"));
        assert!(out.contains("c --> d"));
    }
}
