//! Parse-only adapters for the simpler dialects. These expose no structural
//! mutation; [`super::append_line`] is their only textual edit.

use super::{GraphLink, GraphModel};
use regex::Regex;
use std::sync::OnceLock;

fn skip(line: &str) -> bool {
    line.is_empty() || line.starts_with("%%")
}

/// `pie` slices: `"Label" : 42.5`.
pub fn parse_pie(text: &str) -> GraphModel {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"^"([^"]+)"\s*:\s*([0-9.]+)\s*$"#).expect("static pie slice regex")
    });

    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("pie");
    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if skip(line) {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            model.touch_node(&caps[1], Some(&format!("{}: {}", &caps[1], &caps[2])), Some(idx));
        }
    }
    model
}

/// Mindmap outline: indentation depth decides the parent.
pub fn parse_mindmap(text: &str) -> GraphModel {
    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("mindmap");
    // (indent, id) path from the root to the current node
    let mut stack: Vec<(usize, String)> = Vec::new();

    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if skip(line) || line == "mindmap" {
            continue;
        }
        let indent = raw.len() - raw.trim_start().len();
        let label = strip_mindmap_shape(line);
        let id = label.clone();

        while stack.last().is_some_and(|(d, _)| *d >= indent) {
            stack.pop();
        }
        model.touch_node(&id, Some(&label), Some(idx));
        if let Some((_, parent)) = stack.last() {
            model.edges.push(GraphLink {
                source: parent.clone(),
                target: id.clone(),
                label: None,
                line: idx,
            });
        }
        stack.push((indent, id));
    }
    model
}

/// Unwraps mindmap shape markers like `((root))`, `(round)` or `[square]`.
fn strip_mindmap_shape(line: &str) -> String {
    let pairs = [("((", "))"), ("))", "(("), ("(", ")"), ("[", "]"), ("{{", "}}")];
    for (open, close) in pairs {
        if let Some(inner) = line
            .strip_prefix(open)
            .and_then(|r| r.strip_suffix(close))
        {
            return inner.trim().to_string();
        }
    }
    line.to_string()
}

/// Timeline periods and their events: `2024 : event a : event b`.
pub fn parse_timeline(text: &str) -> GraphModel {
    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("timeline");
    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if skip(line)
            || line == "timeline"
            || line.starts_with("title")
            || line.starts_with("section")
        {
            continue;
        }
        let mut parts = line.split(':').map(str::trim);
        let Some(period) = parts.next().filter(|p| !p.is_empty()) else {
            continue;
        };
        model.touch_node(period, None, Some(idx));
        for event in parts.filter(|e| !e.is_empty()) {
            model.touch_node(event, None, Some(idx));
            model.edges.push(GraphLink {
                source: period.to_string(),
                target: event.to_string(),
                label: None,
                line: idx,
            });
        }
    }
    model
}

/// C4 element macros (`Person(...)`, `System(...)`, ...) and `Rel(...)`.
pub fn parse_c4(text: &str) -> GraphModel {
    static ELEMENT: OnceLock<Regex> = OnceLock::new();
    static REL: OnceLock<Regex> = OnceLock::new();
    let element = ELEMENT.get_or_init(|| {
        Regex::new(
            r#"^(?:Person|System|Container|Component)(?:Db|Queue)?(?:_Ext)?\s*\(\s*([A-Za-z0-9_.]+)\s*,\s*"([^"]*)""#,
        )
        .expect("static c4 element regex")
    });
    let rel = REL.get_or_init(|| {
        Regex::new(
            r#"^(?:Bi)?Rel(?:_[A-Za-z]+)?\s*\(\s*([A-Za-z0-9_.]+)\s*,\s*([A-Za-z0-9_.]+)\s*,\s*"([^"]*)""#,
        )
        .expect("static c4 rel regex")
    });

    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("c4");
    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if skip(line) {
            continue;
        }
        if let Some(caps) = element.captures(line) {
            model.touch_node(&caps[1], Some(&caps[2]), Some(idx));
            continue;
        }
        if let Some(caps) = rel.captures(line) {
            model.touch_node(&caps[1], None, None);
            model.touch_node(&caps[2], None, None);
            model.edges.push(GraphLink {
                source: caps[1].to_string(),
                target: caps[2].to_string(),
                label: Some(caps[3].to_string()),
                line: idx,
            });
        }
    }
    model
}

/// gitGraph commits, branches and merges. Commits without an explicit id
/// get a positional one; a merge links the merged branch to the current one.
pub fn parse_git_graph(text: &str) -> GraphModel {
    static COMMIT_ID: OnceLock<Regex> = OnceLock::new();
    let commit_id = COMMIT_ID.get_or_init(|| {
        Regex::new(r#"id:\s*"([^"]*)""#).expect("static commit id regex")
    });

    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("gitGraph");
    let mut current = "main".to_string();
    let mut counter = 0usize;
    model.touch_node("main", None, None);

    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if skip(line) || line.starts_with("gitGraph") {
            continue;
        }
        if let Some(rest) = line.strip_prefix("branch ") {
            if let Some(name) = rest.split_whitespace().next() {
                model.touch_node(name, None, Some(idx));
                model.edges.push(GraphLink {
                    source: current.clone(),
                    target: name.to_string(),
                    label: Some("branch".to_string()),
                    line: idx,
                });
                current = name.to_string();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("checkout ") {
            if let Some(name) = rest.split_whitespace().next() {
                current = name.to_string();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("merge ") {
            if let Some(name) = rest.split_whitespace().next() {
                model.edges.push(GraphLink {
                    source: name.to_string(),
                    target: current.clone(),
                    label: Some("merge".to_string()),
                    line: idx,
                });
            }
            continue;
        }
        if line.starts_with("commit") {
            let id = commit_id
                .captures(line)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| {
                    counter += 1;
                    format!("{current}-{counter}")
                });
            model.touch_node(&id, None, Some(idx));
        }
    }
    model
}

/// Quadrant chart points: `Name: [0.3, 0.6]`.
pub fn parse_quadrant(text: &str) -> GraphModel {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(.+?):\s*\[\s*([0-9.]+)\s*,\s*([0-9.]+)\s*\]$")
            .expect("static quadrant point regex")
    });

    let fm = crate::frontmatter::scan(text);
    let mut model = GraphModel::new("quadrantChart");
    for (idx, raw) in text.lines().enumerate().skip(fm.lines) {
        let line = raw.trim();
        if skip(line)
            || line.starts_with("quadrantChart")
            || line.starts_with("title")
            || line.starts_with("x-axis")
            || line.starts_with("y-axis")
            || line.starts_with("quadrant-")
        {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            let name = caps[1].trim();
            model.touch_node(
                name,
                Some(&format!("{name} [{}, {}]", &caps[2], &caps[3])),
                Some(idx),
            );
        }
    }
    model
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pie_slices_become_nodes() {
        let model = parse_pie("pie\n    title Pets\n    \"Dogs\" : 42\n    \"Cats\" : 17\n");
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.node("Dogs").unwrap().label, "Dogs: 42");
    }

    #[test]
    fn mindmap_indentation_builds_the_tree() {
        let text = "mindmap\n  ((Root))\n    A\n      A1\n    B\n";
        let model = parse_mindmap(text);
        assert!(model.edge("Root", "A").is_some());
        assert!(model.edge("A", "A1").is_some());
        assert!(model.edge("Root", "B").is_some());
        assert!(model.edge("A", "B").is_none());
    }

    #[test]
    fn timeline_links_periods_to_events() {
        let text = "timeline\n    title History\n    2023 : shipped : iterated\n    2024 : scaled\n";
        let model = parse_timeline(text);
        assert!(model.edge("2023", "shipped").is_some());
        assert!(model.edge("2023", "iterated").is_some());
        assert!(model.edge("2024", "scaled").is_some());
    }

    #[test]
    fn c4_elements_and_rels() {
        let text = "C4Context\n    Person(user, \"Customer\")\n    System(shop, \"Web shop\")\n    Rel(user, shop, \"buys from\")\n";
        let model = parse_c4(text);
        assert_eq!(model.node("user").unwrap().label, "Customer");
        assert_eq!(
            model.edge("user", "shop").unwrap().label.as_deref(),
            Some("buys from")
        );
    }

    #[test]
    fn git_graph_branches_and_merges() {
        let text = "gitGraph\n    commit\n    branch dev\n    commit id: \"feature\"\n    checkout main\n    merge dev\n";
        let model = parse_git_graph(text);
        assert!(model.node("feature").is_some());
        let merge = model.edge("dev", "main").unwrap();
        assert_eq!(merge.label.as_deref(), Some("merge"));
    }

    #[test]
    fn quadrant_points_become_nodes() {
        let text = "quadrantChart\n    x-axis Low --> High\n    Campaign A: [0.3, 0.6]\n";
        let model = parse_quadrant(text);
        assert!(model.node("Campaign A").is_some());
    }
}
