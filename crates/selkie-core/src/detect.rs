//! Diagram dialect detection.
//!
//! An ordered list of regex detectors runs over the text with front-matter
//! and `%%` comments stripped. Order is significant: `stateDiagram-v2` must
//! win before the plain `stateDiagram` prefix, and `flowchart`/`graph` are
//! tried late because several dialect headers embed those words.

use crate::dialects::Dialect;
use regex::Regex;
use std::sync::OnceLock;

struct Detector {
    dialect: Dialect,
    pattern: Regex,
}

fn detectors() -> &'static [Detector] {
    static DETECTORS: OnceLock<Vec<Detector>> = OnceLock::new();
    DETECTORS.get_or_init(|| {
        let det = |dialect: Dialect, pat: &str| Detector {
            dialect,
            pattern: Regex::new(pat).expect("static detector regex"),
        };
        vec![
            det(Dialect::C4, r"^\s*C4(Context|Container|Component|Dynamic|Deployment)"),
            det(Dialect::Class, r"^\s*classDiagram"),
            det(Dialect::Er, r"^\s*erDiagram"),
            det(Dialect::Gantt, r"^\s*gantt"),
            det(Dialect::Pie, r"^\s*pie"),
            det(Dialect::Sequence, r"^\s*sequenceDiagram"),
            det(Dialect::Mindmap, r"^\s*mindmap"),
            det(Dialect::Timeline, r"^\s*timeline"),
            det(Dialect::GitGraph, r"^\s*gitGraph"),
            det(Dialect::State, r"^\s*stateDiagram(-v2)?"),
            det(Dialect::Quadrant, r"^\s*quadrantChart"),
            det(Dialect::Flowchart, r"^\s*(flowchart|graph)"),
        ]
    })
}

fn comment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*%%.*$").expect("static comment regex"))
}

/// Classifies the text into a [`Dialect`]. Total: text matching no detector
/// maps to [`Dialect::Unsupported`], never an error.
pub fn detect_dialect(text: &str) -> Dialect {
    let fm = crate::frontmatter::scan(text);
    let body: String = text
        .lines()
        .skip(fm.lines)
        .collect::<Vec<_>>()
        .join("\n");
    let cleaned = comment_re().replace_all(&body, "");
    let cleaned = cleaned.trim_start();

    for det in detectors() {
        if det.pattern.is_match(cleaned) {
            return det.dialect;
        }
    }
    Dialect::Unsupported
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_behind_frontmatter_and_comments() {
        let text = "---\ntitle: x\n---\n%% a comment\ngantt\n  title y\n";
        assert_eq!(detect_dialect(text), Dialect::Gantt);
    }

    #[test]
    fn state_v2_and_state_both_map_to_state() {
        assert_eq!(detect_dialect("stateDiagram-v2\n"), Dialect::State);
        assert_eq!(detect_dialect("stateDiagram\n"), Dialect::State);
    }

    #[test]
    fn unknown_text_is_unsupported() {
        assert_eq!(detect_dialect("hello world\n"), Dialect::Unsupported);
    }
}
