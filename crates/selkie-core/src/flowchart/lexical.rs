//! Static lexical tables for flowchart shapes and arrows.
//!
//! Shape delimiter pairs are ordered longest-open-first so the tokenizer can
//! match greedily (`(((` must never be read as `((` + `(`). Several textual
//! spellings map onto one semantic kind; the reverse direction returns the
//! canonical pair. Shapes from the extended catalog have no bracket spelling
//! at all and are only reachable through `id@{ shape: ... }` annotation
//! lines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
    Rect,
    Rounded,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Asymmetric,
    Diamond,
    Hexagon,
    /// Parallelogram, `[/text/]`.
    LeanRight,
    /// Alt parallelogram, `[\text\]`.
    LeanLeft,
    /// Trapezoid, `[/text\]`.
    Trapezoid,
    /// Inverted trapezoid, `[\text/]`.
    TrapezoidAlt,
    /// Extended-catalog shape addressed by name via an annotation line.
    Named(String),
}

/// `(open, close, shape)` triples, ordered longest-open-first. An open
/// delimiter may pair with more than one close (`[/` closes as `/]` or
/// `\]`), so lookups go through [`shape_for_delims`].
pub(crate) const SHAPE_DELIMITERS: &[(&str, &str, NodeShape)] = &[
    ("(((", ")))", NodeShape::DoubleCircle),
    ("([", "])", NodeShape::Stadium),
    ("[[", "]]", NodeShape::Subroutine),
    ("[(", ")]", NodeShape::Cylinder),
    ("((", "))", NodeShape::Circle),
    ("[/", "/]", NodeShape::LeanRight),
    ("[/", "\\]", NodeShape::Trapezoid),
    ("[\\", "\\]", NodeShape::LeanLeft),
    ("[\\", "/]", NodeShape::TrapezoidAlt),
    ("{{", "}}", NodeShape::Hexagon),
    (">", "]", NodeShape::Asymmetric),
    ("[", "]", NodeShape::Rect),
    ("(", ")", NodeShape::Rounded),
    ("{", "}", NodeShape::Diamond),
];

/// Open delimiters in table order (longest first), deduplicated.
pub(crate) fn open_delimiters() -> impl Iterator<Item = &'static str> {
    let mut seen: Vec<&'static str> = Vec::new();
    SHAPE_DELIMITERS.iter().filter_map(move |(open, _, _)| {
        if seen.contains(open) {
            None
        } else {
            seen.push(open);
            Some(*open)
        }
    })
}

pub(crate) fn closes_for_open(open: &str) -> Vec<&'static str> {
    SHAPE_DELIMITERS
        .iter()
        .filter(|(o, _, _)| *o == open)
        .map(|(_, c, _)| *c)
        .collect()
}

pub fn shape_for_delims(open: &str, close: &str) -> Option<NodeShape> {
    SHAPE_DELIMITERS
        .iter()
        .find(|(o, c, _)| *o == open && *c == close)
        .map(|(_, _, s)| s.clone())
}

/// Canonical delimiter pair for a shape; `None` for `Named` shapes, which
/// are written via annotation lines instead.
pub fn delimiters_for(shape: &NodeShape) -> Option<(&'static str, &'static str)> {
    if matches!(shape, NodeShape::Named(_)) {
        return None;
    }
    SHAPE_DELIMITERS
        .iter()
        .find(|(_, _, s)| s == shape)
        .map(|(o, c, _)| (*o, *c))
}

/// Annotation shape-name aliases. Many-to-one: short aliases and full names
/// both resolve; names that correspond to a classic bracket shape resolve to
/// that kind, everything else to its canonical extended name.
const SHAPE_ALIASES: &[(&str, &str)] = &[
    ("rect", "rect"),
    ("rectangle", "rect"),
    ("proc", "rect"),
    ("process", "rect"),
    ("rounded", "rounded"),
    ("event", "rounded"),
    ("stadium", "stadium"),
    ("pill", "stadium"),
    ("terminal", "stadium"),
    ("circle", "circle"),
    ("circ", "circle"),
    ("dbl-circ", "double-circle"),
    ("double-circle", "double-circle"),
    ("diamond", "diamond"),
    ("diam", "diamond"),
    ("decision", "diamond"),
    ("question", "diamond"),
    ("hex", "hexagon"),
    ("hexagon", "hexagon"),
    ("prepare", "hexagon"),
    ("cyl", "cylinder"),
    ("cylinder", "cylinder"),
    ("db", "cylinder"),
    ("database", "cylinder"),
    ("subroutine", "subroutine"),
    ("subproc", "subroutine"),
    ("framed-rectangle", "subroutine"),
    ("lean-r", "lean-right"),
    ("lean-right", "lean-right"),
    ("in-out", "lean-right"),
    ("lean-l", "lean-left"),
    ("lean-left", "lean-left"),
    ("out-in", "lean-left"),
    ("trap-b", "trapezoid"),
    ("trapezoid", "trapezoid"),
    ("priority", "trapezoid"),
    ("trap-t", "trapezoid-alt"),
    ("inv-trapezoid", "trapezoid-alt"),
    ("manual", "trapezoid-alt"),
    ("odd", "odd"),
    // Extended catalog: no classic bracket spelling.
    ("card", "notch-rect"),
    ("notch-rect", "notch-rect"),
    ("notched-rectangle", "notch-rect"),
    ("hourglass", "hourglass"),
    ("collate", "hourglass"),
    ("bolt", "bolt"),
    ("com-link", "bolt"),
    ("lightning-bolt", "bolt"),
    ("brace", "brace"),
    ("comment", "brace"),
    ("doc", "doc"),
    ("document", "doc"),
    ("delay", "delay"),
    ("half-rounded-rectangle", "delay"),
    ("flag", "flag"),
    ("paper-tape", "flag"),
    ("fork", "fork"),
    ("join", "fork"),
    ("cloud", "cloud"),
    ("text", "text"),
    ("sm-circ", "small-circle"),
    ("small-circle", "small-circle"),
    ("start", "small-circle"),
    ("fr-circ", "framed-circle"),
    ("framed-circle", "framed-circle"),
    ("stop", "framed-circle"),
    ("docs", "stacked-document"),
    ("st-doc", "stacked-document"),
    ("stacked-document", "stacked-document"),
    ("lin-doc", "lined-document"),
    ("lined-document", "lined-document"),
    ("tri", "triangle"),
    ("triangle", "triangle"),
    ("extract", "triangle"),
    ("win-pane", "window-pane"),
    ("window-pane", "window-pane"),
    ("internal-storage", "window-pane"),
];

/// Resolves an annotation `shape:` name. Classic kinds come back as their
/// enum variant; catalog names come back as `Named(canonical)`. Unknown
/// names stay `Named(name)`: the catalog is open-ended.
pub fn shape_from_name(name: &str) -> NodeShape {
    let name = name.trim().to_ascii_lowercase();
    let canonical = SHAPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canon)| *canon)
        .unwrap_or(name.as_str());

    match canonical {
        "rect" => NodeShape::Rect,
        "rounded" => NodeShape::Rounded,
        "stadium" => NodeShape::Stadium,
        "circle" => NodeShape::Circle,
        "double-circle" => NodeShape::DoubleCircle,
        "diamond" => NodeShape::Diamond,
        "hexagon" => NodeShape::Hexagon,
        "cylinder" => NodeShape::Cylinder,
        "subroutine" => NodeShape::Subroutine,
        "lean-right" => NodeShape::LeanRight,
        "lean-left" => NodeShape::LeanLeft,
        "trapezoid" => NodeShape::Trapezoid,
        "trapezoid-alt" => NodeShape::TrapezoidAlt,
        "odd" => NodeShape::Asymmetric,
        other => NodeShape::Named(other.to_string()),
    }
}

/// Canonical annotation name for a shape, used when writing `id@{ shape: .. }`.
pub fn shape_name(shape: &NodeShape) -> String {
    match shape {
        NodeShape::Rect => "rect".to_string(),
        NodeShape::Rounded => "rounded".to_string(),
        NodeShape::Stadium => "stadium".to_string(),
        NodeShape::Subroutine => "subroutine".to_string(),
        NodeShape::Cylinder => "cylinder".to_string(),
        NodeShape::Circle => "circle".to_string(),
        NodeShape::DoubleCircle => "double-circle".to_string(),
        NodeShape::Asymmetric => "odd".to_string(),
        NodeShape::Diamond => "diamond".to_string(),
        NodeShape::Hexagon => "hexagon".to_string(),
        NodeShape::LeanRight => "lean-right".to_string(),
        NodeShape::LeanLeft => "lean-left".to_string(),
        NodeShape::Trapezoid => "trapezoid".to_string(),
        NodeShape::TrapezoidAlt => "trapezoid-alt".to_string(),
        NodeShape::Named(name) => name.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stroke {
    Solid,
    Dotted,
    Thick,
    Invisible,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArrowHead {
    None,
    Point,
    Circle,
    Cross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowKind {
    pub stroke: Stroke,
    pub head: ArrowHead,
    pub bidirectional: bool,
}

impl ArrowKind {
    pub fn solid_point() -> Self {
        Self {
            stroke: Stroke::Solid,
            head: ArrowHead::Point,
            bidirectional: false,
        }
    }
}

fn head_for(byte: u8) -> Option<ArrowHead> {
    match byte {
        b'>' | b'<' => Some(ArrowHead::Point),
        b'o' => Some(ArrowHead::Circle),
        b'x' => Some(ArrowHead::Cross),
        _ => None,
    }
}

/// Classifies a raw arrow glyph run into `(kind, minlen)`.
///
/// `minlen` is the run length in excess of the shortest recognized spelling
/// for that kind, plus one: `-->` is 1, `--->` is 2. A longer run is the
/// author asking for more layout separation, not noise.
pub fn classify_arrow(run: &str) -> Option<(ArrowKind, usize)> {
    let bytes = run.as_bytes();
    if bytes.len() < 2 {
        return None;
    }

    let mut start = 0;
    let mut end = bytes.len();

    let start_head = match bytes[0] {
        b'<' | b'o' | b'x' if bytes.len() > 1 && is_body_byte(bytes[1]) => {
            start = 1;
            head_for(bytes[0])
        }
        _ => None,
    };
    let end_head = match bytes[end - 1] {
        b'>' | b'o' | b'x' => {
            end -= 1;
            head_for(bytes[end])
        }
        _ => None,
    };

    if start >= end {
        return None;
    }
    let body = &run[start..end];
    if !body.bytes().all(is_body_byte) {
        return None;
    }

    let headed = start_head.is_some() || end_head.is_some();
    let dots = body.bytes().filter(|&b| b == b'.').count();
    let (stroke, minlen) = if dots > 0 {
        // Dotted bodies mix dashes and dots (`-.-`, `-..-`, and the `.-`
        // tail of an inline-labeled arrow); stretch is the dot count.
        if !body.bytes().all(|b| matches!(b, b'-' | b'.')) {
            return None;
        }
        headless_minlen(body.len(), headed)?;
        (Stroke::Dotted, dots)
    } else if body.bytes().all(|b| b == b'=') {
        (Stroke::Thick, headless_minlen(body.len(), headed)?)
    } else if body.bytes().all(|b| b == b'-') {
        (Stroke::Solid, headless_minlen(body.len(), headed)?)
    } else if body.bytes().all(|b| b == b'~') {
        if start_head.is_some() || end_head.is_some() {
            return None;
        }
        (Stroke::Invisible, headless_minlen(body.len(), false)?)
    } else {
        return None;
    };

    let (head, bidirectional) = match (start_head, end_head) {
        (Some(s), Some(e)) if s == e => (e, true),
        (Some(_), Some(_)) => return None,
        (None, Some(e)) => (e, false),
        // A lone start head (`<--`) is a pointed arrow read right-to-left;
        // the tokenizer swaps the endpoints, so classification only reports
        // the head kind.
        (Some(s), None) => (s, false),
        (None, None) => (ArrowHead::None, false),
    };

    Some((
        ArrowKind {
            stroke,
            head,
            bidirectional,
        },
        minlen,
    ))
}

fn is_body_byte(b: u8) -> bool {
    matches!(b, b'-' | b'=' | b'.' | b'~')
}

fn headless_minlen(body_len: usize, headed: bool) -> Option<usize> {
    // Headed links need a 2-glyph body (`-->`), open links a 3-glyph body
    // (`---`). Anything shorter is not an arrow.
    let min = if headed { 2 } else { 3 };
    if body_len < min {
        return None;
    }
    Some(body_len - min + 1)
}

/// Whether the run's only head sits at its start (`<--`, `o--`, `x--`),
/// meaning source and target read right-to-left.
pub(crate) fn arrow_points_left(run: &str) -> bool {
    let bytes = run.as_bytes();
    if bytes.len() < 2 {
        return false;
    }
    let starts = matches!(bytes[0], b'<' | b'o' | b'x') && is_body_byte(bytes[1]);
    let ends = matches!(bytes[bytes.len() - 1], b'>' | b'o' | b'x');
    starts && !ends
}

/// Renders the canonical spelling of an arrow, honoring `minlen`.
pub fn arrow_text(kind: &ArrowKind, minlen: usize) -> String {
    let minlen = minlen.max(1);
    let head_char = |head: ArrowHead, left: bool| match head {
        ArrowHead::None => "",
        ArrowHead::Point => {
            if left {
                "<"
            } else {
                ">"
            }
        }
        ArrowHead::Circle => "o",
        ArrowHead::Cross => "x",
    };

    let headed = kind.head != ArrowHead::None;
    let body = match kind.stroke {
        Stroke::Solid => "-".repeat(if headed { minlen + 1 } else { minlen + 2 }),
        Stroke::Thick => "=".repeat(if headed { minlen + 1 } else { minlen + 2 }),
        Stroke::Invisible => "~".repeat(minlen + 2),
        Stroke::Dotted => format!("-{}-", ".".repeat(minlen)),
    };

    let mut out = String::new();
    if kind.bidirectional {
        out.push_str(head_char(kind.head, true));
    }
    out.push_str(&body);
    out.push_str(head_char(kind.head, false));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_plain_and_stretched_arrows() {
        let (kind, minlen) = classify_arrow("-->").unwrap();
        assert_eq!(kind, ArrowKind::solid_point());
        assert_eq!(minlen, 1);

        let (_, minlen) = classify_arrow("---->").unwrap();
        assert_eq!(minlen, 3);

        let (kind, minlen) = classify_arrow("---").unwrap();
        assert_eq!(kind.head, ArrowHead::None);
        assert_eq!(minlen, 1);
    }

    #[test]
    fn classify_thick_is_not_three_dashes() {
        let (kind, minlen) = classify_arrow("==>").unwrap();
        assert_eq!(kind.stroke, Stroke::Thick);
        assert_eq!(kind.head, ArrowHead::Point);
        assert_eq!(minlen, 1);
        assert!(classify_arrow("=>").is_none());
    }

    #[test]
    fn classify_dotted_counts_dots() {
        let (kind, minlen) = classify_arrow("-.->").unwrap();
        assert_eq!(kind.stroke, Stroke::Dotted);
        assert_eq!(minlen, 1);
        let (_, minlen) = classify_arrow("-..->").unwrap();
        assert_eq!(minlen, 2);
    }

    #[test]
    fn short_dotted_runs_are_not_arrows() {
        assert!(classify_arrow(".-").is_none());
        assert!(classify_arrow("-.").is_none());
        // The headed `.-` tail of an inline-labeled arrow still classifies.
        assert!(classify_arrow(".->").is_some());
    }

    #[test]
    fn classify_special_heads_and_bidirectional() {
        let (kind, _) = classify_arrow("--o").unwrap();
        assert_eq!(kind.head, ArrowHead::Circle);
        assert!(!kind.bidirectional);

        let (kind, _) = classify_arrow("x--x").unwrap();
        assert_eq!(kind.head, ArrowHead::Cross);
        assert!(kind.bidirectional);

        let (kind, _) = classify_arrow("<-->").unwrap();
        assert_eq!(kind.head, ArrowHead::Point);
        assert!(kind.bidirectional);

        assert!(classify_arrow("<--o").is_none());
    }

    #[test]
    fn arrow_text_round_trips_canonical_forms() {
        for run in ["-->", "--->", "---", "-.->", "==>", "<-->", "--o", "~~~"] {
            let (kind, minlen) = classify_arrow(run).unwrap();
            assert_eq!(arrow_text(&kind, minlen), run, "run {run}");
        }
    }

    #[test]
    fn shape_tables_are_consistent() {
        assert_eq!(shape_for_delims("((", "))"), Some(NodeShape::Circle));
        assert_eq!(shape_for_delims("[/", "\\]"), Some(NodeShape::Trapezoid));
        assert_eq!(delimiters_for(&NodeShape::Circle), Some(("((", "))")));
        assert_eq!(delimiters_for(&NodeShape::Named("cloud".into())), None);
    }

    #[test]
    fn shape_names_resolve_aliases_many_to_one() {
        assert_eq!(shape_from_name("database"), NodeShape::Cylinder);
        assert_eq!(shape_from_name("cyl"), NodeShape::Cylinder);
        assert_eq!(
            shape_from_name("com-link"),
            NodeShape::Named("bolt".to_string())
        );
        assert_eq!(
            shape_from_name("lightning-bolt"),
            NodeShape::Named("bolt".to_string())
        );
        // Unknown names survive as-is; the catalog is open-ended.
        assert_eq!(
            shape_from_name("mystery"),
            NodeShape::Named("mystery".to_string())
        );
    }
}
