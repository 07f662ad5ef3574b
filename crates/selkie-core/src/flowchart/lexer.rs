//! Flowchart line tokenizer.
//!
//! Scans one trimmed statement line left-to-right over a byte cursor. Match
//! order is load-bearing: inline-labeled arrow forms (`-- text -->`) before
//! the plain arrow table, and within both, longest match first, so a thick
//! `==>` is never read as `=` `=` `>`. Unrecognized bytes are skipped one
//! character at a time; tokenization never aborts.

use super::lexical::{
    ArrowKind, NodeShape, Stroke, arrow_points_left, classify_arrow, closes_for_open,
    open_delimiters, shape_for_delims,
};
use std::ops::Range;

#[derive(Debug, Clone)]
pub(crate) struct NodeToken {
    pub id: String,
    pub shape: Option<NodeShape>,
    pub shape_open: Option<&'static str>,
    pub shape_close: Option<&'static str>,
    pub label: Option<String>,
    pub label_quoted: bool,
    pub class_tag: Option<String>,
    /// Half-open byte span within the line, including delimiters and any
    /// `:::class` tag.
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ArrowToken {
    pub kind: ArrowKind,
    pub minlen: usize,
    pub label: Option<String>,
    /// `<--` style: the only head sits at the start, so the edge reads
    /// right-to-left and the parser swaps the endpoints.
    pub points_left: bool,
    /// Span covering the glyph run plus any label segment.
    pub span: Range<usize>,
}

#[derive(Debug, Clone)]
pub(crate) enum Token {
    Node(NodeToken),
    Arrow(ArrowToken),
    Ampersand(Range<usize>),
}

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Reads an identifier at `start`, returning `(id, end)`.
pub(crate) fn scan_ident(line: &str, start: usize) -> Option<(String, usize)> {
    let mut end = start;
    for (off, c) in line[start..].char_indices() {
        let ok = if off == 0 {
            is_ident_start(c)
        } else {
            is_ident_continue(c)
        };
        if !ok {
            break;
        }
        end = start + off + c.len_utf8();
    }
    if end == start {
        return None;
    }
    Some((line[start..end].to_string(), end))
}

pub(crate) fn tokenize_line(line: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = match line[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        if c.is_whitespace() {
            i += c.len_utf8();
            continue;
        }

        if let Some((tok, next)) = match_arrow(line, i) {
            tokens.push(Token::Arrow(tok));
            i = next;
            continue;
        }

        if c == '&' {
            tokens.push(Token::Ampersand(i..i + 1));
            i += 1;
            continue;
        }

        if let Some((tok, next)) = match_node(line, i) {
            tokens.push(Token::Node(tok));
            i = next;
            continue;
        }

        // Anything unrecognized is skipped, never fatal.
        i += c.len_utf8();
    }

    tokens
}

fn match_arrow(line: &str, start: usize) -> Option<(ArrowToken, usize)> {
    if let Some(hit) = match_inline_labeled_arrow(line, start) {
        return Some(hit);
    }
    let (run_end, run) = scan_arrow_run(line, start)?;
    let (kind, minlen) = classify_arrow(run)?;
    let points_left = arrow_points_left(run);

    let (label, end) = match scan_pipe_label(line, run_end) {
        Some((label, end)) => (Some(label), end),
        None => (None, run_end),
    };

    Some((
        ArrowToken {
            kind,
            minlen,
            label,
            points_left,
            span: start..end,
        },
        end,
    ))
}

/// `A -- text --> B`, `A -. text .-> B`, `A == text ==> B`: an opener run,
/// free text, then a closing run of the same stroke.
fn match_inline_labeled_arrow(line: &str, start: usize) -> Option<(ArrowToken, usize)> {
    let rest = &line[start..];
    let opener = ["--", "-.", "=="]
        .into_iter()
        .find(|op| rest.starts_with(op))?;
    let opener_stroke = match opener {
        "-." => Stroke::Dotted,
        "==" => Stroke::Thick,
        _ => Stroke::Solid,
    };

    // Any further run glyph or head right after the opener means this is a
    // plain run (`--->`, `---`, `--x`), not a label opener.
    let text_from = start + opener.len();
    if text_from < line.len()
        && matches!(
            line.as_bytes()[text_from],
            b'-' | b'.' | b'=' | b'~' | b'>' | b'o' | b'x'
        )
    {
        return None;
    }

    // Find the earliest closing run of the same stroke with non-empty text
    // in between.
    let mut j = text_from;
    while j < line.len() {
        if let Some((run_end, run)) = scan_arrow_run(line, j) {
            if let Some((kind, minlen)) = classify_arrow(run) {
                if kind.stroke == opener_stroke
                    && !kind.bidirectional
                    && !arrow_points_left(run)
                    && !line[text_from..j].trim().is_empty()
                {
                    let label = line[text_from..j].trim().to_string();
                    return Some((
                        ArrowToken {
                            kind,
                            minlen,
                            label: Some(label),
                            points_left: false,
                            span: start..run_end,
                        },
                        run_end,
                    ));
                }
            }
        }
        j += line[j..].chars().next().map_or(1, char::len_utf8);
    }
    None
}

/// Scans a maximal arrow glyph run at `start`: optional start head, body
/// glyphs, optional end head. Returns the end offset and the run slice.
fn scan_arrow_run(line: &str, start: usize) -> Option<(usize, &str)> {
    let bytes = line.as_bytes();
    let mut j = start;

    match bytes.get(j) {
        Some(b'<' | b'o' | b'x')
            if matches!(bytes.get(j + 1), Some(b'-' | b'=' | b'.' | b'~')) =>
        {
            j += 1;
        }
        _ => {}
    }

    let body_start = j;
    while matches!(bytes.get(j), Some(b'-' | b'=' | b'.' | b'~')) {
        j += 1;
    }
    if j == body_start {
        return None;
    }
    if matches!(bytes.get(j), Some(b'>' | b'o' | b'x')) {
        j += 1;
    }
    Some((j, &line[start..j]))
}

/// `|label|` immediately after an arrow (whitespace tolerated).
fn scan_pipe_label(line: &str, from: usize) -> Option<(String, usize)> {
    let bytes = line.as_bytes();
    let mut j = from;
    while matches!(bytes.get(j), Some(b) if b.is_ascii_whitespace()) {
        j += 1;
    }
    if bytes.get(j) != Some(&b'|') {
        return None;
    }
    let close = line[j + 1..].find('|')? + j + 1;
    let label = line[j + 1..close].trim().to_string();
    Some((label, close + 1))
}

fn match_node(line: &str, start: usize) -> Option<(NodeToken, usize)> {
    let (id, mut end) = scan_ident(line, start)?;

    let mut shape = None;
    let mut shape_open = None;
    let mut shape_close = None;
    let mut label = None;
    let mut label_quoted = false;

    if let Some((open, close, text, quoted, after)) = match_shape_label(line, end) {
        shape = shape_for_delims(open, close);
        shape_open = Some(open);
        shape_close = Some(close);
        label = Some(text);
        label_quoted = quoted;
        end = after;
    }

    let mut class_tag = None;
    if line[end..].starts_with(":::") {
        let tag_start = end + 3;
        let mut tag_end = tag_start;
        for (off, c) in line[tag_start..].char_indices() {
            if !(c.is_alphanumeric() || c == '_' || c == '-') {
                break;
            }
            tag_end = tag_start + off + c.len_utf8();
        }
        if tag_end > tag_start {
            class_tag = Some(line[tag_start..tag_end].to_string());
            end = tag_end;
        }
    }

    Some((
        NodeToken {
            id,
            shape,
            shape_open,
            shape_close,
            label,
            label_quoted,
            class_tag,
            span: start..end,
        },
        end,
    ))
}

/// Matches `<open>label<close>` at `from`. The close delimiter is resolved
/// against whichever open matched (`[/` may close `/]` or `\]`). Returns
/// `(open, close, label, quoted, end)`.
fn match_shape_label(
    line: &str,
    from: usize,
) -> Option<(&'static str, &'static str, String, bool, usize)> {
    let rest = &line[from..];
    let open = open_delimiters().find(|open| rest.starts_with(open))?;
    let closes = closes_for_open(open);
    let inner_start = from + open.len();

    // Quoted labels may contain any delimiter characters.
    let after_ws = inner_start
        + line[inner_start..]
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map(|(off, _)| off)?;
    if matches!(line.as_bytes().get(after_ws), Some(b'"' | b'\'')) {
        let (text, rest_at) = scan_quoted(line, after_ws)?;
        let mut j = rest_at;
        while matches!(line.as_bytes().get(j), Some(b) if b.is_ascii_whitespace()) {
            j += 1;
        }
        let close = closes.iter().find(|c| line[j..].starts_with(**c))?;
        return Some((open, close, text, true, j + close.len()));
    }

    // Unquoted: earliest candidate close wins.
    let mut best: Option<(usize, &'static str)> = None;
    for close in &closes {
        if let Some(off) = line[inner_start..].find(close) {
            let at = inner_start + off;
            if best.map(|(b, _)| at < b).unwrap_or(true) {
                best = Some((at, close));
            }
        }
    }
    let (close_at, close) = best?;
    let text = line[inner_start..close_at].trim().to_string();
    Some((open, close, text, false, close_at + close.len()))
}

/// Reads a `"..."` or `'...'` string with backslash escapes, returning the
/// inner text and the offset after the closing quote.
pub(crate) fn scan_quoted(line: &str, start: usize) -> Option<(String, usize)> {
    let mut chars = line[start..].char_indices();
    let (_, quote) = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let mut out = String::new();
    let mut escaped = false;
    for (off, c) in chars {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
            continue;
        }
        if c == quote {
            return Some((out, start + off + c.len_utf8()));
        }
        out.push(c);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flowchart::lexical::ArrowHead;

    fn nodes(tokens: &[Token]) -> Vec<&NodeToken> {
        tokens
            .iter()
            .filter_map(|t| match t {
                Token::Node(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn tokenizes_chain_with_shapes() {
        let toks = tokenize_line("A[Start] --> B{Is it?}");
        assert_eq!(toks.len(), 3);
        let ns = nodes(&toks);
        assert_eq!(ns[0].id, "A");
        assert_eq!(ns[0].shape, Some(NodeShape::Rect));
        assert_eq!(ns[0].label.as_deref(), Some("Start"));
        assert_eq!(ns[1].shape, Some(NodeShape::Diamond));
        assert_eq!(ns[1].label.as_deref(), Some("Is it?"));
        assert_eq!(ns[0].span, 0..8);
    }

    #[test]
    fn arrow_label_pipe_form() {
        let toks = tokenize_line("A -->|yes| B");
        let Token::Arrow(a) = &toks[1] else {
            panic!("expected arrow");
        };
        assert_eq!(a.label.as_deref(), Some("yes"));
        assert_eq!(&"A -->|yes| B"[a.span.clone()], "-->|yes|");
    }

    #[test]
    fn arrow_label_inline_form() {
        let toks = tokenize_line("A -- yes --> B");
        let Token::Arrow(a) = &toks[1] else {
            panic!("expected arrow");
        };
        assert_eq!(a.label.as_deref(), Some("yes"));
        assert_eq!(a.kind.head, ArrowHead::Point);
        let toks = tokenize_line("A == no ==> B");
        let Token::Arrow(a) = &toks[1] else {
            panic!("expected arrow");
        };
        assert_eq!(a.label.as_deref(), Some("no"));
        assert_eq!(a.kind.stroke, Stroke::Thick);
        let toks = tokenize_line("A -. maybe .-> B");
        let Token::Arrow(a) = &toks[1] else {
            panic!("expected arrow");
        };
        assert_eq!(a.label.as_deref(), Some("maybe"));
        assert_eq!(a.kind.stroke, Stroke::Dotted);
    }

    #[test]
    fn open_run_is_not_an_inline_label() {
        let toks = tokenize_line("A --- B --> C");
        assert_eq!(toks.len(), 5);
        let Token::Arrow(a) = &toks[1] else {
            panic!("expected arrow");
        };
        assert!(a.label.is_none());
        assert_eq!(a.kind.head, ArrowHead::None);
    }

    #[test]
    fn thick_arrow_not_three_tokens() {
        let toks = tokenize_line("A ==> B");
        assert_eq!(toks.len(), 3);
        assert!(matches!(&toks[1], Token::Arrow(a) if a.kind.stroke == Stroke::Thick));
    }

    #[test]
    fn quoted_label_with_structural_chars() {
        let toks = tokenize_line(r#"A["a [weird] label"] --> B"#);
        let ns = nodes(&toks);
        assert_eq!(ns[0].label.as_deref(), Some("a [weird] label"));
        assert!(ns[0].label_quoted);
    }

    #[test]
    fn ampersand_and_class_tag() {
        let toks = tokenize_line("A:::hot & B --> C");
        assert_eq!(toks.len(), 5);
        let ns = nodes(&toks);
        assert_eq!(ns[0].class_tag.as_deref(), Some("hot"));
    }

    #[test]
    fn left_pointing_arrow_flagged() {
        let toks = tokenize_line("A <-- B");
        let Token::Arrow(a) = &toks[1] else {
            panic!("expected arrow");
        };
        assert!(a.points_left);
        assert!(!a.kind.bidirectional);
    }

    #[test]
    fn garbage_never_aborts() {
        let toks = tokenize_line("@@ A --> B ~~");
        assert_eq!(toks.len(), 3);
    }

    #[test]
    fn double_circle_beats_circle() {
        let toks = tokenize_line("A(((core)))");
        let ns = nodes(&toks);
        assert_eq!(ns[0].shape, Some(NodeShape::DoubleCircle));
        assert_eq!(ns[0].label.as_deref(), Some("core"));
    }
}
