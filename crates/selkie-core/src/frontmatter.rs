//! YAML front-matter handling.
//!
//! Diagram sources may open with a `---` delimited YAML block carrying
//! metadata such as `title:`. The engine never rewrites this block; parsers
//! skip it while keeping the original line numbering, so that source spans
//! recorded for mutation always index into the unmodified text.

use serde::Deserialize;

#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    /// `title:` from the YAML block, if one parsed.
    pub title: Option<String>,
    /// Number of leading lines the block occupies (including both `---`
    /// fences). Zero when the text has no front-matter.
    pub lines: usize,
}

#[derive(Debug, Deserialize)]
struct FrontMatterYaml {
    #[serde(default)]
    title: Option<String>,
}

/// Scans a leading front-matter block without consuming the text.
///
/// An unterminated block or malformed YAML yields a best-effort result
/// rather than an error. An unterminated `---` fence is not treated as
/// front-matter at all, so the rest of the document still parses.
pub fn scan(code: &str) -> FrontMatter {
    let mut lines = code.lines();
    let Some(first) = lines.next() else {
        return FrontMatter::default();
    };
    if first.trim() != "---" {
        return FrontMatter::default();
    }

    let mut body = String::new();
    for (idx, line) in lines.enumerate() {
        if line.trim() == "---" {
            let title = serde_yaml::from_str::<FrontMatterYaml>(&body)
                .ok()
                .and_then(|y| y.title)
                .filter(|t| !t.trim().is_empty());
            return FrontMatter {
                title,
                // +2 for both fences; idx is relative to the line after the
                // opening fence.
                lines: idx + 2,
            };
        }
        body.push_str(line);
        body.push('\n');
    }

    FrontMatter::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_extracts_title_and_line_count() {
        let fm = scan("---\ntitle: My Flow\n---\nflowchart TD\n");
        assert_eq!(fm.title.as_deref(), Some("My Flow"));
        assert_eq!(fm.lines, 3);
    }

    #[test]
    fn scan_without_frontmatter_is_empty() {
        let fm = scan("flowchart TD\nA-->B\n");
        assert!(fm.title.is_none());
        assert_eq!(fm.lines, 0);
    }

    #[test]
    fn scan_tolerates_unterminated_block() {
        let fm = scan("---\ntitle: dangling\nflowchart TD\n");
        assert!(fm.title.is_none());
        assert_eq!(fm.lines, 0);
    }

    #[test]
    fn scan_tolerates_bad_yaml() {
        let fm = scan("---\n:- {not yaml\n---\ngantt\n");
        assert!(fm.title.is_none());
        assert_eq!(fm.lines, 3);
    }
}
