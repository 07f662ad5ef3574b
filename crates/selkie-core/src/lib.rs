//! Headless diagram-text editing engine.
//!
//! The source text is the only ground truth: every call parses fresh, every
//! mutation rewrites the minimal span of the original text and leaves
//! everything else byte-for-byte intact, including lines the parsers do not
//! understand. Parsers never fail on malformed input; worst case they
//! recognize fewer entities than the author intended.

#![forbid(unsafe_code)]

pub mod detect;
pub mod dialects;
pub mod error;
pub mod flowchart;
pub mod frontmatter;
pub mod gantt;

pub use detect::detect_dialect;
pub use dialects::{Dialect, GraphModel};
pub use error::{Error, Result};

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDiagram {
    pub dialect: Dialect,
    pub title: Option<String>,
    pub model: GraphModel,
}

/// Detects the dialect and parses into the neutral editor model. Total:
/// unknown text comes back as [`Dialect::Unsupported`] with an empty model.
pub fn parse(text: &str) -> ParsedDiagram {
    let dialect = detect_dialect(text);
    ParsedDiagram {
        dialect,
        title: frontmatter::scan(text).title,
        model: dialect.parse(text),
    }
}

/// Like [`parse`], but unknown text is an error.
pub fn parse_strict(text: &str) -> Result<ParsedDiagram> {
    let parsed = parse(text);
    if parsed.dialect == Dialect::Unsupported {
        let snippet: String = text.trim().chars().take(64).collect();
        return Err(Error::UnsupportedDialect { text: snippet });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests;
