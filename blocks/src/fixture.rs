//! Authored data trees in TOML, and the built-in demo page.
//!
//! ```toml
//! kind = "page"
//! values.title."text/html" = "My page"
//!
//! [[slots.children]]
//! id = "MIID-LINE-001"
//! standoff.fractionalIndex."number/decimal" = 0.01
//! standoff.indentation."number/natural" = 0
//! block.values.text."text/html" = "Hello"
//! ```

use std::fmt;
use std::ops::Range;
use std::path::Path;

use codespan_reporting::diagnostic::{Diagnostic, Label};
use mintty::data::TreeValueError;
use mintty::format::{DATA_URI, TEXT_HTML};
use mintty::{DataTree, FormatRegistry, ItemPath, RawDataTree, Values};

use crate::page::{CHILDREN, COMMENTS, child_standoff, comment_standoff};

/// A fixture that could not be read or parsed.
#[derive(Debug, Clone)]
pub struct FixtureError {
    pub message: String,
    /// Byte range in the fixture source, when known.
    pub span: Option<Range<usize>>,
    pub notes: Vec<String>,
}

impl FixtureError {
    fn new(message: impl Into<String>) -> Self {
        FixtureError {
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let labels = match &self.span {
            Some(span) => vec![Label::primary(file_id, span.clone())],
            None => Vec::new(),
        };
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(labels)
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for FixtureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FixtureError {}

/// Parse a TOML fixture and run every value through `registry`.
pub fn parse_fixture(source: &str, registry: &FormatRegistry) -> Result<DataTree, FixtureError> {
    let raw: RawDataTree = toml::from_str(source).map_err(|e| FixtureError {
        message: e.message().to_string(),
        span: e.span(),
        notes: Vec::new(),
    })?;
    registry
        .parse_tree(&raw)
        .map_err(|e| value_error(source, e))
}

pub fn load_fixture(path: &Path, registry: &FormatRegistry) -> Result<DataTree, FixtureError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| FixtureError::new(format!("cannot read {}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), bytes = source.len(), "loading fixture");
    parse_fixture(&source, registry)
}

fn value_error(source: &str, error: TreeValueError) -> FixtureError {
    let span = locate(source, &error.path);
    FixtureError {
        message: error.error.to_string(),
        span,
        notes: Vec::new(),
    }
    .with_note(format!(
        "in the {} of the block at {}",
        if error.standoff { "standoff" } else { "values" },
        error.path
    ))
}

/// Span in a fixture source of the item `path` points at: its `id = "..."`
/// line. `None` for the root or when the id is not written literally.
pub fn locate(source: &str, path: &ItemPath) -> Option<Range<usize>> {
    path.item_id().and_then(|id| find_id(source, id))
}

fn find_id(source: &str, id: &str) -> Option<Range<usize>> {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        let trimmed = line.trim();
        if let Some((key, value)) = trimmed.split_once('=')
            && key.trim() == "id"
            && value.trim().trim_matches(|c| c == '"' || c == '\'') == id
        {
            let start = offset + (line.len() - line.trim_start().len());
            return Some(start..start + trimmed.len());
        }
        offset += line.len();
    }
    None
}

// ---------------------------------------------------------------------------
// Demo data
// ---------------------------------------------------------------------------

const SMILE: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg'  width='40' height='40' viewport='0 0 100 100' style='fill:black;font-size:24px;'><text y='50%'>🥰</text></svg>";
const MIND_BLOWN: &str = "data:image/svg+xml;utf8,<svg xmlns='http://www.w3.org/2000/svg'  width='40' height='40' viewport='0 0 100 100' style='fill:black;font-size:24px;'><text y='50%'>🤯</text></svg>";

fn line(html: &str) -> DataTree {
    DataTree::new().text("text", &TEXT_HTML, html)
}

fn image(src: &str, caption: &str) -> DataTree {
    DataTree::new()
        .text("imageSrc", &DATA_URI, src)
        .text("title", &TEXT_HTML, caption)
}

/// A page with lines, an image and a few comment threads. Comment times are
/// relative to `now` (unix seconds). The page is tagged; its items are not.
pub fn demo_page(now: u64) -> DataTree {
    let ago = |minutes: u64| now.saturating_sub(minutes * 60);
    let comment = |target: &str, by: &str, minutes: u64| -> Values {
        comment_standoff(target, by, ago(minutes))
    };

    DataTree::tagged(crate::page::NAME)
        .text("title", &TEXT_HTML, "Mintty Editor <sup>experiment</sup>")
        .item(
            CHILDREN,
            "MIID-LINE-001",
            child_standoff(0.01, 0.0),
            line("Hello <strong>Mintter</strong>!"),
        )
        .item(
            CHILDREN,
            "MIID-IMAGE-001",
            child_standoff(0.2, 0.0),
            image(SMILE, "I love it!"),
        )
        .item(
            CHILDREN,
            "MIID-LINE-002",
            child_standoff(0.5, 1.0),
            line("This is block 2."),
        )
        .item(
            CHILDREN,
            "MIID-LINE-003",
            child_standoff(5.0, 1.0),
            line("This is block 3."),
        )
        .item(
            COMMENTS,
            "MIID-COMMENT-001",
            comment("MIID-LINE-001", "GITHUB.COM:colelawrence", 5),
            line("A comment"),
        )
        .item(
            COMMENTS,
            "MIID-COMMENT-002",
            comment("MIID-COMMENT-001", "TWITTER.COM:hhg2288", 1),
            line("Was this comment for testing?"),
        )
        .item(
            COMMENTS,
            "MIID-COMMENT-003",
            comment("MIID-LINE-003", "GITHUB.COM:colelawrence", 1),
            line("Supports indentation?"),
        )
        .item(
            COMMENTS,
            "MIID-COMMENT-004",
            comment("MIID-LINE-003", "GITHUB.COM:colelawrence", 100),
            image(MIND_BLOWN, "Caption <em>on image</em>."),
        )
}

