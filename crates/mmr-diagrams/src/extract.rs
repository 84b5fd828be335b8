//! Mermaid block extraction from markdown text.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Fenced mermaid block: opener, lazily matched payload, closer alone on its line.
static MERMAID_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```mermaid\s*\n(.*?)\r?\n[ \t]*```[ \t]*\r?(?m:$)")
        .expect("invalid mermaid fence regex")
});

/// A mermaid code block found in a document.
///
/// Blocks are produced by [`extract_blocks`] and are read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    code: String,
    span: Range<usize>,
    ordinal: usize,
}

impl DiagramBlock {
    /// Diagram source with surrounding whitespace trimmed.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Byte range of the whole fenced block (markers included).
    #[must_use]
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// Zero-based position of the block within its document.
    #[must_use]
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// Extract all mermaid blocks from `text`, in document order.
///
/// Matching is left-to-right and non-overlapping. An opener without a
/// closing fence produces no block.
#[must_use]
pub fn extract_blocks(text: &str) -> Vec<DiagramBlock> {
    MERMAID_FENCE
        .captures_iter(text)
        .enumerate()
        .filter_map(|(ordinal, caps)| {
            let whole = caps.get(0)?;
            let payload = caps.get(1)?;
            Some(DiagramBlock {
                code: payload.as_str().trim().to_owned(),
                span: whole.range(),
                ordinal,
            })
        })
        .collect()
}
