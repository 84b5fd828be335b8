//! Document rewriting: fenced blocks to image references.
//!
//! [`Replacements`] collects the blocks that rendered successfully together
//! with their embedding text and builds the new document in a single
//! append-only pass over the original. Blocks that are not added keep their
//! original fenced text.

use std::ops::Range;

use crate::extract::DiagramBlock;

/// Markdown image reference for a rendered diagram.
#[must_use]
pub fn embed_reference(relative_path: &str) -> String {
    format!("![Diagram]({relative_path})")
}

/// Join the configured image base URL and an image file name with `/`.
///
/// Backslashes are normalized so references stay portable across hosts.
#[must_use]
pub fn image_link(base_url: &str, file_name: &str) -> String {
    let base = base_url.replace('\\', "/");
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        file_name.to_owned()
    } else {
        format!("{base}/{file_name}")
    }
}

/// Error produced when replacements cannot be applied.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RewriteError {
    /// A span starts before the end of the previously applied span.
    #[error("block at byte {start} is out of order (previous block ends at byte {previous_end})")]
    OutOfOrder { start: usize, previous_end: usize },
    /// A span does not lie on character boundaries inside the document.
    #[error("block span {start}..{end} is outside the document ({len} bytes)")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Ordered set of block substitutions for one document.
#[derive(Debug, Default)]
pub struct Replacements {
    entries: Vec<(Range<usize>, String)>,
}

impl Replacements {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty set with room for `capacity` substitutions.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Replace `block`'s fenced text with `content`.
    ///
    /// Blocks must be added in increasing ordinal order.
    pub fn add(&mut self, block: &DiagramBlock, content: String) {
        self.entries.push((block.span(), content));
    }

    /// Whether no substitution was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply all substitutions to `source` in a single pass.
    ///
    /// Text outside the replaced spans is copied unchanged.
    ///
    /// # Errors
    ///
    /// Fails without producing output when spans are not strictly increasing
    /// and disjoint, or fall outside `source`.
    pub fn apply(self, source: &str) -> Result<String, RewriteError> {
        let mut result = String::with_capacity(source.len());
        let mut cursor = 0;

        for (span, content) in self.entries {
            if span.start < cursor {
                return Err(RewriteError::OutOfOrder {
                    start: span.start,
                    previous_end: cursor,
                });
            }
            if span.start > span.end
                || span.end > source.len()
                || !source.is_char_boundary(span.start)
                || !source.is_char_boundary(span.end)
            {
                return Err(RewriteError::OutOfBounds {
                    start: span.start,
                    end: span.end,
                    len: source.len(),
                });
            }

            result.push_str(&source[cursor..span.start]);
            result.push_str(&content);
            cursor = span.end;
        }

        result.push_str(&source[cursor..]);
        Ok(result)
    }
}
