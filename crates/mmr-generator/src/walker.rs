//! Document discovery by filesystem walking.

use std::fs;
use std::path::PathBuf;

use ignore::{Walk, WalkBuilder};

/// Extension of documents scanned for diagrams.
pub const DOCUMENT_EXTENSION: &str = "md";

/// Error discovering documents.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// The root directory cannot be read.
    #[error("cannot read docs directory {}: {source}", .path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// An entry below the root cannot be read.
    #[error("{0}")]
    Entry(#[from] ignore::Error),
}

/// Finds documents under a root directory.
///
/// Every subdirectory is visited, hidden ones and ignored-by-VCS ones
/// included. Entries are visited depth-first in file name order, so the
/// sequence is stable for an unchanged tree. Symlinked files and directories
/// are followed; a link back into one of its own ancestors is reported as a
/// [`WalkError::Entry`] and not descended into.
#[derive(Debug, Clone)]
pub struct DocumentWalker {
    root: PathBuf,
}

impl DocumentWalker {
    /// Create a walker for markdown documents under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Start a fresh walk.
    ///
    /// Each call walks the tree again from scratch.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Root`] if the root is missing or unreadable.
    pub fn walk(&self) -> Result<Documents, WalkError> {
        fs::read_dir(&self.root).map_err(|source| WalkError::Root {
            path: self.root.clone(),
            source,
        })?;

        let inner = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        Ok(Documents { inner })
    }
}

/// Lazy sequence of document paths produced by [`DocumentWalker::walk`].
pub struct Documents {
    inner: Walk,
}

impl Iterator for Documents {
    type Item = Result<PathBuf, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    let is_file = entry.file_type().is_some_and(|t| t.is_file());
                    let matches = entry
                        .path()
                        .extension()
                        .is_some_and(|e| e == DOCUMENT_EXTENSION);
                    if is_file && matches {
                        return Some(Ok(entry.into_path()));
                    }
                }
                Err(e) => return Some(Err(WalkError::Entry(e))),
            }
        }
    }
}
