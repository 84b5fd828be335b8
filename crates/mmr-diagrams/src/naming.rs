//! Output filename derivation for rendered diagrams.
//!
//! Names combine the document stem, the block ordinal and the sanitized
//! document path relative to the docs root. Sanitizing alone is lossy
//! (`a/b.md` and `a-b.md` collapse to the same string), so a short
//! SHA-256 digest of the exact relative path and ordinal is appended.

use std::path::Path;

use sha2::{Digest, Sha256};

/// Number of hex digits of the path digest kept in the name.
const DIGEST_LEN: usize = 8;

/// Derive a filesystem-safe base name (no extension) for a diagram.
///
/// The result matches `^[a-z0-9-]+$`, never starts or ends with `-`, and
/// depends only on `document` relative to `docs_root` and `ordinal`.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use mmr_diagrams::derive_base_name;
///
/// let name = derive_base_name(Path::new("docs"), Path::new("docs/guide/Setup.md"), 1);
/// assert!(name.starts_with("setup-1-guide-setup-"));
/// ```
#[must_use]
pub fn derive_base_name(docs_root: &Path, document: &Path, ordinal: usize) -> String {
    let relative = document.strip_prefix(docs_root).unwrap_or(document);
    let relative_str = normalize_separators(&relative.to_string_lossy());
    let without_ext = normalize_separators(&relative.with_extension("").to_string_lossy());
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let digest = path_digest(&relative_str, ordinal);
    sanitize(&format!("{stem}-{ordinal}-{without_ext}-{digest}"))
}

/// Short hex digest of `"{relative_path}:{ordinal}"`.
fn path_digest(relative_path: &str, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{relative_path}:{ordinal}").as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_LEN);
    digest
}

fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Replace everything outside `[a-zA-Z0-9-]` with `-`, collapse runs of
/// `-`, trim them from both ends and lowercase.
fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let c = if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' };
        if c == '-' && (out.is_empty() || out.ends_with('-')) {
            continue;
        }
        out.push(c);
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    use regex::Regex;

    static SAFE_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());

    #[test]
    fn test_name_shape() {
        let name = derive_base_name(Path::new("/docs"), Path::new("/docs/title.md"), 0);

        assert!(name.starts_with("title-0-title-"), "got {name}");
        assert_eq!(name.len(), "title-0-title-".len() + DIGEST_LEN);
        assert!(SAFE_NAME.is_match(&name));
    }

    #[test]
    fn test_deterministic() {
        let a = derive_base_name(Path::new("/docs"), Path::new("/docs/a/b.md"), 3);
        let b = derive_base_name(Path::new("/docs"), Path::new("/docs/a/b.md"), 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_ordinal_changes_name() {
        let first = derive_base_name(Path::new("/docs"), Path::new("/docs/page.md"), 0);
        let second = derive_base_name(Path::new("/docs"), Path::new("/docs/page.md"), 1);
        assert_ne!(first, second);
    }

    #[test]
    fn test_sanitized_collisions_are_disambiguated() {
        // Both sanitize to "b-0-a-b" but differ in their relative path
        let nested = derive_base_name(Path::new("/docs"), Path::new("/docs/a/b.md"), 0);
        let flat = derive_base_name(Path::new("/docs"), Path::new("/docs/a-b.md"), 0);
        assert_ne!(nested, flat);
    }

    #[test]
    fn test_unsafe_characters() {
        let name = derive_base_name(
            Path::new("/docs"),
            Path::new("/docs/Über uns/Café & Co (v2).md"),
            12,
        );

        assert!(SAFE_NAME.is_match(&name), "got {name}");
        assert!(!name.contains("--"));
        assert!(!name.starts_with('-') && !name.ends_with('-'));
        assert!(name.starts_with("caf-co-v2-12-ber-uns-caf-co-v2-"), "got {name}");
    }

    #[test]
    fn test_document_outside_root() {
        let name = derive_base_name(Path::new("/docs"), Path::new("/elsewhere/readme.md"), 0);
        assert!(SAFE_NAME.is_match(&name));
        assert!(name.starts_with("readme-0-elsewhere-readme-"), "got {name}");
    }

    #[test]
    fn test_never_empty() {
        let name = derive_base_name(Path::new("/docs"), Path::new("/docs/___.md"), 0);
        assert!(!name.is_empty());
        assert!(SAFE_NAME.is_match(&name));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("A__B--c"), "a-b-c");
        assert_eq!(sanitize("--x--"), "x");
        assert_eq!(sanitize("..."), "");
    }
}
