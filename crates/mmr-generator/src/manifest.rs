//! Generation report written at the end of a run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mmr_config::Config;
use serde::Serialize;

/// File name of the report inside the output directory.
pub const REPORT_FILENAME: &str = "generation-report.json";

/// One diagram rendered during a run.
///
/// Paths are stored as text with `/` separators; bytes that are not valid
/// UTF-8 are replaced, so the report can always be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    /// Document the diagram came from.
    pub file: String,
    /// Image written for it.
    pub image: String,
    /// Reference embedded in the document.
    pub relative_path: String,
}

impl RenderResult {
    #[must_use]
    pub fn new(file: &Path, image: &Path, relative_path: String) -> Self {
        Self {
            file: report_path(file),
            image: report_path(image),
            relative_path,
        }
    }
}

/// Path as report text.
fn report_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Summary record of a completed run.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationManifest {
    /// Completion time (RFC 3339, UTC).
    pub timestamp: DateTime<Utc>,
    /// Configuration the run used.
    pub config: Config,
    /// Documents that contained at least one diagram.
    pub processed_files: usize,
    /// Images written.
    pub generated_images: usize,
    /// Rendered diagrams in processing order.
    pub details: Vec<RenderResult>,
}

impl GenerationManifest {
    /// Build a manifest stamped with the current time.
    #[must_use]
    pub fn new(config: Config, processed_files: usize, details: Vec<RenderResult>) -> Self {
        Self {
            timestamp: Utc::now(),
            config,
            processed_files,
            generated_images: details.len(),
            details,
        }
    }

    /// Write the manifest as pretty JSON into `output_dir`.
    ///
    /// Returns the path of the written file.
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf, ManifestError> {
        let json = serde_json::to_string_pretty(self)?;
        let path = output_dir.join(REPORT_FILENAME);
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// Error writing the report.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_json_shape() {
        let tmp = TempDir::new().unwrap();
        let details = vec![RenderResult::new(
            Path::new("docs/title.md"),
            Path::new("assets/mermaid/title-0.png"),
            "assets/mermaid/title-0.png".to_owned(),
        )];
        let manifest = GenerationManifest::new(Config::default(), 1, details);

        let path = manifest.write(tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join(REPORT_FILENAME));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(json["processedFiles"], 1);
        assert_eq!(json["generatedImages"], 1);
        assert_eq!(json["config"]["imageFormat"], "png");
        assert_eq!(json["config"]["theme"], "default");
        assert_eq!(json["details"][0]["file"], "docs/title.md");
        assert_eq!(json["details"][0]["image"], "assets/mermaid/title-0.png");
        assert_eq!(
            json["details"][0]["relativePath"],
            "assets/mermaid/title-0.png"
        );

        let timestamp = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok(), "got {timestamp}");
    }

    #[test]
    fn test_backslashes_normalized() {
        let result = RenderResult::new(
            Path::new(r"docs\guide\setup.md"),
            Path::new(r"out\setup-0.png"),
            "out/setup-0.png".to_owned(),
        );
        assert_eq!(result.file, "docs/guide/setup.md");
        assert_eq!(result.image, "out/setup-0.png");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_is_written() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        let file = Path::new(OsStr::from_bytes(b"docs/caf\xe9.md"));
        let details = vec![RenderResult::new(
            file,
            Path::new("out/caf-0.png"),
            "out/caf-0.png".to_owned(),
        )];
        let manifest = GenerationManifest::new(Config::default(), 1, details);

        let path = manifest.write(tmp.path()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["details"][0]["file"], "docs/caf\u{fffd}.md");
    }

    #[test]
    fn test_empty_run() {
        let manifest = GenerationManifest::new(Config::default(), 0, Vec::new());
        assert_eq!(manifest.generated_images, 0);
        assert!(manifest.details.is_empty());
    }

    #[test]
    fn test_write_into_missing_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let manifest = GenerationManifest::new(Config::default(), 0, Vec::new());

        let err = manifest.write(&tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, ManifestError::Io(_)));
    }
}
