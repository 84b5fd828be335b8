//! Renderer abstraction and render settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::consts::{DEFAULT_MERMAID_CDN, DEFAULT_SCALE, DEFAULT_TIMEOUT, DEFAULT_VIEWPORT};

/// Output format for rendered diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagramFormat {
    /// Full-page raster screenshot.
    #[default]
    Png,
    /// The rendered `<svg>` element's markup.
    Svg,
}

impl DiagramFormat {
    /// Parse format from its extension name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// File extension for this format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

/// Settings shared by every render call of an engine.
#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// Directory images are written to.
    pub output_dir: PathBuf,
    /// Output format.
    pub format: DiagramFormat,
    /// Resolution scale factor for raster output.
    pub scale: f64,
    /// Mermaid theme name.
    pub theme: String,
    /// Page background (CSS color).
    pub background_color: String,
    /// Viewport width and height in CSS pixels.
    pub viewport: (u32, u32),
    /// Extra CSS appended to the page stylesheet.
    pub custom_css: String,
    /// Mermaid library script location.
    pub mermaid_cdn: String,
    /// Maximum wait for a diagram to appear.
    pub timeout: Duration,
    /// Extra `mermaid.initialize` options (per-diagram-kind layout).
    pub mermaid_options: serde_json::Value,
}

impl RenderSettings {
    /// Settings with defaults, writing into `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            format: DiagramFormat::default(),
            scale: DEFAULT_SCALE,
            theme: "default".to_owned(),
            background_color: "white".to_owned(),
            viewport: DEFAULT_VIEWPORT,
            custom_css: String::new(),
            mermaid_cdn: DEFAULT_MERMAID_CDN.to_owned(),
            timeout: DEFAULT_TIMEOUT,
            mermaid_options: serde_json::Value::Null,
        }
    }

    /// Path of the image written for `base_name`.
    #[must_use]
    pub fn output_path(&self, base_name: &str) -> PathBuf {
        self.output_dir
            .join(format!("{base_name}.{}", self.format.extension()))
    }
}

/// A diagram image written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// Full path of the written file.
    pub path: PathBuf,
    /// File name (`<base>.<ext>`), used for embedding references.
    pub file_name: String,
}

/// Error rendering a single diagram.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The diagram did not appear within the timeout.
    #[error("timed out after {}s waiting for the rendered diagram", .0.as_secs())]
    Timeout(Duration),
    /// Mermaid could not parse the diagram source.
    #[error("mermaid reported a syntax error")]
    Syntax,
    /// The rendering engine failed (navigation, protocol, screenshot).
    #[error("rendering engine error: {0}")]
    Engine(String),
    /// Writing the image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns diagram source into an image file.
///
/// Calls are sequential; implementations may reuse internal state (such as
/// a browser page) between calls.
pub trait DiagramRenderer {
    /// Render `code` to `<output_dir>/<base_name>.<ext>`.
    fn render(&mut self, code: &str, base_name: &str) -> Result<RenderedImage, RenderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse() {
        assert_eq!(DiagramFormat::parse("png"), Some(DiagramFormat::Png));
        assert_eq!(DiagramFormat::parse("svg"), Some(DiagramFormat::Svg));
        assert_eq!(DiagramFormat::parse("gif"), None);
    }

    #[test]
    fn test_output_path() {
        let mut settings = RenderSettings::new("/out");
        assert_eq!(settings.output_path("a-0"), PathBuf::from("/out/a-0.png"));

        settings.format = DiagramFormat::Svg;
        assert_eq!(settings.output_path("a-0"), PathBuf::from("/out/a-0.svg"));
    }

    #[test]
    fn test_timeout_message() {
        let err = RenderError::Timeout(Duration::from_secs(10));
        assert_eq!(
            err.to_string(),
            "timed out after 10s waiting for the rendered diagram"
        );
    }
}
