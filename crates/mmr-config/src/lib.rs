//! Configuration management for mmr.
//!
//! Parses `mmr.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories. Every key is
//! optional: missing keys take their default value, at every nesting level.
//! When no config file exists, the defaults are written back to disk so the
//! user has a file to edit.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `docsDir`
//! - `outputDir`
//! - `imageBaseUrl`
//! - `mermaidCdn`

mod expand;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override docs source directory.
    pub docs_dir: Option<PathBuf>,
    /// Override image output directory.
    pub output_dir: Option<PathBuf>,
    /// Override image format.
    pub image_format: Option<ImageFormat>,
    /// Override resolution scale factor.
    pub image_scale: Option<f64>,
    /// Override mermaid theme.
    pub theme: Option<Theme>,
    /// Override per-diagram render timeout.
    pub render_timeout_secs: Option<u64>,
    /// Override the partial-failure exit behavior.
    pub fail_on_render_error: Option<bool>,
}

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "mmr.toml";

/// Upper bound for `imageScale`.
const MAX_SCALE: f64 = 5.0;

/// Application configuration.
///
/// Serialized form doubles as the configuration snapshot stored in the
/// generation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Markdown source directory (relative to the config file).
    pub docs_dir: String,
    /// Image output directory (relative to the config file).
    pub output_dir: String,
    /// Prefix used when embedding image references in documents.
    pub image_base_url: String,
    /// Output image format.
    pub image_format: ImageFormat,
    /// Resolution scale factor for raster output.
    pub image_scale: f64,
    /// Mermaid theme.
    pub theme: Theme,
    /// Page background color (any CSS color).
    pub background_color: String,
    /// Viewport width in CSS pixels.
    pub width: u32,
    /// Viewport height in CSS pixels.
    pub height: u32,
    /// Extra CSS appended to the render page stylesheet.
    pub custom_css: String,
    /// Location of the mermaid library script.
    pub mermaid_cdn: String,
    /// Seconds to wait for a diagram to render.
    pub render_timeout_secs: u64,
    /// Exit with a distinct code when some diagrams failed to render.
    pub fail_on_render_error: bool,
    /// Layout options passed to `mermaid.initialize`.
    pub mermaid_config: MermaidConfig,

    /// Resolved paths (set after loading).
    #[serde(skip)]
    pub paths: ResolvedPaths,
    /// Path to the config file (set after loading or persisting).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Output image format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// Raster screenshot.
    #[default]
    Png,
    /// Serialized vector markup.
    Svg,
}

impl ImageFormat {
    /// Parse format from its file extension name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "png" => Some(Self::Png),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    /// File extension (and config value) for this format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mermaid visual theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Dark,
    Forest,
    Neutral,
    Base,
}

impl Theme {
    /// All supported themes, in documentation order.
    pub const ALL: [Self; 5] = [
        Self::Default,
        Self::Dark,
        Self::Forest,
        Self::Neutral,
        Self::Base,
    ];

    /// Parse a theme name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|theme| theme.as_str() == s)
    }

    /// Theme name as understood by mermaid.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dark => "dark",
            Self::Forest => "forest",
            Self::Neutral => "neutral",
            Self::Base => "base",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-diagram-kind layout tuning.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MermaidConfig {
    pub flowchart: FlowchartConfig,
    pub sequence: SequenceConfig,
    pub gantt: GanttConfig,
}

/// Flowchart layout options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FlowchartConfig {
    pub use_max_width: bool,
    pub html_labels: bool,
    pub curve: String,
}

impl Default for FlowchartConfig {
    fn default() -> Self {
        Self {
            use_max_width: true,
            html_labels: true,
            curve: "basis".to_owned(),
        }
    }
}

/// Sequence diagram layout options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SequenceConfig {
    pub diagram_margin_x: u32,
    pub diagram_margin_y: u32,
    pub actor_margin: u32,
    pub width: u32,
    pub height: u32,
    pub box_margin: u32,
    pub box_text_margin: u32,
    pub note_margin: u32,
    pub message_margin: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            diagram_margin_x: 50,
            diagram_margin_y: 10,
            actor_margin: 50,
            width: 150,
            height: 65,
            box_margin: 10,
            box_text_margin: 5,
            note_margin: 10,
            message_margin: 35,
        }
    }
}

/// Gantt chart layout options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GanttConfig {
    pub title_top_margin: u32,
    pub bar_height: u32,
    pub font_family: String,
    pub font_size: u32,
    pub grid_line_start_padding: u32,
    pub bottom_padding: u32,
}

impl Default for GanttConfig {
    fn default() -> Self {
        Self {
            title_top_margin: 25,
            bar_height: 20,
            font_family: r#""Open-Sans", "sans-serif""#.to_owned(),
            font_size: 11,
            grid_line_start_padding: 35,
            bottom_padding: 25,
        }
    }
}

/// Absolute directories derived from the raw path settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedPaths {
    /// Root directory walked for markdown documents.
    pub docs_dir: PathBuf,
    /// Directory rendered images and the report are written to.
    pub output_dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// TOML serialization error.
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field name (e.g., "`docsDir`").
        field: String,
        /// Error message (e.g., "${`DOCS_ROOT`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise, searches
    /// for `mmr.toml` in the current directory and parents. When the file does
    /// not exist, defaults are used and persisted to it (or to `mmr.toml` in
    /// the current directory when nothing was discovered).
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsing fails, or the
    /// resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) if path.exists() => Self::load_from_file(path)?,
            Some(path) => Self::create_default(path),
            None => match Self::discover_config() {
                Some(discovered) => Self::load_from_file(&discovered)?,
                None => Self::create_default(&std::env::current_dir()?.join(CONFIG_FILENAME)),
            },
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Write this configuration as TOML to `path`.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Render timeout as a [`Duration`](std::time::Duration).
    #[must_use]
    pub fn render_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.render_timeout_secs)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(docs_dir) = &settings.docs_dir {
            self.paths.docs_dir.clone_from(docs_dir);
            self.docs_dir = docs_dir.to_string_lossy().into_owned();
        }
        if let Some(output_dir) = &settings.output_dir {
            self.paths.output_dir.clone_from(output_dir);
            self.output_dir = output_dir.to_string_lossy().into_owned();
        }
        if let Some(image_format) = settings.image_format {
            self.image_format = image_format;
        }
        if let Some(image_scale) = settings.image_scale {
            self.image_scale = image_scale;
        }
        if let Some(theme) = settings.theme {
            self.theme = theme;
        }
        if let Some(timeout) = settings.render_timeout_secs {
            self.render_timeout_secs = timeout;
        }
        if let Some(fail) = settings.fail_on_render_error {
            self.fail_on_render_error = fail;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Build default config next to `path` and try to persist it there.
    ///
    /// Persisting is best effort: the defaults are returned either way.
    fn create_default(path: &Path) -> Self {
        let base = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::default_with_base(base);

        match config.save(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Wrote default configuration");
                config.config_path = Some(path.to_path_buf());
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist default configuration");
            }
        }

        config
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let docs_dir = "docs";
        let output_dir = "assets/mermaid";
        Self {
            docs_dir: docs_dir.to_owned(),
            output_dir: output_dir.to_owned(),
            image_base_url: "assets/mermaid".to_owned(),
            image_format: ImageFormat::default(),
            image_scale: 2.0,
            theme: Theme::default(),
            background_color: "white".to_owned(),
            width: 1200,
            height: 800,
            custom_css: String::new(),
            mermaid_cdn: "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js".to_owned(),
            render_timeout_secs: 10,
            fail_on_render_error: false,
            mermaid_config: MermaidConfig::default(),
            paths: ResolvedPaths {
                docs_dir: base.join(docs_dir),
                output_dir: base.join(output_dir),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.docs_dir, "docsDir")?;
        require_non_empty(&self.output_dir, "outputDir")?;
        require_non_empty(&self.mermaid_cdn, "mermaidCdn")?;
        require_http_url(&self.mermaid_cdn, "mermaidCdn")?;

        if !(self.image_scale > 0.0 && self.image_scale <= MAX_SCALE) {
            return Err(ConfigError::Validation(format!(
                "imageScale must be greater than 0 and at most {MAX_SCALE}"
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Validation(
                "width and height must be greater than 0".to_owned(),
            ));
        }
        if self.render_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "renderTimeoutSecs must be greater than 0".to_owned(),
            ));
        }

        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.docs_dir = expand::expand_env(&self.docs_dir, "docsDir")?;
        self.output_dir = expand::expand_env(&self.output_dir, "outputDir")?;
        self.image_base_url = expand::expand_env(&self.image_base_url, "imageBaseUrl")?;
        self.mermaid_cdn = expand::expand_env(&self.mermaid_cdn, "mermaidCdn")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.paths = ResolvedPaths {
            docs_dir: config_dir.join(&self.docs_dir),
            output_dir: config_dir.join(&self.output_dir),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.paths.docs_dir, PathBuf::from("/test/docs"));
        assert_eq!(
            config.paths.output_dir,
            PathBuf::from("/test/assets/mermaid")
        );
        assert_eq!(config.image_format, ImageFormat::Png);
        assert!((config.image_scale - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.theme, Theme::Default);
        assert_eq!(config.width, 1200);
        assert_eq!(config.height, 800);
        assert_eq!(config.render_timeout_secs, 10);
        assert!(!config.fail_on_render_error);
        assert_eq!(config.mermaid_config.sequence.message_margin, 35);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.docs_dir, "docs");
        assert_eq!(config.image_format, ImageFormat::Png);
        assert_eq!(config.mermaid_config, MermaidConfig::default());
    }

    #[test]
    fn test_parse_camel_case_keys() {
        let toml = r#"
imageFormat = "svg"
imageScale = 3.5
theme = "forest"
backgroundColor = "transparent"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.image_format, ImageFormat::Svg);
        assert!((config.image_scale - 3.5).abs() < f64::EPSILON);
        assert_eq!(config.theme, Theme::Forest);
        assert_eq!(config.background_color, "transparent");
        assert_eq!(config.width, 1200); // Default kept
    }

    #[test]
    fn test_partial_nested_table_keeps_defaults() {
        let toml = r"
[mermaidConfig.sequence]
actorMargin = 80
";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.mermaid_config.sequence.actor_margin, 80);
        assert_eq!(config.mermaid_config.sequence.message_margin, 35);
        assert_eq!(config.mermaid_config.flowchart, FlowchartConfig::default());
    }

    #[test]
    fn test_unknown_theme_is_parse_error() {
        let result: Result<Config, _> = toml::from_str(r#"theme = "sepia""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_theme_parse() {
        assert_eq!(Theme::parse("dark"), Some(Theme::Dark));
        assert_eq!(Theme::parse("base"), Some(Theme::Base));
        assert_eq!(Theme::parse("Dark"), None);
        assert_eq!(ImageFormat::parse("svg"), Some(ImageFormat::Svg));
        assert_eq!(ImageFormat::parse("jpg"), None);
    }

    #[test]
    fn test_validate_scale_bounds() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.image_scale = 5.0;
        config.validate().unwrap();

        config.image_scale = 0.0;
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        assert!(err.to_string().contains("imageScale"));

        config.image_scale = 5.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_cdn_url() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.mermaid_cdn = "file:///mermaid.js".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mermaidCdn"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.render_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
docsDir = "documentation"
outputDir = "public/diagrams"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.paths.docs_dir,
            PathBuf::from("/project/documentation")
        );
        assert_eq!(
            config.paths.output_dir,
            PathBuf::from("/project/public/diagrams")
        );
    }

    #[test]
    fn test_load_persists_defaults_when_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);

        let config = Config::load(Some(&path), None).unwrap();

        assert!(path.exists());
        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(config.paths.docs_dir, tmp.path().join("docs"));

        // The persisted file loads back to the same values
        let reloaded = Config::load(Some(&path), None).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_load_existing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "docsDir = \"pages\"\nimageFormat = \"svg\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.paths.docs_dir, tmp.path().join("pages"));
        assert_eq!(config.image_format, ImageFormat::Svg);
        // Existing file is not rewritten
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "docsDir = \"pages\"\nimageFormat = \"svg\"\n"
        );
    }

    #[test]
    fn test_load_invalid_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "imageScale = 9.0\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_expands_env_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "docsDir = \"${MMR_TEST_SURELY_UNSET_DOCS:-handbook}\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.docs_dir, "handbook");
        assert_eq!(config.paths.docs_dir, tmp.path().join("handbook"));
    }

    #[test]
    fn test_apply_cli_settings_format_and_theme() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            image_format: Some(ImageFormat::Svg),
            theme: Some(Theme::Dark),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.image_format, ImageFormat::Svg);
        assert_eq!(config.theme, Theme::Dark);
        assert!((config.image_scale - 2.0).abs() < f64::EPSILON); // Unchanged
    }

    #[test]
    fn test_apply_cli_settings_dirs() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            docs_dir: Some(PathBuf::from("/custom/docs")),
            output_dir: Some(PathBuf::from("/custom/out")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.paths.docs_dir, PathBuf::from("/custom/docs"));
        assert_eq!(config.paths.output_dir, PathBuf::from("/custom/out"));
        assert_eq!(config.docs_dir, "/custom/docs");
    }

    #[test]
    fn test_cli_settings_are_validated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILENAME);
        let overrides = CliSettings {
            image_scale: Some(-1.0),
            ..Default::default()
        };

        let err = Config::load(Some(&path), Some(&overrides)).unwrap_err();
        assert!(err.to_string().contains("imageScale"));
    }

    #[test]
    fn test_snapshot_uses_camel_case_keys() {
        let config = Config::default_with_base(Path::new("/test"));
        let toml = toml::to_string_pretty(&config).unwrap();

        assert!(toml.contains("imageFormat = \"png\""));
        assert!(toml.contains("renderTimeoutSecs = 10"));
        assert!(toml.contains("mermaidConfig"));
        assert!(toml.contains("useMaxWidth = true"));
        assert!(!toml.contains("paths"));
    }
}
