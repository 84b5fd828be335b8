//! Headless Chrome rendering engine.
//!
//! One browser process and one tab are kept for the lifetime of the engine
//! and reused for every diagram. Each render loads a fresh page from a
//! `data:` URL, waits for mermaid to insert its `<svg>`, then captures it.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::consts::{ERROR_ROLE, RENDERED_SELECTOR};
use crate::page::build_page;
use crate::render::{DiagramFormat, DiagramRenderer, RenderError, RenderSettings, RenderedImage};

/// JavaScript returning the full document size as a JSON string.
const PAGE_SIZE_SCRIPT: &str = "JSON.stringify({width: document.documentElement.scrollWidth, height: document.documentElement.scrollHeight})";

/// Error starting the rendering engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The browser process could not be launched.
    #[error("failed to launch headless browser: {0}")]
    Launch(String),
    /// The browser started but no page could be opened.
    #[error("failed to open browser page: {0}")]
    Page(String),
}

/// Headless browser that renders mermaid diagrams.
///
/// Dropping the engine terminates the browser process; [`shutdown`](Self::shutdown)
/// additionally closes the page first and logs the outcome.
pub struct BrowserEngine {
    /// Page reused across renders.
    tab: Arc<Tab>,
    /// Owns the browser process.
    browser: Browser,
    settings: RenderSettings,
}

impl BrowserEngine {
    /// Launch a headless browser configured for `settings`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the browser cannot be started or no page
    /// can be opened.
    pub fn launch(settings: RenderSettings) -> Result<Self, EngineError> {
        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some(settings.viewport))
            .build()
            .map_err(|e| EngineError::Launch(e.to_string()))?;

        let browser = Browser::new(options).map_err(|e| EngineError::Launch(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| EngineError::Page(e.to_string()))?;

        tracing::info!(
            width = settings.viewport.0,
            height = settings.viewport.1,
            format = settings.format.extension(),
            "Rendering engine started"
        );

        Ok(Self {
            tab,
            browser,
            settings,
        })
    }

    /// Close the page and stop the browser.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn shutdown(self) {
        if let Err(e) = self.tab.close(true) {
            tracing::warn!(error = %e, "Failed to close browser page");
        }
        drop(self.browser);
        tracing::info!("Rendering engine stopped");
    }

    /// Load the page for `code` and wait until mermaid has drawn it.
    fn load_diagram(&self, code: &str) -> Result<(), RenderError> {
        let page = build_page(code, &self.settings);
        let url = format!("data:text/html;base64,{}", BASE64_STANDARD.encode(page));

        self.tab
            .navigate_to(&url)
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| RenderError::Engine(e.to_string()))?;

        let timeout = self.settings.timeout;
        let started = Instant::now();
        let svg = match self
            .tab
            .wait_for_element_with_custom_timeout(RENDERED_SELECTOR, timeout)
        {
            Ok(element) => element,
            Err(e) => return Err(wait_failure(started.elapsed(), timeout, &e)),
        };

        let role = svg
            .get_attribute_value("aria-roledescription")
            .map_err(|e| RenderError::Engine(e.to_string()))?;
        if role.as_deref() == Some(ERROR_ROLE) {
            return Err(RenderError::Syntax);
        }

        Ok(())
    }

    /// Outer markup of the rendered `<svg>`.
    fn capture_svg(&self) -> Result<Vec<u8>, RenderError> {
        let svg = self
            .tab
            .find_element(RENDERED_SELECTOR)
            .and_then(|element| element.get_content())
            .map_err(|e| RenderError::Engine(e.to_string()))?;
        Ok(svg.into_bytes())
    }

    /// Screenshot of the whole document at the configured scale.
    fn capture_png(&self) -> Result<Vec<u8>, RenderError> {
        let (width, height) = self.page_size()?;
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width,
            height,
            scale: self.settings.scale,
        };

        self.tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(clip),
                true,
            )
            .map_err(|e| RenderError::Engine(e.to_string()))
    }

    /// Document scroll size in CSS pixels.
    fn page_size(&self) -> Result<(f64, f64), RenderError> {
        let result = self
            .tab
            .evaluate(PAGE_SIZE_SCRIPT, false)
            .map_err(|e| RenderError::Engine(e.to_string()))?;

        parse_page_size(result.value.as_ref())
    }
}

/// Classify a failed wait for the rendered diagram.
///
/// The browser reports both an expired wait and a broken page as errors;
/// only the elapsed time tells them apart.
fn wait_failure(elapsed: Duration, timeout: Duration, cause: &impl fmt::Display) -> RenderError {
    if elapsed >= timeout {
        RenderError::Timeout(timeout)
    } else {
        RenderError::Engine(cause.to_string())
    }
}

/// Read `(width, height)` from the value returned by [`PAGE_SIZE_SCRIPT`].
fn parse_page_size(value: Option<&serde_json::Value>) -> Result<(f64, f64), RenderError> {
    let size = value
        .and_then(serde_json::Value::as_str)
        .and_then(|json| serde_json::from_str::<serde_json::Value>(json).ok())
        .ok_or_else(|| RenderError::Engine("could not measure page size".to_owned()))?;

    let dimension = |key: &str| size.get(key).and_then(serde_json::Value::as_f64);
    match (dimension("width"), dimension("height")) {
        (Some(width), Some(height)) if width > 0.0 && height > 0.0 => Ok((width, height)),
        _ => Err(RenderError::Engine(format!("invalid page size: {size}"))),
    }
}

impl DiagramRenderer for BrowserEngine {
    fn render(&mut self, code: &str, base_name: &str) -> Result<RenderedImage, RenderError> {
        self.load_diagram(code)?;

        let bytes = match self.settings.format {
            DiagramFormat::Png => self.capture_png()?,
            DiagramFormat::Svg => self.capture_svg()?,
        };

        let path = self.settings.output_path(base_name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), "Wrote diagram image");

        Ok(RenderedImage {
            file_name: format!("{base_name}.{}", self.settings.format.extension()),
            path,
        })
    }
}
