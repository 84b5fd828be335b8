//! Internal constants for diagram rendering.

use std::time::Duration;

/// Default time to wait for mermaid to finish a diagram.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default resolution scale factor (2x for retina displays).
pub const DEFAULT_SCALE: f64 = 2.0;

/// Default viewport size in CSS pixels.
pub const DEFAULT_VIEWPORT: (u32, u32) = (1200, 800);

/// Default mermaid library location.
pub const DEFAULT_MERMAID_CDN: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Selector matching the graphic mermaid inserts once rendering finishes.
pub const RENDERED_SELECTOR: &str = ".mermaid svg";

/// `aria-roledescription` mermaid puts on the graphic it draws for unparsable input.
pub const ERROR_ROLE: &str = "error";
