//! Standalone HTML page that renders one diagram with mermaid.

use serde_json::{Map, Value, json};

use crate::render::RenderSettings;

/// Build the page for `code`.
///
/// The diagram source is HTML-escaped into `<div class="mermaid">`; mermaid
/// decodes entities before parsing, so `<`, `>` and `&` in labels survive.
#[must_use]
pub fn build_page(code: &str, settings: &RenderSettings) -> String {
    let init = script_safe(&initialize_options(settings).to_string());
    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <style>
      body {{
        margin: 0;
        padding: 20px;
        font-family: Arial, sans-serif;
        background: {background};
      }}
      .mermaid {{
        text-align: center;
      }}
      {custom_css}
    </style>
  </head>
  <body>
    <div class="mermaid">{code}</div>
    <script src="{cdn}"></script>
    <script>
      mermaid.initialize({init});
    </script>
  </body>
</html>
"#,
        background = settings.background_color,
        custom_css = settings.custom_css,
        code = escape_html(code),
        cdn = escape_html(&settings.mermaid_cdn),
    )
}

/// Options object passed to `mermaid.initialize`.
///
/// Layout options come first so `startOnLoad` and `theme` cannot be
/// overridden by them.
fn initialize_options(settings: &RenderSettings) -> Value {
    let mut options = match &settings.mermaid_options {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    options.insert("startOnLoad".to_owned(), json!(true));
    options.insert("theme".to_owned(), json!(settings.theme));
    Value::Object(options)
}

/// Keep JSON from closing the surrounding `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

/// Escape HTML special characters.
pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
