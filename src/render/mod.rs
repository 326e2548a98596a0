//! Renderer adapter: document source → HTML.
//!
//! Wraps `pulldown_cmark` with two pluggable extension points, code
//! highlighting ([`Highlighter`]) and math typesetting ([`MathTypesetter`]),
//! plus bare-URL linkification. An extension failure never aborts a render:
//! the offending fragment degrades to escaped source text.

pub mod highlight;
pub mod linkify;
pub mod markdown;
pub mod math;

use serde::{Deserialize, Serialize};

use crate::config::RenderConfig;
use crate::error::Result;

pub use highlight::SyntectHighlighter;
pub use markdown::RenderPipeline;
pub use math::KatexMarkup;

/// Rendered structured content for the display surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderedHtml(String);

impl RenderedHtml {
    #[must_use]
    pub fn new(html: impl Into<String>) -> Self {
        Self(html.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for RenderedHtml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Code highlighting extension point.
///
/// Returns `Err` for unrecognized languages or highlighting failures; the
/// pipeline then emits the block as escaped plain text.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &str, lang: &str) -> Result<String>;
}

/// Math typesetting extension point.
///
/// `tex` is the expression without its `$` delimiters.
pub trait MathTypesetter: Send + Sync {
    fn typeset(&self, tex: &str, display: bool) -> Result<String>;
}

/// Build the default pipeline for `config` (`syntect` + KaTeX markup).
#[must_use]
pub fn default_pipeline(config: &RenderConfig) -> RenderPipeline {
    RenderPipeline::with_extensions(
        config.clone(),
        Box::new(SyntectHighlighter::new(&config.theme)),
        Box::new(KatexMarkup::new(config.math_macros.clone())),
    )
}

/// Escape HTML special characters.
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape_fn() {
        assert_eq!(html_escape("a&b"), "a&amp;b");
        assert_eq!(html_escape("<div>"), "&lt;div&gt;");
        assert_eq!(html_escape("he said \"hi\""), "he said &quot;hi&quot;");
        assert_eq!(html_escape("normal"), "normal");
    }

    #[test]
    fn rendered_html_serializes_as_plain_string() {
        let html = RenderedHtml::new("<p>x</p>");
        let json = serde_json::to_string(&html).expect("serialize in test");
        assert_eq!(json, "\"<p>x</p>\"");
    }
}
