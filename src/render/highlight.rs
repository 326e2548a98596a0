//! Fenced code block highlighting via `syntect`.

use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::{Highlighter, html_escape};
use crate::error::{Result, WindowError};

/// Theme used when the configured one is not bundled with `syntect`.
const FALLBACK_THEME: &str = "base16-ocean.dark";

/// `syntect`-backed highlighter.
///
/// The syntax and theme sets are loaded once; a streamed response re-renders
/// every code block on every chunk.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
    theme: Option<Theme>,
}

impl SyntectHighlighter {
    /// Load the default syntax set and the named theme.
    #[must_use]
    pub fn new(theme_name: &str) -> Self {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = match themes.remove(theme_name) {
            Some(theme) => Some(theme),
            None => {
                tracing::warn!(theme = theme_name, "unknown highlight theme; using fallback");
                themes.remove(FALLBACK_THEME)
            }
        };
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, lang: &str) -> Result<String> {
        let Some(theme) = self.theme.as_ref() else {
            return Err(WindowError::Render("no highlight theme loaded".to_owned()));
        };
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .ok_or_else(|| WindowError::Render(format!("unrecognized language `{lang}`")))?;

        let highlighted = highlighted_html_for_string(code, &self.syntaxes, syntax, theme)
            .map_err(|e| WindowError::Render(format!("highlight {lang}: {e}")))?;

        Ok(format!(
            "<div class=\"hljs code-block\" data-lang=\"{}\">{highlighted}</div>",
            html_escape(lang)
        ))
    }
}

/// Plain-text rendition of a code block, used when highlighting is skipped or fails.
pub(crate) fn plain_code_block(code: &str) -> String {
    format!("<pre class=\"hljs\"><code>{}</code></pre>", html_escape(code))
}
