//! Math typesetting markup for the dollars delimiter convention.
//!
//! The surface typesets with KaTeX on the client side; this module expands
//! configured macros, rejects malformed expressions, and emits markup that
//! KaTeX auto-render picks up (`\( … \)` inline, `\[ … \]` display).

use std::collections::BTreeMap;

use super::{MathTypesetter, html_escape};
use crate::error::{Result, WindowError};

/// KaTeX-ready math markup with macro expansion.
#[derive(Debug, Clone, Default)]
pub struct KatexMarkup {
    macros: BTreeMap<String, String>,
}

impl KatexMarkup {
    /// Macros with an empty name are dropped.
    #[must_use]
    pub fn new(mut macros: BTreeMap<String, String>) -> Self {
        if macros.remove("").is_some() {
            tracing::warn!("ignoring math macro with an empty name");
        }
        Self { macros }
    }

    /// Replace each macro name that is not the prefix of a longer control word.
    fn expand_macros(&self, tex: &str) -> String {
        let mut out = tex.to_owned();
        for (name, replacement) in &self.macros {
            let mut expanded = String::with_capacity(out.len());
            let mut rest = out.as_str();
            while let Some(pos) = rest.find(name.as_str()) {
                let after = &rest[pos + name.len()..];
                expanded.push_str(&rest[..pos]);
                if after.starts_with(|c: char| c.is_ascii_alphabetic()) {
                    expanded.push_str(name);
                } else {
                    expanded.push_str(replacement);
                }
                rest = after;
            }
            expanded.push_str(rest);
            out = expanded;
        }
        out
    }
}

impl MathTypesetter for KatexMarkup {
    fn typeset(&self, tex: &str, display: bool) -> Result<String> {
        validate(tex)?;
        let body = html_escape(&self.expand_macros(tex));
        Ok(if display {
            format!("<span class=\"math math-display\">\\[{body}\\]</span>")
        } else {
            format!("<span class=\"math math-inline\">\\({body}\\)</span>")
        })
    }
}

/// Reject expressions KaTeX cannot parse: empty bodies and unbalanced groups.
fn validate(tex: &str) -> Result<()> {
    if tex.trim().is_empty() {
        return Err(WindowError::Render("empty math expression".to_owned()));
    }
    let mut depth: usize = 0;
    let mut escaped = false;
    for c in tex.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    WindowError::Render(format!("unbalanced `}}` in `{tex}`"))
                })?;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(WindowError::Render(format!("unclosed `{{` in `{tex}`")));
    }
    Ok(())
}

/// Escaped source of a math fragment that failed to typeset.
pub(crate) fn raw_math(tex: &str, display: bool) -> String {
    let delim = if display { "$$" } else { "$" };
    format!(
        "<span class=\"math-error\">{delim}{}{delim}</span>",
        html_escape(tex)
    )
}
