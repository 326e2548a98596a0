//! Markdown rendering pipeline built on `pulldown_cmark`.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, TextMergeStream};

use super::highlight::plain_code_block;
use super::linkify::{Segment, linkify};
use super::math::raw_math;
use super::{Highlighter, MathTypesetter, RenderedHtml, html_escape};
use crate::config::RenderConfig;

/// Document source → HTML with highlighting, math and linkification.
pub struct RenderPipeline {
    config: RenderConfig,
    highlighter: Box<dyn Highlighter>,
    math: Box<dyn MathTypesetter>,
}

impl RenderPipeline {
    /// Build a pipeline with explicit extensions.
    #[must_use]
    pub fn with_extensions(
        config: RenderConfig,
        highlighter: Box<dyn Highlighter>,
        math: Box<dyn MathTypesetter>,
    ) -> Self {
        Self {
            config,
            highlighter,
            math,
        }
    }

    fn options(&self) -> Options {
        let mut options = Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_MATH;
        if self.config.typographer {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        options
    }

    /// Render the complete document source.
    ///
    /// Always succeeds; a failing extension only affects its own fragment.
    #[must_use]
    pub fn render(&self, source: &str) -> RenderedHtml {
        let parser = TextMergeStream::new(Parser::new_ext(source, self.options()));

        let mut events: Vec<Event<'_>> = Vec::new();
        let mut code: Option<(String, String)> = None;
        let mut link_depth = 0usize;
        let mut image_depth = 0usize;
        let mut in_html_block = false;

        for event in parser {
            if let Some((lang, buf)) = code.as_mut() {
                match event {
                    Event::Text(text) => buf.push_str(&text),
                    Event::End(TagEnd::CodeBlock) => {
                        let html = self.code_block(buf.as_str(), lang.as_str());
                        events.push(Event::Html(html.into()));
                        code = None;
                    }
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(info) => info
                            .split_whitespace()
                            .next()
                            .unwrap_or_default()
                            .to_owned(),
                        CodeBlockKind::Indented => String::new(),
                    };
                    code = Some((lang, String::new()));
                }
                Event::InlineMath(tex) => {
                    events.push(Event::InlineHtml(self.math(&tex, false).into()));
                }
                Event::DisplayMath(tex) => {
                    events.push(Event::InlineHtml(self.math(&tex, true).into()));
                }
                Event::Html(html) | Event::InlineHtml(html) if !self.config.allow_html => {
                    events.push(Event::Text(html));
                }
                Event::Start(Tag::HtmlBlock) => {
                    in_html_block = true;
                    events.push(Event::Start(Tag::HtmlBlock));
                }
                Event::End(TagEnd::HtmlBlock) => {
                    in_html_block = false;
                    events.push(Event::End(TagEnd::HtmlBlock));
                }
                Event::Start(tag @ Tag::Link { .. }) => {
                    link_depth += 1;
                    events.push(Event::Start(tag));
                }
                Event::End(TagEnd::Link) => {
                    link_depth = link_depth.saturating_sub(1);
                    events.push(Event::End(TagEnd::Link));
                }
                Event::Start(tag @ Tag::Image { .. }) => {
                    image_depth += 1;
                    events.push(Event::Start(tag));
                }
                Event::End(TagEnd::Image) => {
                    image_depth = image_depth.saturating_sub(1);
                    events.push(Event::End(TagEnd::Image));
                }
                Event::Text(text)
                    if self.config.linkify
                        && link_depth == 0
                        && image_depth == 0
                        && !in_html_block =>
                {
                    push_linkified(&mut events, text);
                }
                other => events.push(other),
            }
        }

        let mut html = String::with_capacity(source.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html, events.into_iter());
        RenderedHtml::new(html)
    }

    /// Text-only rendition of the document, for `text/plain` clipboard payloads.
    #[must_use]
    pub fn plain_text(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.options());
        let mut out = String::new();
        for event in parser {
            match event {
                Event::Text(text) | Event::Code(text) => out.push_str(&text),
                Event::InlineMath(tex) | Event::DisplayMath(tex) => out.push_str(&tex),
                Event::SoftBreak => out.push(' '),
                Event::HardBreak => out.push('\n'),
                Event::End(TagEnd::TableCell) => out.push('\t'),
                Event::End(
                    TagEnd::Paragraph
                    | TagEnd::Heading(_)
                    | TagEnd::CodeBlock
                    | TagEnd::Item
                    | TagEnd::TableHead
                    | TagEnd::TableRow
                    | TagEnd::BlockQuote(_),
                ) => {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                _ => {}
            }
        }
        out.trim_end().to_owned()
    }

    fn code_block(&self, code: &str, lang: &str) -> String {
        if lang.is_empty() {
            return plain_code_block(code);
        }
        match self.highlighter.highlight(code, lang) {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(lang, error = %e, "highlight fell back to plain text");
                plain_code_block(code)
            }
        }
    }

    fn math(&self, tex: &str, display: bool) -> String {
        match self.math.typeset(tex, display) {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!(error = %e, "math fell back to raw source");
                raw_math(tex, display)
            }
        }
    }
}

fn push_linkified<'a>(events: &mut Vec<Event<'a>>, text: CowStr<'a>) {
    let segments = linkify(&text);
    if !segments.iter().any(|s| matches!(s, Segment::Link { .. })) {
        drop(segments);
        events.push(Event::Text(text));
        return;
    }
    for segment in segments {
        match segment {
            Segment::Text(plain) => events.push(Event::Text(CowStr::from(plain.to_owned()))),
            Segment::Link { text, href } => events.push(Event::InlineHtml(
                format!(
                    "<a href=\"{}\">{}</a>",
                    html_escape(&href),
                    html_escape(text)
                )
                .into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, WindowError};
    use crate::render::default_pipeline;

    fn pipeline() -> RenderPipeline {
        default_pipeline(&RenderConfig::default())
    }

    struct FailingHighlighter;

    impl Highlighter for FailingHighlighter {
        fn highlight(&self, _code: &str, _lang: &str) -> Result<String> {
            Err(WindowError::Render("boom".to_owned()))
        }
    }

    struct FailingMath;

    impl MathTypesetter for FailingMath {
        fn typeset(&self, _tex: &str, _display: bool) -> Result<String> {
            Err(WindowError::Render("boom".to_owned()))
        }
    }

    #[test]
    fn test_markdown_renders_heading() {
        let html = pipeline().render("# Hello");
        assert!(html.as_str().contains("<h1>Hello</h1>"));
    }

    #[test]
    fn test_markdown_renders_bold() {
        let html = pipeline().render("Hello **world**");
        assert_eq!(html.as_str(), "<p>Hello <strong>world</strong></p>\n");
    }

    #[test]
    fn test_markdown_renders_list() {
        let html = pipeline().render("- a\n- b\n- c");
        assert_eq!(html.as_str().matches("<li>").count(), 3);
    }

    #[test]
    fn test_markdown_renders_table() {
        let html = pipeline().render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.as_str().contains("<table>"));
    }

    #[test]
    fn test_code_block_is_highlighted() {
        let html = pipeline().render("```rust\nlet x = 1;\n```");
        assert!(html.as_str().contains("data-lang=\"rust\""));
    }

    #[test]
    fn test_unknown_language_falls_back_to_escaped_text() {
        let html = pipeline().render("```xyzlang\na < b\n```");
        assert!(html.as_str().contains("<pre class=\"hljs\"><code>a &lt; b\n</code></pre>"));
    }

    #[test]
    fn test_highlight_failure_only_affects_its_block() {
        let p = RenderPipeline::with_extensions(
            RenderConfig::default(),
            Box::new(FailingHighlighter),
            Box::new(FailingMath),
        );
        let html = p.render("# Title\n\n```rust\nfn x() {}\n```\n\nafter");
        let html = html.as_str();
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<pre class=\"hljs\"><code>fn x() {}\n</code></pre>"));
        assert!(html.contains("<p>after</p>"));
    }

    #[test]
    fn test_fence_closed_by_end_of_input_renders_partial_code() {
        let html = pipeline().render("```\npartial line");
        assert!(html.as_str().contains("partial line"));
        assert!(html.as_str().contains("<pre class=\"hljs\">"));
    }

    #[test]
    fn test_inline_math() {
        let html = pipeline().render("Let $x^2$ be");
        assert!(html.as_str().contains("<span class=\"math math-inline\">\\(x^2\\)</span>"));
    }

    #[test]
    fn test_display_math_with_macro() {
        let html = pipeline().render("$$f: \\RR \\to \\RR$$");
        assert!(html.as_str().contains("<p><span class=\"math math-display\">"));
        assert!(!html.as_str().contains("<div"));
        assert!(html.as_str().contains("\\mathbb{R}"));
    }

    #[test]
    fn test_math_failure_degrades_to_source() {
        let p = RenderPipeline::with_extensions(
            RenderConfig::default(),
            Box::new(crate::render::SyntectHighlighter::new("base16-ocean.dark")),
            Box::new(FailingMath),
        );
        let html = p.render("ok $x$ and **bold**");
        let html = html.as_str();
        assert!(html.contains("<span class=\"math-error\">$x$</span>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_bare_url_is_linked() {
        let html = pipeline().render("visit https://example.com today");
        assert!(
            html.as_str()
                .contains("<a href=\"https://example.com\">https://example.com</a>")
        );
    }

    #[test]
    fn test_url_in_code_is_not_linked() {
        let html = pipeline().render("`https://example.com`");
        assert!(!html.as_str().contains("<a "));
    }

    #[test]
    fn test_existing_link_not_double_linked() {
        let html = pipeline().render("[https://example.com](https://example.com)");
        assert_eq!(html.as_str().matches("<a ").count(), 1);
    }

    #[test]
    fn test_linkify_can_be_disabled() {
        let config = RenderConfig {
            linkify: false,
            ..RenderConfig::default()
        };
        let html = default_pipeline(&config).render("https://example.com");
        assert!(!html.as_str().contains("<a "));
    }

    #[test]
    fn test_typographer_quotes() {
        let html = pipeline().render("\"quoted\" -- dash...");
        let html = html.as_str();
        assert!(html.contains('\u{201c}'));
        assert!(html.contains('\u{2013}'));
        assert!(html.contains('\u{2026}'));
    }

    #[test]
    fn test_raw_html_passes_through_by_default() {
        let html = pipeline().render("<kbd>Ctrl</kbd>");
        assert!(html.as_str().contains("<kbd>Ctrl</kbd>"));
    }

    #[test]
    fn test_raw_html_escaped_when_disallowed() {
        let config = RenderConfig {
            allow_html: false,
            ..RenderConfig::default()
        };
        let html = default_pipeline(&config).render("<script>bad</script>");
        assert!(!html.as_str().contains("<script>"));
        assert!(html.as_str().contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let p = pipeline();
        let src = "# A\n\n```rust\nlet x = 1;\n```\n\n$y$ https://x.org";
        assert_eq!(p.render(src), p.render(src));
    }

    #[test]
    fn test_plain_text() {
        let text = pipeline().plain_text("# Title\n\nHello **world**\n\n- a\n- b");
        assert_eq!(text, "Title\nHello world\na\nb");
    }
}
