//! Model of the `content` area of the display surface.

use serde::{Deserialize, Serialize};

use crate::controls::{Controls, Cursor, HistoryLabel};
use crate::render::RenderedHtml;

/// Animated "response pending" dots shown while streaming.
const STREAMING_INDICATOR: &str = "<div class=\"streaming-indicator\">\
<span class=\"streaming-dot\"></span>\
<span class=\"streaming-dot\"></span>\
<span class=\"streaming-dot\"></span></div>";

/// Block cursor glyph trailing the streamed text.
const STREAMING_CURSOR: &str = "<span class=\"streaming-cursor\">\u{258A}</span>";

/// Last scroll instruction issued to the content area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scroll {
    #[default]
    Unchanged,
    Top,
    Bottom,
}

/// What the content area currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Rendered(RenderedHtml),
    /// Streaming decorations around the body rendered so far (empty while pending).
    Streaming(RenderedHtml),
}

impl Default for Content {
    fn default() -> Self {
        Self::Rendered(RenderedHtml::default())
    }
}

/// The content area: rendered document or streaming view, plus scroll requests.
#[derive(Debug, Clone, Default)]
pub struct Surface {
    content: Content,
    scroll: Scroll,
    revision: u64,
}

impl Surface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the content with a finished render.
    pub fn show(&mut self, html: RenderedHtml) {
        self.content = Content::Rendered(html);
        self.bump();
    }

    /// Show the streaming decorations with an empty body.
    pub fn show_pending(&mut self) {
        self.content = Content::Streaming(RenderedHtml::default());
        self.bump();
    }

    /// Replace the streaming body. Returns `false` if no streaming view is showing.
    pub fn update_streaming(&mut self, html: RenderedHtml) -> bool {
        match &mut self.content {
            Content::Streaming(body) => {
                *body = html;
                self.bump();
                true
            }
            Content::Rendered(_) => false,
        }
    }

    /// Put back the content and scroll of an earlier copy without re-rendering.
    /// The revision keeps moving forward.
    pub fn restore(&mut self, earlier: &Surface) {
        self.content = earlier.content.clone();
        self.scroll = earlier.scroll;
        self.bump();
    }

    pub fn scroll_to(&mut self, scroll: Scroll) {
        self.scroll = scroll;
        self.bump();
    }

    #[must_use]
    pub fn scroll(&self) -> Scroll {
        self.scroll
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self.content, Content::Streaming(_))
    }

    /// The body without any streaming decorations.
    #[must_use]
    pub fn body(&self) -> &RenderedHtml {
        match &self.content {
            Content::Rendered(html) | Content::Streaming(html) => html,
        }
    }

    /// Full markup of the content area.
    #[must_use]
    pub fn to_html(&self) -> String {
        match &self.content {
            Content::Rendered(html) => html.as_str().to_owned(),
            Content::Streaming(body) => format!(
                "{STREAMING_INDICATOR}<div id=\"streaming-content\" class=\"streaming-text\">{body}</div>{STREAMING_CURSOR}"
            ),
        }
    }

    /// Monotonic change counter; bumps on every visible change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// Serializable view of the surface and its controls.
    #[must_use]
    pub fn snapshot(&self, controls: &Controls) -> SurfaceSnapshot {
        SurfaceSnapshot {
            revision: self.revision,
            content: self.to_html(),
            streaming: self.is_streaming(),
            scroll: self.scroll,
            controls_enabled: controls.all_enabled(),
            copy_label: controls.copy_label().to_owned(),
            history_label: controls.label(),
            cursor: controls.cursor(),
        }
    }
}

/// Point-in-time view published to the frontend after each processed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceSnapshot {
    pub revision: u64,
    pub content: String,
    pub streaming: bool,
    pub scroll: Scroll,
    pub controls_enabled: bool,
    pub copy_label: String,
    pub history_label: HistoryLabel,
    pub cursor: Cursor,
}
