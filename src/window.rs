//! The response window: owns the rendering pipeline, persisted state, the
//! stream session, the control set and the content surface, and implements
//! every host-callable operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::{UiConfig, WindowConfig};
use crate::controls::{Controls, Cursor, HistoryLabel};
use crate::dispatch::{Call, CallTarget};
use crate::error::{Result, WindowError};
use crate::render::{RenderPipeline, default_pipeline};
use crate::store::{StateKey, StateStore};
use crate::stream::{Finish, StreamSession};
use crate::surface::{Scroll, Surface, SurfaceSnapshot};

/// Actions posted back to the host process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostAction {
    /// The stream completed; the host may make its window opaque again.
    RemoveTransparency,
}

/// Everything the window publishes.
///
/// Serializes as `{"action": "..."}` or `{"surface": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundEvent {
    Host { action: HostAction },
    Surface { surface: SurfaceSnapshot },
}

/// Events raised by the display surface itself rather than the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UiEvent {
    /// The user scrolled the content area.
    Scrolled,
    /// The surface is about to unload.
    Closing,
}

/// Deferred work the window asks its runtime to deliver later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// The copy button's feedback period elapsed.
    CopyFeedbackElapsed { generation: u64 },
}

/// A timer request: deliver `event` back to the window after `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub event: TimerEvent,
    pub after: Duration,
}

/// Destination of the copy action.
pub trait ClipboardSink {
    /// Write an HTML payload with its plain-text alternative.
    fn write(&mut self, html: &str, plain: &str) -> Result<()>;
}

/// Discards everything. Used when no system clipboard is wanted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClipboard;

impl ClipboardSink for NoopClipboard {
    fn write(&mut self, _html: &str, _plain: &str) -> Result<()> {
        Ok(())
    }
}

/// The system clipboard via `arboard`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl ClipboardSink for SystemClipboard {
    fn write(&mut self, html: &str, plain: &str) -> Result<()> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| WindowError::Clipboard(e.to_string()))?;
        clipboard
            .set_html(html, Some(plain))
            .map_err(|e| WindowError::Clipboard(e.to_string()))
    }
}

pub struct ResponseWindow<S: StateStore, C: ClipboardSink> {
    ui: UiConfig,
    pipeline: RenderPipeline,
    store: S,
    clipboard: C,
    session: StreamSession,
    controls: Controls,
    surface: Surface,
    /// Surface as it was before the current stream began.
    pre_stream: Option<Surface>,
    /// Document source backing the rendered content.
    source: String,
    copy_generation: u64,
    timers: Vec<Timer>,
    events: broadcast::Sender<OutboundEvent>,
}

impl<S: StateStore, C: ClipboardSink> ResponseWindow<S, C> {
    /// Build a window with the default render pipeline for `config`.
    #[must_use]
    pub fn new(config: &WindowConfig, store: S, clipboard: C) -> Self {
        Self::with_pipeline(config, default_pipeline(&config.render), store, clipboard)
    }

    /// Build a window around an explicit pipeline.
    #[must_use]
    pub fn with_pipeline(
        config: &WindowConfig,
        pipeline: RenderPipeline,
        store: S,
        clipboard: C,
    ) -> Self {
        let (events, _rx) = broadcast::channel(config.runtime.event_capacity.max(1));
        Self {
            ui: config.ui.clone(),
            pipeline,
            store,
            clipboard,
            session: StreamSession::new(),
            controls: Controls::new(),
            surface: Surface::new(),
            pre_stream: None,
            source: String::new(),
            copy_generation: 0,
            timers: Vec::new(),
            events,
        }
    }

    /// Startup bootstrap: re-render the persisted source and restore the
    /// persisted label.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read. Nothing is applied for
    /// a slot that failed to load.
    pub fn restore(&mut self) -> Result<()> {
        if let Some(source) = self.store.load(StateKey::LastSource)? {
            tracing::debug!(bytes = source.len(), "restoring persisted document");
            let html = self.pipeline.render(&source);
            self.surface.show(html);
            self.source = source;
        }

        if let Some(raw) = self.store.load(StateKey::LastLabel)? {
            match HistoryLabel::parse(&raw) {
                Some(label) => self.controls.set_label(label),
                None => tracing::warn!(label = %raw, "ignoring unknown persisted label"),
            }
        }
        Ok(())
    }

    /// Render a complete document and make it the current source.
    pub fn render_markdown(&mut self, content: Option<&str>, show_history_label: bool) {
        let source = match content {
            Some(text) if !text.is_empty() => text.to_owned(),
            _ => self.ui.default_content.clone(),
        };
        self.persist(StateKey::LastSource, &source);

        let html = self.pipeline.render(&source);
        self.surface.show(html);
        self.surface.scroll_to(Scroll::Top);
        self.source = source;
        if self.session.is_active() {
            // A failed stream falls back to this document, not the older one.
            self.pre_stream = Some(self.surface.clone());
        }

        if show_history_label {
            self.set_label(HistoryLabel::ChatHistory);
        }
    }

    /// Begin a stream: disable the controls and show the pending view.
    pub fn stream_start(&mut self, model: Option<String>) {
        let reset = self.session.start(model);
        if !reset || self.pre_stream.is_none() {
            self.pre_stream = Some(self.surface.clone());
        }
        tracing::debug!(model = ?self.session.model(), reset, "stream started");

        self.controls.set_enabled(false);
        self.controls.set_cursor(Cursor::Busy);
        self.surface.show_pending();
    }

    /// Append a fragment and re-render the whole buffer.
    pub fn stream_chunk(&mut self, fragment: &str) {
        let Some(buffer) = self.session.push(fragment) else {
            return;
        };
        let html = self.pipeline.render(buffer);
        if self.surface.update_streaming(html) {
            let scroll = if self.session.auto_scroll() {
                Scroll::Bottom
            } else {
                Scroll::Unchanged
            };
            self.surface.scroll_to(scroll);
        }
    }

    /// End the stream. A no-op when no stream is active.
    pub fn stream_end(&mut self, success: bool) {
        let Some(finish) = self.session.finish(success) else {
            return;
        };
        let pre_stream = self.pre_stream.take();

        match finish {
            Finish::Completed(source) => {
                self.persist(StateKey::LastSource, &source);
                let html = self.pipeline.render(&source);
                self.surface.show(html);
                self.source = source;
                self.emit(OutboundEvent::Host {
                    action: HostAction::RemoveTransparency,
                });
            }
            Finish::Discarded => {
                if let Some(earlier) = pre_stream {
                    self.surface.restore(&earlier);
                }
            }
        }

        self.controls.set_enabled(true);
        self.set_label(HistoryLabel::default());
        self.session.settle();
        tracing::debug!(success, "stream finished");
    }

    /// The user scrolled the content area.
    pub fn user_scrolled(&mut self) {
        self.session.user_scrolled();
    }

    /// Copy the current document, or only acknowledge a copy the host
    /// already made when `copy_as_markdown` is set.
    pub fn copy_action(&mut self, copy_as_markdown: bool) {
        if !copy_as_markdown {
            let plain = if self.session.is_active() {
                self.pipeline.plain_text(self.session.buffer())
            } else {
                self.pipeline.plain_text(&self.source)
            };
            if let Err(e) = self.clipboard.write(self.surface.body().as_str(), &plain) {
                tracing::warn!(error = %e, "clipboard write failed");
                return;
            }
        }

        self.copy_generation = self.copy_generation.wrapping_add(1);
        self.controls.begin_copy_feedback();
        self.timers.push(Timer {
            event: TimerEvent::CopyFeedbackElapsed {
                generation: self.copy_generation,
            },
            after: Duration::from_millis(self.ui.copied_feedback_ms),
        });
    }

    /// Enable or disable every control.
    pub fn set_buttons_enabled(&mut self, enable: bool) {
        self.controls.set_enabled(enable);
    }

    /// Flip the history label; landing on "Chat History" scrolls to the top.
    pub fn toggle_history_label(&mut self, chat_history_text: bool) {
        let label = self.controls.toggle_label();
        tracing::debug!(label = label.as_str(), chat_history_text, "history label toggled");
        if label == HistoryLabel::ChatHistory {
            self.surface.scroll_to(Scroll::Top);
        }
        self.persist(StateKey::LastLabel, label.as_str());
    }

    /// Persist the current label. Called when the surface unloads.
    pub fn persist_label(&mut self) {
        let label = self.controls.label();
        self.persist(StateKey::LastLabel, label.as_str());
    }

    pub fn on_ui(&mut self, event: UiEvent) {
        match event {
            UiEvent::Scrolled => self.user_scrolled(),
            UiEvent::Closing => self.persist_label(),
        }
    }

    pub fn on_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::CopyFeedbackElapsed { generation } => {
                // A newer copy restarted the feedback period.
                if generation == self.copy_generation {
                    self.controls.end_copy_feedback();
                }
            }
        }
    }

    /// Timers requested since the last call.
    pub fn take_timers(&mut self) -> Vec<Timer> {
        std::mem::take(&mut self.timers)
    }

    #[must_use]
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.surface.snapshot(&self.controls)
    }

    /// Publish the current snapshot to subscribers.
    pub fn publish_snapshot(&self) {
        self.emit(OutboundEvent::Surface {
            surface: self.snapshot(),
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<OutboundEvent> {
        self.events.clone()
    }

    #[must_use]
    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    #[must_use]
    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Current document source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn set_label(&mut self, label: HistoryLabel) {
        self.controls.set_label(label);
        self.persist(StateKey::LastLabel, label.as_str());
    }

    fn persist(&mut self, key: StateKey, value: &str) {
        if let Err(e) = self.store.save(key, value) {
            tracing::warn!(key = key.as_str(), error = %e, "failed to persist state");
        }
    }

    fn emit(&self, event: OutboundEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl<S: StateStore, C: ClipboardSink> CallTarget for ResponseWindow<S, C> {
    fn invoke(&mut self, call: Call) {
        match call {
            Call::RenderMarkdown {
                content,
                show_history_label,
            } => self.render_markdown(content.as_deref(), show_history_label),
            Call::StreamStart { model } => self.stream_start(model),
            Call::StreamChunk { fragment } => self.stream_chunk(&fragment),
            Call::StreamEnd { success } => self.stream_end(success),
            Call::CopyButtonAction { copy_as_markdown } => self.copy_action(copy_as_markdown),
            Call::ButtonsEnabled { enable } => self.set_buttons_enabled(enable),
            Call::ToggleButtonText { chat_history_text } => {
                self.toggle_history_label(chat_history_text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CONTENT;
    use crate::controls::COPIED_LABEL;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct RecordingClipboard {
        writes: Vec<(String, String)>,
        fail: bool,
    }

    impl ClipboardSink for RecordingClipboard {
        fn write(&mut self, html: &str, plain: &str) -> Result<()> {
            if self.fail {
                return Err(WindowError::Clipboard("no clipboard".to_owned()));
            }
            self.writes.push((html.to_owned(), plain.to_owned()));
            Ok(())
        }
    }

    fn window() -> ResponseWindow<MemoryStore, RecordingClipboard> {
        ResponseWindow::new(
            &WindowConfig::default(),
            MemoryStore::new(),
            RecordingClipboard::default(),
        )
    }

    fn persisted(
        w: &ResponseWindow<MemoryStore, RecordingClipboard>,
        key: StateKey,
    ) -> Option<String> {
        w.store().load(key).expect("memory store load")
    }

    #[test]
    fn stream_renders_bold_and_resets_controls() {
        let mut w = window();
        let mut events = w.subscribe();

        w.stream_start(Some("gpt".to_owned()));
        assert!(!w.controls().all_enabled());
        assert_eq!(w.controls().cursor(), Cursor::Busy);

        w.stream_chunk("Hello ");
        w.stream_chunk("**world**");
        w.stream_end(true);

        assert_eq!(
            w.surface().to_html(),
            "<p>Hello <strong>world</strong></p>\n"
        );
        assert!(w.controls().all_enabled());
        assert_eq!(w.controls().cursor(), Cursor::Ready);
        assert_eq!(w.controls().label(), HistoryLabel::ChatHistory);
        assert_eq!(
            persisted(&w, StateKey::LastSource).as_deref(),
            Some("Hello **world**")
        );
        assert_eq!(
            events.try_recv().expect("host action"),
            OutboundEvent::Host {
                action: HostAction::RemoveTransparency
            }
        );
    }

    #[test]
    fn failed_stream_restores_prior_content() {
        let mut store = MemoryStore::new();
        store.save(StateKey::LastSource, "old text").expect("seed");
        let mut w = ResponseWindow::new(
            &WindowConfig::default(),
            store,
            RecordingClipboard::default(),
        );
        w.restore().expect("restore");
        let before = w.surface().to_html();
        let mut events = w.subscribe();

        w.stream_start(Some("m".to_owned()));
        w.stream_end(false);

        assert_eq!(w.surface().to_html(), before);
        assert!(before.contains("old text"));
        assert_eq!(persisted(&w, StateKey::LastSource).as_deref(), Some("old text"));
        assert!(w.controls().all_enabled());
        assert!(events.try_recv().is_err(), "no host action on failure");
    }

    #[test]
    fn each_chunk_renders_the_full_buffer() {
        let mut w = window();
        w.stream_start(None);
        w.stream_chunk("- one\n");
        w.stream_chunk("- two\n");
        assert_eq!(
            w.surface().body().as_str(),
            w.pipeline().render("- one\n- two\n").as_str()
        );
        assert!(w.surface().is_streaming());
        assert_eq!(w.surface().scroll(), Scroll::Bottom);
    }

    #[test]
    fn user_scroll_stops_following_the_stream() {
        let mut w = window();
        w.render_markdown(Some("earlier"), false);
        w.stream_start(None);
        w.user_scrolled();
        w.stream_chunk("text");
        assert_eq!(w.surface().scroll(), Scroll::Unchanged);
    }

    #[test]
    fn snapshot_after_revoked_scroll_stops_requesting_bottom() {
        let mut w = window();
        w.stream_start(None);
        w.stream_chunk("one\n\n");
        assert_eq!(w.snapshot().scroll, Scroll::Bottom);

        w.user_scrolled();
        let before = w.snapshot().revision;
        w.stream_chunk("two\n\n");
        let snap = w.snapshot();
        assert!(snap.revision > before);
        assert_eq!(snap.scroll, Scroll::Unchanged);

        w.stream_chunk("three");
        assert_eq!(w.snapshot().scroll, Scroll::Unchanged);
    }

    #[test]
    fn render_during_stream_survives_failed_stream() {
        let mut w = window();
        w.render_markdown(Some("old"), false);
        w.stream_start(None);
        w.render_markdown(Some("new doc"), false);
        w.stream_chunk("partial");
        w.stream_end(false);

        assert_eq!(w.surface().to_html(), "<p>new doc</p>\n");
        assert_eq!(w.source(), "new doc");
        assert_eq!(persisted(&w, StateKey::LastSource).as_deref(), Some("new doc"));

        w.copy_action(false);
        let (html, plain) = &w.clipboard.writes[0];
        assert_eq!(html, "<p>new doc</p>\n");
        assert_eq!(plain, "new doc");
    }

    #[test]
    fn fragments_splitting_markup_render_as_the_whole() {
        let fragments = [
            "Hello **wor",
            "ld**\n\n```ru",
            "st\nfn main() {\n",
            "    let x = 1;\n}\n",
            "```\n\nand $x^",
            "2$ done",
        ];
        let mut w = window();
        w.stream_start(None);
        for fragment in fragments {
            w.stream_chunk(fragment);
            assert_eq!(
                w.surface().body().as_str(),
                w.pipeline().render(w.session().buffer()).as_str()
            );
        }
        w.stream_end(true);

        let whole = fragments.concat();
        assert_eq!(w.surface().to_html(), w.pipeline().render(&whole).as_str());
        assert!(w.surface().to_html().contains("<strong>world</strong>"));
        assert!(w.surface().to_html().contains("data-lang=\"rust\""));
        assert_eq!(persisted(&w, StateKey::LastSource).as_deref(), Some(whole.as_str()));
    }

    #[test]
    fn failed_stream_with_buffered_chunks_keeps_persisted_source() {
        let mut store = MemoryStore::new();
        store.save(StateKey::LastSource, "old text").expect("seed");
        let mut w = ResponseWindow::new(
            &WindowConfig::default(),
            store,
            RecordingClipboard::default(),
        );
        w.restore().expect("restore");

        w.stream_start(Some("m".to_owned()));
        w.stream_chunk("# Half a head");
        w.stream_chunk("ing\n\n```\nunclosed");
        w.stream_end(false);

        assert_eq!(persisted(&w, StateKey::LastSource).as_deref(), Some("old text"));
        assert_eq!(w.source(), "old text");
        assert_eq!(w.surface().to_html(), "<p>old text</p>\n");
        assert!(w.session().buffer().is_empty());
    }

    #[test]
    fn idle_chunk_and_end_change_nothing() {
        let mut w = window();
        w.set_buttons_enabled(false);
        let before = w.snapshot();
        w.stream_chunk("stray");
        w.stream_end(true);
        assert_eq!(w.snapshot(), before);
        assert_eq!(persisted(&w, StateKey::LastSource), None);
    }

    #[test]
    fn empty_render_uses_default_content() {
        let mut w = window();
        w.render_markdown(Some(""), false);
        assert_eq!(persisted(&w, StateKey::LastSource).as_deref(), Some(DEFAULT_CONTENT));
        assert_eq!(w.source(), DEFAULT_CONTENT);
        assert_eq!(w.surface().scroll(), Scroll::Top);
    }

    #[test]
    fn render_with_history_flag_forces_label() {
        let mut w = window();
        w.toggle_history_label(false);
        assert_eq!(w.controls().label(), HistoryLabel::LatestResponse);
        w.render_markdown(Some("# hi"), true);
        assert_eq!(w.controls().label(), HistoryLabel::ChatHistory);
    }

    #[test]
    fn persisted_render_matches_direct_render() {
        let source = "# Title\n\n```rust\nfn main() {}\n```\n\n$x^2$";
        let mut first = window();
        first.render_markdown(Some(source), false);
        let direct = first.surface().to_html();

        let mut reloaded = ResponseWindow::new(
            &WindowConfig::default(),
            first.into_store(),
            RecordingClipboard::default(),
        );
        reloaded.restore().expect("restore");
        assert_eq!(reloaded.surface().to_html(), direct);
    }

    #[test]
    fn toggle_persists_and_scrolls_on_chat_history() {
        let mut w = window();
        w.toggle_history_label(false);
        assert_eq!(
            persisted(&w, StateKey::LastLabel).as_deref(),
            Some("Latest Response")
        );
        w.toggle_history_label(false);
        assert_eq!(w.controls().label(), HistoryLabel::ChatHistory);
        assert_eq!(w.surface().scroll(), Scroll::Top);
    }

    #[test]
    fn restore_applies_persisted_label() {
        let mut store = MemoryStore::new();
        store.save(StateKey::LastLabel, "Latest Response").expect("seed");
        let mut w = ResponseWindow::new(&WindowConfig::default(), store, NoopClipboard);
        w.restore().expect("restore");
        assert_eq!(w.controls().label(), HistoryLabel::LatestResponse);
        assert!(w.surface().body().is_empty());
    }

    #[test]
    fn copy_writes_html_and_plain_text_then_reverts() {
        let mut w = window();
        w.render_markdown(Some("Hello **world**"), false);
        w.copy_action(false);

        assert_eq!(w.clipboard.writes.len(), 1);
        let (html, plain) = &w.clipboard.writes[0];
        assert!(html.contains("<strong>world</strong>"));
        assert_eq!(plain, "Hello world");
        assert_eq!(w.controls().copy_label(), COPIED_LABEL);

        let timers = w.take_timers();
        assert_eq!(timers.len(), 1);
        assert_eq!(timers[0].after, Duration::from_millis(2_000));
        w.on_timer(timers[0].event);
        assert_eq!(w.controls().copy_label(), "Copy");
    }

    #[test]
    fn copy_as_markdown_only_shows_feedback() {
        let mut w = window();
        w.copy_action(true);
        assert!(w.clipboard.writes.is_empty());
        assert_eq!(w.controls().copy_label(), COPIED_LABEL);
    }

    #[test]
    fn failed_copy_changes_nothing() {
        let mut w = ResponseWindow::new(
            &WindowConfig::default(),
            MemoryStore::new(),
            RecordingClipboard {
                fail: true,
                ..RecordingClipboard::default()
            },
        );
        w.copy_action(false);
        assert_eq!(w.controls().copy_label(), "Copy");
        assert!(w.take_timers().is_empty());
    }

    #[test]
    fn stale_copy_timer_is_ignored() {
        let mut w = window();
        w.copy_action(true);
        let first = w.take_timers()[0].event;
        w.copy_action(true);
        w.on_timer(first);
        assert_eq!(w.controls().copy_label(), COPIED_LABEL);
    }

    #[test]
    fn closing_persists_label() {
        let mut w = window();
        w.on_ui(UiEvent::Closing);
        assert_eq!(persisted(&w, StateKey::LastLabel).as_deref(), Some("Chat History"));
    }

    #[test]
    fn outbound_wire_shapes() {
        let host = OutboundEvent::Host {
            action: HostAction::RemoveTransparency,
        };
        assert_eq!(
            serde_json::to_string(&host).expect("serialize in test"),
            r#"{"action":"removeTransparency"}"#
        );
        let surface = OutboundEvent::Surface {
            surface: window().snapshot(),
        };
        let json = serde_json::to_value(&surface).expect("serialize in test");
        assert!(json["surface"].is_object());
    }
}
