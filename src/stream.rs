//! Stream session state machine.
//!
//! `Idle → Active → Finalizing → Idle`. The host channel gives no
//! exactly-once guarantee for start/end signals, so every transition is
//! tolerant: fragments and finishes outside `Active` are ignored, and a start
//! while `Active` resets the session.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamState {
    #[default]
    Idle,
    Active,
    Finalizing,
}

/// Result of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finish {
    /// The stream completed; the buffer is the new document source.
    Completed(String),
    /// The stream failed; the buffered fragments were discarded.
    Discarded,
}

/// Owns the stream buffer and the auto-scroll flag.
#[derive(Debug, Clone, Default)]
pub struct StreamSession {
    state: StreamState,
    buffer: String,
    auto_scroll: bool,
    model: Option<String>,
    chunks: usize,
}

impl StreamSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == StreamState::Active
    }

    /// Accumulated text of the current session.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Model named by the host when the session started.
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Begin a session. Returns `true` if an active session was reset.
    pub fn start(&mut self, model: Option<String>) -> bool {
        let reset = self.is_active();
        if reset {
            tracing::debug!(
                chunks = self.chunks,
                "stream start while active; resetting session"
            );
        }
        self.state = StreamState::Active;
        self.buffer.clear();
        self.auto_scroll = true;
        self.chunks = 0;
        self.model = model;
        reset
    }

    /// Append a fragment. Returns the full buffer to render, or `None` when
    /// no session is active.
    pub fn push(&mut self, fragment: &str) -> Option<&str> {
        if !self.is_active() {
            tracing::debug!(state = ?self.state, "stream chunk outside active session ignored");
            return None;
        }
        self.buffer.push_str(fragment);
        self.chunks += 1;
        Some(self.buffer.as_str())
    }

    /// The user scrolled the content area; revokes auto-scroll until the next start.
    pub fn user_scrolled(&mut self) {
        if self.is_active() && self.auto_scroll {
            tracing::debug!("user scroll revoked auto-scroll");
            self.auto_scroll = false;
        }
    }

    /// Move `Active → Finalizing` and hand back the outcome.
    ///
    /// Returns `None` when no session is active. The caller applies the
    /// outcome and then calls [`StreamSession::settle`].
    pub fn finish(&mut self, success: bool) -> Option<Finish> {
        if !self.is_active() {
            tracing::debug!(state = ?self.state, "stream end outside active session ignored");
            return None;
        }
        self.state = StreamState::Finalizing;
        let buffer = std::mem::take(&mut self.buffer);
        tracing::debug!(success, chunks = self.chunks, bytes = buffer.len(), "stream finishing");
        Some(if success {
            Finish::Completed(buffer)
        } else {
            Finish::Discarded
        })
    }

    /// Complete finalization: `Finalizing → Idle`.
    pub fn settle(&mut self) {
        if self.state == StreamState::Finalizing {
            self.state = StreamState::Idle;
            self.model = None;
        }
    }
}
