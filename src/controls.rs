//! UI control surface: the fixed action buttons, the history toggle label,
//! copy-button feedback, and the pointer cursor.

use serde::{Deserialize, Serialize};

/// Text of the copy button at rest.
pub const COPY_LABEL: &str = "Copy";

/// Text of the copy button right after a successful copy.
pub const COPIED_LABEL: &str = "Copied!";

/// The fixed set of action controls, addressed by their surface ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlId {
    #[serde(rename = "chatButton")]
    Chat,
    #[serde(rename = "copyButton")]
    Copy,
    #[serde(rename = "retryButton")]
    Retry,
    #[serde(rename = "chatHistoryButton")]
    ChatHistory,
}

impl ControlId {
    pub const ALL: [Self; 4] = [Self::Chat, Self::Copy, Self::Retry, Self::ChatHistory];
}

/// Two-valued label of the history toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryLabel {
    #[default]
    #[serde(rename = "Chat History")]
    ChatHistory,
    #[serde(rename = "Latest Response")]
    LatestResponse,
}

impl HistoryLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChatHistory => "Chat History",
            Self::LatestResponse => "Latest Response",
        }
    }

    /// Parse persisted label text.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Chat History" => Some(Self::ChatHistory),
            "Latest Response" => Some(Self::LatestResponse),
            _ => None,
        }
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::ChatHistory => Self::LatestResponse,
            Self::LatestResponse => Self::ChatHistory,
        }
    }
}

/// Pointer affordance over the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    Ready,
    Busy,
}

/// Enabled state of the control set plus the labels that vary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    enabled: bool,
    copy_feedback: bool,
    label: HistoryLabel,
    cursor: Cursor,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            enabled: true,
            copy_feedback: false,
            label: HistoryLabel::default(),
            cursor: Cursor::default(),
        }
    }
}

impl Controls {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable every control at once. Enabling also resets the cursor.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.cursor = Cursor::Ready;
        }
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    /// Whether `id` currently accepts clicks.
    ///
    /// The copy button stays disabled while its feedback is showing.
    #[must_use]
    pub fn is_enabled(&self, id: ControlId) -> bool {
        match id {
            ControlId::Copy => self.enabled && !self.copy_feedback,
            _ => self.enabled,
        }
    }

    #[must_use]
    pub fn all_enabled(&self) -> bool {
        ControlId::ALL.iter().all(|id| self.is_enabled(*id))
    }

    #[must_use]
    pub fn label(&self) -> HistoryLabel {
        self.label
    }

    /// Flip the history label and return the new value.
    pub fn toggle_label(&mut self) -> HistoryLabel {
        self.label = self.label.toggled();
        self.label
    }

    pub fn set_label(&mut self, label: HistoryLabel) {
        self.label = label;
    }

    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Show "Copied!" and hold the copy button disabled.
    pub fn begin_copy_feedback(&mut self) {
        self.copy_feedback = true;
    }

    /// Restore the copy button after its feedback delay.
    pub fn end_copy_feedback(&mut self) {
        self.copy_feedback = false;
    }

    #[must_use]
    pub fn copy_label(&self) -> &'static str {
        if self.copy_feedback {
            COPIED_LABEL
        } else {
            COPY_LABEL
        }
    }
}
