//! Host message dispatch.
//!
//! The host posts envelopes `{ "target": name, "data": value | [values] }`.
//! Targets resolve against a fixed allow-list of [`Operation`]s; array data
//! is spread into positional arguments, anything else is the sole argument.
//! Arguments are coerced the way the host's scripting side expects
//! (truthiness for flags, textual form for strings) into a typed [`Call`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound host envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub target: String,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    #[must_use]
    pub fn new(target: impl Into<String>, data: Value) -> Self {
        Self {
            target: target.into(),
            data,
        }
    }

    /// Parse an envelope from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidEnvelope`] for malformed JSON.
    pub fn from_json(raw: &str) -> Result<Self, DispatchError> {
        serde_json::from_str(raw).map_err(|e| DispatchError::InvalidEnvelope(e.to_string()))
    }

    /// Positional arguments carried by `data`.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        match &self.data {
            Value::Array(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

/// Dispatch failures. None of them are fatal to the surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("function \"{0}\" does not exist")]
    UnknownOperation(String),

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("operation \"{0}\" registered twice")]
    DuplicateOperation(&'static str),
}

/// Allow-listed operations the host may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    RenderMarkdown,
    StreamStart,
    StreamChunk,
    StreamEnd,
    CopyButtonAction,
    ButtonsEnabled,
    ToggleButtonText,
}

impl Operation {
    pub const ALL: [Self; 7] = [
        Self::RenderMarkdown,
        Self::StreamStart,
        Self::StreamChunk,
        Self::StreamEnd,
        Self::CopyButtonAction,
        Self::ButtonsEnabled,
        Self::ToggleButtonText,
    ];

    /// Wire name used as the envelope target.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RenderMarkdown => "renderMarkdown",
            Self::StreamStart => "streamStart",
            Self::StreamChunk => "streamChunk",
            Self::StreamEnd => "streamEnd",
            Self::CopyButtonAction => "responseWindowCopyButtonAction",
            Self::ButtonsEnabled => "responseWindowButtonsEnabled",
            Self::ToggleButtonText => "toggleButtonText",
        }
    }

    /// Bind positional arguments into a typed call.
    #[must_use]
    pub fn bind(self, args: &[Value]) -> Call {
        let arg = |i: usize| args.get(i);
        match self {
            Self::RenderMarkdown => Call::RenderMarkdown {
                content: text(arg(0)),
                show_history_label: truthy(arg(1)),
            },
            Self::StreamStart => Call::StreamStart {
                model: text(arg(0)),
            },
            Self::StreamChunk => Call::StreamChunk {
                fragment: text(arg(0)).unwrap_or_default(),
            },
            Self::StreamEnd => Call::StreamEnd {
                success: truthy(arg(0)),
            },
            Self::CopyButtonAction => Call::CopyButtonAction {
                copy_as_markdown: truthy(arg(0)),
            },
            Self::ButtonsEnabled => Call::ButtonsEnabled {
                enable: truthy(arg(0)),
            },
            Self::ToggleButtonText => Call::ToggleButtonText {
                chat_history_text: truthy(arg(0)),
            },
        }
    }
}

/// A resolved operation with its bound arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RenderMarkdown {
        content: Option<String>,
        show_history_label: bool,
    },
    StreamStart {
        model: Option<String>,
    },
    StreamChunk {
        fragment: String,
    },
    StreamEnd {
        success: bool,
    },
    CopyButtonAction {
        copy_as_markdown: bool,
    },
    ButtonsEnabled {
        enable: bool,
    },
    ToggleButtonText {
        chat_history_text: bool,
    },
}

/// Receiver of dispatched calls.
pub trait CallTarget {
    fn invoke(&mut self, call: Call);
}

/// Name → operation table, built once and validated at construction.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: HashMap<&'static str, Operation>,
}

impl Dispatcher {
    /// Build the dispatcher over the full allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateOperation`] if two operations share a wire name.
    pub fn new() -> Result<Self, DispatchError> {
        Self::with_operations(&Operation::ALL)
    }

    /// Build a dispatcher exposing only `operations`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::DuplicateOperation`] if a wire name repeats.
    pub fn with_operations(operations: &[Operation]) -> Result<Self, DispatchError> {
        let mut table = HashMap::with_capacity(operations.len());
        for op in operations {
            if table.insert(op.as_str(), *op).is_some() {
                return Err(DispatchError::DuplicateOperation(op.as_str()));
            }
        }
        Ok(Self { table })
    }

    /// Look up an allow-listed operation by wire name.
    #[must_use]
    pub fn resolve(&self, target: &str) -> Option<Operation> {
        self.table.get(target).copied()
    }

    /// Resolve and bind an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownOperation`] for targets outside the allow-list.
    pub fn bind(&self, envelope: &Envelope) -> Result<Call, DispatchError> {
        let op = self
            .resolve(&envelope.target)
            .ok_or_else(|| DispatchError::UnknownOperation(envelope.target.clone()))?;
        Ok(op.bind(envelope.args()))
    }

    /// Resolve `envelope` and invoke it on `target`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownOperation`] without invoking anything
    /// when the target is not allow-listed.
    pub fn dispatch<T: CallTarget>(
        &self,
        envelope: &Envelope,
        target: &mut T,
    ) -> Result<(), DispatchError> {
        let call = self.bind(envelope)?;
        tracing::trace!(operation = %envelope.target, ?call, "dispatching host call");
        target.invoke(call);
        Ok(())
    }

    /// Wire names currently exposed to the host, sorted.
    #[must_use]
    pub fn exposed(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.table.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Host-script truthiness: null, false, 0, NaN and "" are false.
fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}

/// Textual form of an argument; absent for null or missing.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
