//! Response window: a streaming markdown display surface driven by a host
//! application over a message channel.
//!
//! # Architecture
//!
//! Everything enters through one single-consumer queue and is processed
//! run-to-completion:
//!
//! - **Dispatch**: host envelopes are resolved against a fixed allow-list
//!   of operations and their arguments bound into typed calls
//! - **Stream session**: `Idle → Active → Finalizing → Idle`, re-rendering
//!   the full buffer on every fragment
//! - **Render**: markdown → HTML via `pulldown-cmark`, with `syntect` code
//!   highlighting, KaTeX math markup and bare-URL linkification
//! - **Store**: the last document source and history label survive restarts
//! - **Controls / surface**: the button set, copy feedback and the content
//!   area, published as serializable snapshots

pub mod bridge;
pub mod config;
pub mod controls;
pub mod dispatch;
pub mod error;
pub mod paths;
pub mod render;
pub mod runtime;
pub mod store;
pub mod stream;
pub mod surface;
pub mod window;

pub use config::WindowConfig;
pub use dispatch::{Call, DispatchError, Dispatcher, Envelope, Operation};
pub use error::{Result, WindowError};
pub use render::{RenderPipeline, RenderedHtml};
pub use runtime::{Inbound, WindowHandle, WindowRuntime, window_channel};
pub use store::{FileStore, MemoryStore, StateKey, StateStore};
pub use stream::{StreamSession, StreamState};
pub use surface::{Scroll, SurfaceSnapshot};
pub use window::{OutboundEvent, ResponseWindow, UiEvent};
