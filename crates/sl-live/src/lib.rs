//! Keeping a player's place in a story while its source is being edited.
//!
//! The host delivers every rebuilt [`StoryModule`](sl_build::StoryModule) to a
//! [`HotContext`], which hands a fresh story to the registered callback. The
//! callback usually forwards it to [`LiveSession::reload`], which replays the
//! player's decisions against the new story and falls back to live play when
//! they no longer fit.

/// Error types.
pub mod error;
/// Delivery of rebuilt units.
pub mod hot;
/// Decision history.
pub mod record;
/// Replay state machine.
pub mod replay;
/// Interactive sessions and rendering.
pub mod session;

pub use error::{LiveError, LiveResult, ReplayDivergence};
pub use hot::{HotContext, HotUpdate, NO_CALLBACK_REASON, NO_MODULE_REASON, ReloadCallback};
pub use record::ChoiceRecord;
pub use replay::{Replay, ReplayStep};
pub use session::{Entry, LiveSession, Phase, ReloadReport, Renderer, Transcript, fallback_notice};
