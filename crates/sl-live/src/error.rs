//! Error types for live sessions.

use sl_story::StoryError;
use thiserror::Error;

/// Result type for live session operations.
pub type LiveResult<T> = Result<T, LiveError>;

/// A recorded decision that cannot be applied to the replacement story.
///
/// Recovered by the session through fallback; never propagated past it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decision {decision} (choice {index}) is no longer available: {available} choices on offer")]
pub struct ReplayDivergence {
    /// Position of the decision in the record, starting at zero.
    pub decision: usize,
    /// The recorded choice index.
    pub index: usize,
    /// How many choices the new story offered at that point.
    pub available: usize,
}

/// Errors surfaced to the host of a live session.
#[derive(Debug, Error)]
pub enum LiveError {
    /// A decision was made before any story was started.
    #[error("no story is running")]
    NotStarted,

    /// The story rejected an operation.
    #[error(transparent)]
    Story(#[from] StoryError),
}
