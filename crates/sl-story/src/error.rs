/// Alias for `Result<T, StoryError>`.
pub type StoryResult<T> = Result<T, StoryError>;

/// Errors raised while loading an artifact or navigating a story.
#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    /// The requested choice index is not in the current choice set.
    #[error("choice index {index} is out of range ({available} choices available)")]
    ChoiceOutOfRange {
        /// The index that was requested.
        index: usize,
        /// How many choices were on offer.
        available: usize,
    },

    /// A divert points at a knot the artifact does not contain.
    #[error("unknown knot: \"{0}\"")]
    UnknownKnot(String),

    /// The artifact was produced for a different runtime format.
    #[error("unsupported artifact format {found} (expected {expected})")]
    UnsupportedFormat {
        /// Format number stored in the artifact.
        found: u32,
        /// Format number this runtime understands.
        expected: u32,
    },

    /// The artifact could not be (de)serialized.
    #[error("artifact serialization error: {0}")]
    Artifact(#[from] serde_json::Error),
}
