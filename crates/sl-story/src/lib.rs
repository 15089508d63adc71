//! Compiled story artifacts and the runtime story instance.
//!
//! A [`StoryArtifact`] is the serialized output of the script compiler. It is
//! inert data: every play-through builds a fresh [`Story`] from it, and the
//! story owns all navigation state (current position, visit counts, variables).

/// Serializable compiled story representation.
pub mod artifact;
/// Error types used throughout the crate.
pub mod error;
/// The runtime story instance.
pub mod story;

/// Re-export artifact types.
pub use artifact::{ARTIFACT_FORMAT, ChoicePoint, Knot, ROOT_KNOT, Step, StoryArtifact, Target, Value};
/// Re-export error types.
pub use error::{StoryError, StoryResult};
/// Re-export runtime types.
pub use story::{Choice, Story};
