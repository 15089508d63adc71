//! Re-applying recorded decisions to a replacement story.
//!
//! [`Replay`] is a cursor over the recorded decisions. Each [`Replay::step`]
//! reads the story up to its next choice point and applies one decision.
//! It never renders anything; the caller decides what to do with the text.

use sl_story::{Story, StoryError};
use tracing::debug;

use crate::error::ReplayDivergence;

/// Result of one replay step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStep {
    /// The decision was applied.
    Applied {
        /// The applied choice index.
        index: usize,
        /// Paragraphs read before the decision point.
        text: Vec<String>,
    },
    /// The decision does not fit the story. Remaining decisions are discarded.
    Diverged {
        /// What went wrong.
        divergence: ReplayDivergence,
        /// Paragraphs read before the decision point.
        text: Vec<String>,
    },
    /// Every decision has been applied. The story was not advanced.
    Exhausted,
}

/// Cursor over recorded decisions.
#[derive(Debug, Clone)]
pub struct Replay {
    decisions: Vec<usize>,
    cursor: usize,
}

impl Replay {
    /// Replay `decisions` in order.
    pub fn new(decisions: Vec<usize>) -> Self {
        Self { decisions, cursor: 0 }
    }

    /// Decisions not yet applied.
    pub fn remaining(&self) -> &[usize] {
        &self.decisions[self.cursor..]
    }

    /// Number of decisions applied so far.
    pub fn applied(&self) -> usize {
        self.cursor
    }

    /// Advance `story` to its next choice point and apply the next decision.
    pub fn step(&mut self, story: &mut Story) -> ReplayStep {
        let Some(&index) = self.decisions.get(self.cursor) else {
            return ReplayStep::Exhausted;
        };

        let text = story.continue_maximally();
        match story.choose_choice_index(index) {
            Ok(()) => {
                self.cursor += 1;
                ReplayStep::Applied { index, text }
            }
            Err(e) => {
                let available = match e {
                    StoryError::ChoiceOutOfRange { available, .. } => available,
                    _ => story.current_choices().len(),
                };
                let divergence = ReplayDivergence {
                    decision: self.cursor,
                    index,
                    available,
                };
                debug!(%divergence, discarded = self.decisions.len() - self.cursor, "replay diverged");
                self.cursor = self.decisions.len();
                ReplayStep::Diverged { divergence, text }
            }
        }
    }
}
