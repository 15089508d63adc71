//! The ordered history of decisions made in a session.

/// Append-only record of choice indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceRecord {
    decisions: Vec<usize>,
}

impl ChoiceRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a decision.
    pub fn push(&mut self, index: usize) {
        self.decisions.push(index);
    }

    /// Copy the decisions out and leave the record empty.
    pub fn take(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.decisions)
    }

    /// Forget every decision.
    pub fn clear(&mut self) {
        self.decisions.clear();
    }

    /// The decisions so far, oldest first.
    pub fn decisions(&self) -> &[usize] {
        &self.decisions
    }

    /// Number of decisions.
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Returns `true` if no decision has been made.
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

impl From<Vec<usize>> for ChoiceRecord {
    fn from(decisions: Vec<usize>) -> Self {
        Self { decisions }
    }
}
