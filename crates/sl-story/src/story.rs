use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::artifact::{ChoicePoint, Step, StoryArtifact, Target, Value};
use crate::error::{StoryError, StoryResult};

/// Upper bound on consecutive non-text steps before the story is stopped.
/// Catches knots that divert to each other without ever producing output.
const MAX_SILENT_STEPS: usize = 10_000;

/// A choice currently on offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Position in [`Story::current_choices`]; pass this to [`Story::choose_choice_index`].
    pub index: usize,
    /// Text shown to the player.
    pub text: String,
    id: String,
    target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Position {
    knot: String,
    step: usize,
}

/// A running story built from a compiled artifact.
///
/// The story is driven in two alternating phases: read paragraphs while
/// [`can_continue`](Self::can_continue) is true, then pick one of the
/// [`current_choices`](Self::current_choices). Execution is deterministic, so
/// the same artifact and the same choice indices always lead to the same place.
#[derive(Debug, Clone)]
pub struct Story {
    artifact: Arc<StoryArtifact>,
    position: Option<Position>,
    pending: Option<String>,
    choices: Vec<Choice>,
    visits: HashMap<String, u32>,
    taken: HashSet<String>,
    variables: BTreeMap<String, Value>,
}

impl Story {
    /// Start a new play-through of `artifact`.
    ///
    /// Fails if the artifact references knots it does not define.
    pub fn new(artifact: Arc<StoryArtifact>) -> StoryResult<Self> {
        artifact.validate()?;
        check_targets(&artifact)?;

        let mut story = Self {
            variables: artifact.globals.clone(),
            artifact,
            position: None,
            pending: None,
            choices: Vec::new(),
            visits: HashMap::new(),
            taken: HashSet::new(),
        };
        let start = story.artifact.start.clone();
        story.enter(&start);
        story.settle();
        Ok(story)
    }

    /// The artifact this story runs.
    pub fn artifact(&self) -> &Arc<StoryArtifact> {
        &self.artifact
    }

    /// Returns `true` if another paragraph is ready.
    pub fn can_continue(&self) -> bool {
        self.pending.is_some()
    }

    /// Return the next paragraph, or `None` if the story is waiting on a choice or has ended.
    pub fn continue_line(&mut self) -> Option<String> {
        let line = self.pending.take()?;
        self.settle();
        Some(line)
    }

    /// Read every paragraph up to the next choice point (or the end).
    pub fn continue_maximally(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.continue_line() {
            lines.push(line);
        }
        lines
    }

    /// Choices on offer at the current position.
    pub fn current_choices(&self) -> &[Choice] {
        &self.choices
    }

    /// Take the choice at `index` and move the story forward.
    pub fn choose_choice_index(&mut self, index: usize) -> StoryResult<()> {
        if index >= self.choices.len() {
            return Err(StoryError::ChoiceOutOfRange {
                index,
                available: self.choices.len(),
            });
        }

        let choice = self.choices.swap_remove(index);
        self.choices.clear();
        debug!(index, choice = %choice.text, "choice taken");

        self.taken.insert(choice.id);
        match choice.target {
            Target::Knot(name) => self.enter(&name),
            Target::End => self.position = None,
        }
        self.settle();
        Ok(())
    }

    /// Returns `true` once there is nothing left to read or choose.
    pub fn has_ended(&self) -> bool {
        self.position.is_none() && self.pending.is_none() && self.choices.is_empty()
    }

    /// Knot the story is currently in, if it has not ended.
    pub fn current_knot(&self) -> Option<&str> {
        self.position.as_ref().map(|p| p.knot.as_str())
    }

    /// How many times the knot has been entered.
    pub fn visit_count(&self, knot: &str) -> u32 {
        self.visits.get(knot).copied().unwrap_or(0)
    }

    /// Current value of a variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    fn enter(&mut self, knot: &str) {
        *self.visits.entry(knot.to_string()).or_insert(0) += 1;
        self.position = Some(Position {
            knot: knot.to_string(),
            step: 0,
        });
    }

    /// Run non-text steps until a paragraph is pending, choices are offered, or the story ends.
    fn settle(&mut self) {
        let artifact = Arc::clone(&self.artifact);

        for _ in 0..MAX_SILENT_STEPS {
            let Some(position) = self.position.as_mut() else {
                return;
            };
            let step = artifact
                .knot(&position.knot)
                .and_then(|knot| knot.steps.get(position.step));

            match step {
                None => {
                    // ran off the end of the knot
                    self.position = None;
                    return;
                }
                Some(Step::Text(text)) => {
                    position.step += 1;
                    self.pending = Some(self.interpolate(text));
                    return;
                }
                Some(Step::Set { name, value }) => {
                    position.step += 1;
                    self.variables.insert(name.clone(), value.clone());
                }
                Some(Step::Divert(Target::Knot(name))) => self.enter(name),
                Some(Step::Divert(Target::End)) => {
                    self.position = None;
                    return;
                }
                Some(Step::Choices(points)) => {
                    self.offer(points);
                    if self.choices.is_empty() {
                        self.position = None;
                    }
                    return;
                }
            }
        }

        warn!(
            knot = ?self.current_knot(),
            "story stopped after {MAX_SILENT_STEPS} steps without output"
        );
        self.position = None;
    }

    fn offer(&mut self, points: &[ChoicePoint]) {
        self.choices = points
            .iter()
            .filter(|p| p.sticky || !self.taken.contains(&p.id))
            .filter(|p| p.condition.as_deref().is_none_or(|c| self.holds(c)))
            .enumerate()
            .map(|(index, p)| Choice {
                index,
                text: self.interpolate(&p.text),
                id: p.id.clone(),
                target: p.target.clone(),
            })
            .collect();
    }

    fn holds(&self, condition: &str) -> bool {
        match self.variables.get(condition) {
            Some(value) => value.is_truthy(),
            None => self.visit_count(condition) > 0,
        }
    }

    fn interpolate(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    match self.variables.get(name) {
                        Some(value) => out.push_str(&value.to_string()),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Reject artifacts whose diverts or choices point at missing knots.
fn check_targets(artifact: &StoryArtifact) -> StoryResult<()> {
    let missing = |target: &Target| match target {
        Target::Knot(name) if !artifact.knots.contains_key(name) => Some(name.clone()),
        _ => None,
    };

    for knot in artifact.knots.values() {
        for step in &knot.steps {
            let unknown = match step {
                Step::Divert(target) => missing(target),
                Step::Choices(points) => points.iter().find_map(|p| missing(&p.target)),
                Step::Text(_) | Step::Set { .. } => None,
            };
            if let Some(name) = unknown {
                return Err(StoryError::UnknownKnot(name));
            }
        }
    }
    Ok(())
}
