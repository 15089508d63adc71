use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{StoryError, StoryResult};

/// Format number written into every artifact; bumped on incompatible changes.
pub const ARTIFACT_FORMAT: u32 = 1;

/// Name of the implicit flow holding content written before the first knot.
pub const ROOT_KNOT: &str = "_root";

/// A literal value stored in a story variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// `true` / `false`.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A string literal.
    Str(String),
}

impl Value {
    /// Truthiness used by choice conditions: `false`, `0` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
        }
    }
}

/// Where a divert or a choice leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// Jump to the named knot.
    Knot(String),
    /// Finish the story.
    End,
}

/// One selectable option inside a choice block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoicePoint {
    /// Stable identifier (`knot.n`), used to remember once-only choices.
    pub id: String,
    /// Text shown to the player.
    pub text: String,
    /// Sticky choices (`+`) stay available after being taken.
    #[serde(default)]
    pub sticky: bool,
    /// Variable or knot name that must be truthy / visited for the choice to show.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Destination once chosen.
    pub target: Target,
}

/// A single instruction in a knot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Emit one paragraph of text. `{name}` is replaced by the variable value.
    Text(String),
    /// Continue at another knot, or end.
    Divert(Target),
    /// Assign a variable.
    Set {
        /// Variable name.
        name: String,
        /// New value.
        value: Value,
    },
    /// Stop and offer choices to the player.
    Choices(Vec<ChoicePoint>),
}

/// A named section of narrative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Knot {
    /// Instructions executed in order.
    pub steps: Vec<Step>,
}

/// The compiled, serialized form of a root document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryArtifact {
    /// Runtime format number; see [`ARTIFACT_FORMAT`].
    pub format: u32,
    /// Knot where play begins.
    pub start: String,
    /// All knots by name.
    pub knots: BTreeMap<String, Knot>,
    /// Declared variables with their initial values.
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,
}

impl Default for StoryArtifact {
    fn default() -> Self {
        let mut knots = BTreeMap::new();
        knots.insert(ROOT_KNOT.to_string(), Knot::default());
        Self {
            format: ARTIFACT_FORMAT,
            start: ROOT_KNOT.to_string(),
            knots,
            globals: BTreeMap::new(),
        }
    }
}

impl StoryArtifact {
    /// Look up a knot by name.
    pub fn knot(&self, name: &str) -> Option<&Knot> {
        self.knots.get(name)
    }

    /// Serialize to a compact JSON string.
    pub fn to_json(&self) -> StoryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an artifact and check its format number and start knot.
    pub fn from_json(json: &str) -> StoryResult<Self> {
        let artifact: Self = serde_json::from_str(json)?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Check that the artifact can be run by this runtime.
    pub fn validate(&self) -> StoryResult<()> {
        if self.format != ARTIFACT_FORMAT {
            return Err(StoryError::UnsupportedFormat {
                found: self.format,
                expected: ARTIFACT_FORMAT,
            });
        }
        if !self.knots.contains_key(&self.start) {
            return Err(StoryError::UnknownKnot(self.start.clone()));
        }
        Ok(())
    }
}
