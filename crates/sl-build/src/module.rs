//! Runtime units wrapping compiled artifacts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sl_story::{Story, StoryArtifact, StoryResult};
use tracing::debug;
use uuid::Uuid;

use crate::config::DEFAULT_TEST_FILE_NAME_REGEX;
use crate::error::BuildResult;

/// Identity of one generated unit. Every generation gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId(pub Uuid);

impl ModuleId {
    /// Generate a new random module ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// A compiled root, ready to be delivered to a live session.
///
/// Clones share the artifact and keep the same [`ModuleId`], so a clone
/// delivered twice is recognized as a duplicate.
#[derive(Debug, Clone)]
pub struct StoryModule {
    id: ModuleId,
    root: PathBuf,
    artifact: Arc<StoryArtifact>,
    harness: Option<String>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    id: ModuleId,
    root: &'a Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    harness: Option<&'a str>,
    artifact: &'a StoryArtifact,
}

#[derive(Deserialize)]
struct Envelope {
    id: ModuleId,
    root: PathBuf,
    #[serde(default)]
    harness: Option<String>,
    artifact: StoryArtifact,
}

impl StoryModule {
    /// Unit identity.
    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// The root document the unit was compiled from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The compiled artifact.
    pub fn artifact(&self) -> &Arc<StoryArtifact> {
        &self.artifact
    }

    /// Test harness fragment, present only for test-designated roots.
    pub fn harness(&self) -> Option<&str> {
        self.harness.as_deref()
    }

    /// Construct a fresh story instance from the artifact.
    pub fn story(&self) -> StoryResult<Story> {
        Story::new(Arc::clone(&self.artifact))
    }

    /// Serialize the unit into a self-contained JSON envelope.
    pub fn to_source(&self) -> BuildResult<String> {
        let envelope = EnvelopeRef {
            id: self.id,
            root: &self.root,
            harness: self.harness.as_deref(),
            artifact: &self.artifact,
        };
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Read a unit back from [`to_source`](Self::to_source) output.
    ///
    /// The identity is preserved, and the artifact is checked against the runtime.
    pub fn from_source(source: &str) -> BuildResult<Self> {
        let envelope: Envelope = serde_json::from_str(source)?;
        envelope.artifact.validate()?;
        Ok(Self {
            id: envelope.id,
            root: envelope.root,
            artifact: Arc::new(envelope.artifact),
            harness: envelope.harness,
        })
    }
}

/// Wraps compiled artifacts into [`StoryModule`]s.
#[derive(Debug, Clone)]
pub struct ModuleGenerator {
    harness: Option<String>,
    test_pattern: Regex,
}

impl Default for ModuleGenerator {
    fn default() -> Self {
        Self {
            harness: None,
            test_pattern: DEFAULT_TEST_FILE_NAME_REGEX.clone(),
        }
    }
}

impl ModuleGenerator {
    /// Generator that never attaches a harness.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `harness` to units whose root path matches `test_pattern`.
    pub fn with_harness(mut self, harness: impl Into<String>, test_pattern: Regex) -> Self {
        self.harness = Some(harness.into());
        self.test_pattern = test_pattern;
        self
    }

    /// Returns `true` if `root` is designated as a test root.
    pub fn is_test_root(&self, root: &Path) -> bool {
        self.test_pattern.is_match(&root.to_string_lossy())
    }

    /// Wrap `artifact`, compiled from `root`, into a new unit.
    pub fn generate(&self, root: &Path, artifact: StoryArtifact) -> StoryModule {
        let harness = self.harness.clone().filter(|_| self.is_test_root(root));
        let module = StoryModule {
            id: ModuleId::new(),
            root: root.to_path_buf(),
            artifact: Arc::new(artifact),
            harness,
        };
        debug!(id = %module.id, root = %root.display(), harness = module.harness.is_some(), "generated module");
        module
    }
}
