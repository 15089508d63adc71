//! Incremental compilation of Storyloom scripts.
//!
//! A change to any file flows through this crate as follows:
//!
//! 1. [`BuildPipeline::handle_change`] asks the [`DependencyTracker`] which roots
//!    include the changed file.
//! 2. For each root, the [`CompilationDriver`] clears the root's old edges, loads
//!    its text through the [`SourceLoader`], and compiles it, recording every
//!    include the compiler resolves.
//! 3. The [`ModuleGenerator`] wraps each artifact into a [`StoryModule`], ready to
//!    be delivered to a live session.

/// Build configuration (`loom.toml`).
pub mod config;
/// Compilation of a single root with include tracking.
pub mod driver;
/// Error types.
pub mod error;
/// Document loading and preprocessing.
pub mod loader;
/// Runtime units wrapping artifacts.
pub mod module;
/// Path normalization.
pub mod paths;
/// Change handling across roots.
pub mod pipeline;
/// Reverse dependency index.
pub mod tracker;

pub use config::{BuildConfig, BuildOptions};
pub use driver::{CollectingReporter, CompilationDriver, Reporter, TracingReporter};
pub use error::{BuildError, BuildResult, ConfigError, ConfigResult, LoadError};
pub use loader::{CommandPreprocessor, Preprocessor, SourceLoader};
pub use module::{ModuleGenerator, ModuleId, StoryModule};
pub use paths::normalize_path;
pub use pipeline::{BuildPipeline, RootUpdate};
pub use tracker::{DependencyTracker, PathSet};
