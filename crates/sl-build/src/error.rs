//! Error types for loading, configuration, and builds.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Failure to produce the text of a document.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist.
    #[error("file not found: {}", path.display())]
    NotFound {
        /// The missing file.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Access {
        /// The unreadable file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The preprocessor registered for the file's extension failed.
    #[error("cannot preprocess {}: {message}", path.display())]
    Transform {
        /// The file being preprocessed.
        path: PathBuf,
        /// What the preprocessor reported.
        message: String,
    },
}

impl LoadError {
    /// The document the failure is attributed to.
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound { path } | Self::Access { path, .. } | Self::Transform { path, .. } => path,
        }
    }

    /// The failure without the path, for messages that already name it.
    pub fn reason(&self) -> String {
        match self {
            Self::NotFound { .. } => "file not found".to_string(),
            Self::Access { source, .. } => source.to_string(),
            Self::Transform { message, .. } => format!("preprocessing failed: {message}"),
        }
    }
}

/// Invalid or unreadable `loom.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The configuration is not valid TOML or has unknown keys.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A pattern option is not a valid regular expression.
    #[error("invalid {option}: {source}")]
    InvalidPattern {
        /// The option holding the pattern.
        option: &'static str,
        /// Regex compilation failure.
        #[source]
        source: regex::Error,
    },

    /// A template engine was configured without a command.
    #[error("template engine for .{extension} has an empty command")]
    EmptyCommand {
        /// The extension the engine was configured for.
        extension: String,
    },
}

/// Errors outside of compilation diagnostics.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A directory could not be scanned.
    #[error("cannot scan {}: {source}", path.display())]
    Scan {
        /// The directory being scanned.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// A module envelope could not be encoded or decoded.
    #[error("invalid module: {0}")]
    Module(#[from] serde_json::Error),

    /// A module carried an artifact the runtime cannot use.
    #[error(transparent)]
    Story(#[from] sl_story::StoryError),
}
