//! Build configuration from `loom.toml`.
//!
//! ```toml
//! file_name_pattern = '\.tale$'
//! test_harness = "check: every knot visited"
//! test_file_name_pattern = '\.test\.tale$'
//!
//! [template_engine]
//! tmpl = ["sed", "s/{{hero}}/Ada/g"]
//! ```
//!
//! [`BuildConfig`] is the raw file; [`BuildConfig::resolve`] validates it into
//! [`BuildOptions`], which the pipeline uses.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::{CommandPreprocessor, SourceLoader};
use crate::module::ModuleGenerator;

/// Roots are files whose path matches this pattern unless configured otherwise.
pub const DEFAULT_FILE_NAME_PATTERN: &str = r"\.tale$";

/// Roots matching this pattern receive the test harness unless configured otherwise.
pub const DEFAULT_TEST_FILE_NAME_PATTERN: &str = r"\.test\.tale$";

static DEFAULT_FILE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_FILE_NAME_PATTERN).expect("default root pattern is valid"));

pub(crate) static DEFAULT_TEST_FILE_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_TEST_FILE_NAME_PATTERN).expect("default test pattern is valid"));

/// Contents of `loom.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Regex selecting which files are compiled as roots.
    pub file_name_pattern: String,
    /// Extension → command line of the preprocessor for that extension.
    pub template_engine: BTreeMap<String, Vec<String>>,
    /// Fragment attached to units compiled from test roots.
    pub test_harness: Option<String>,
    /// Regex selecting which roots are test roots.
    pub test_file_name_pattern: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            file_name_pattern: DEFAULT_FILE_NAME_PATTERN.to_string(),
            template_engine: BTreeMap::new(),
            test_harness: None,
            test_file_name_pattern: DEFAULT_TEST_FILE_NAME_PATTERN.to_string(),
        }
    }
}

impl BuildConfig {
    /// Name of the configuration file.
    pub const FILE_NAME: &'static str = "loom.toml";

    /// Parse configuration text.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loading config");
        Self::from_toml(&text)
    }

    /// Find `loom.toml` in `dir` or its ancestors.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        dir.ancestors()
            .map(|d| d.join(Self::FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load the nearest `loom.toml` above `dir`, or the defaults if there is none.
    pub fn discover(dir: &Path) -> ConfigResult<Self> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Validate patterns and commands.
    pub fn resolve(&self) -> ConfigResult<BuildOptions> {
        let file_name_pattern = compile_pattern("file_name_pattern", &self.file_name_pattern)?;
        let test_file_name_pattern = compile_pattern("test_file_name_pattern", &self.test_file_name_pattern)?;

        let mut template_engines = BTreeMap::new();
        for (extension, argv) in &self.template_engine {
            let extension = extension.trim_start_matches('.').to_string();
            let Some((program, args)) = argv.split_first() else {
                return Err(ConfigError::EmptyCommand { extension });
            };
            template_engines.insert(extension, CommandPreprocessor::new(program.as_str(), args.iter().cloned()));
        }

        Ok(BuildOptions {
            file_name_pattern,
            template_engines,
            test_harness: self.test_harness.clone(),
            test_file_name_pattern,
        })
    }
}

fn compile_pattern(option: &'static str, pattern: &str) -> ConfigResult<Regex> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern { option, source })
}

/// Validated build configuration.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Selects compilable roots.
    pub file_name_pattern: Regex,
    /// Preprocessors by extension, without the leading dot.
    pub template_engines: BTreeMap<String, CommandPreprocessor>,
    /// Fragment attached to units compiled from test roots.
    pub test_harness: Option<String>,
    /// Selects test roots.
    pub test_file_name_pattern: Regex,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            file_name_pattern: DEFAULT_FILE_NAME_REGEX.clone(),
            template_engines: BTreeMap::new(),
            test_harness: None,
            test_file_name_pattern: DEFAULT_TEST_FILE_NAME_REGEX.clone(),
        }
    }
}

impl BuildOptions {
    /// Source loader with every configured template engine.
    pub fn loader(&self) -> SourceLoader {
        self.template_engines
            .iter()
            .fold(SourceLoader::new(), |loader, (extension, engine)| {
                loader.with_engine(extension.as_str(), engine.clone())
            })
    }

    /// Module generator honouring the test harness options.
    pub fn generator(&self) -> ModuleGenerator {
        match &self.test_harness {
            Some(harness) => ModuleGenerator::new().with_harness(harness.as_str(), self.test_file_name_pattern.clone()),
            None => ModuleGenerator::new(),
        }
    }
}
