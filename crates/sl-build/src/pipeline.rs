//! Turning file changes into rebuilt units.
//!
//! A change to a file yields one [`RootUpdate`] per root that must be rebuilt:
//! the roots the tracker reports as depending on the file, plus the file itself
//! when it is a root. Each root appears once, in path order.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use sl_script::{Diagnostic, ScriptCompiler, StoryCompiler};
use tracing::{debug, info, instrument};

use crate::config::BuildOptions;
use crate::driver::{CompilationDriver, Reporter};
use crate::error::{BuildError, BuildResult};
use crate::module::{ModuleGenerator, StoryModule};
use crate::paths::normalize_path;
use crate::tracker::{DependencyTracker, PathSet};

/// Outcome of rebuilding one root.
#[derive(Debug)]
pub struct RootUpdate {
    /// The rebuilt root.
    pub root: PathBuf,
    /// The new unit, or the errors that prevented it.
    pub result: Result<StoryModule, Vec<Diagnostic>>,
}

/// Compiles roots, wraps them into units, and keeps the dependency index current.
#[derive(Debug)]
pub struct BuildPipeline<C = ScriptCompiler> {
    driver: CompilationDriver<C>,
    generator: ModuleGenerator,
    root_pattern: Regex,
    tracker: DependencyTracker,
}

impl BuildPipeline {
    /// Pipeline for `.tale` scripts.
    pub fn new(options: &BuildOptions) -> Self {
        Self::with_compiler(ScriptCompiler, options)
    }
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new(&BuildOptions::default())
    }
}

impl<C: StoryCompiler> BuildPipeline<C> {
    /// Pipeline using a custom compiler.
    pub fn with_compiler(compiler: C, options: &BuildOptions) -> Self {
        Self {
            driver: CompilationDriver::with_compiler(compiler).with_loader(options.loader()),
            generator: options.generator(),
            root_pattern: options.file_name_pattern.clone(),
            tracker: DependencyTracker::new(),
        }
    }

    /// The dependency index built so far.
    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    /// Returns `true` if `path` is selected as a compilable root.
    pub fn is_root(&self, path: &Path) -> bool {
        self.root_pattern.is_match(&path.to_string_lossy())
    }

    /// Every root below `dir`, sorted. Hidden directories are skipped.
    pub fn discover_roots(&self, dir: &Path) -> BuildResult<Vec<PathBuf>> {
        let mut roots = Vec::new();
        self.collect_roots(&normalize_path(dir), &mut roots)?;
        roots.sort();
        debug!(dir = %dir.display(), count = roots.len(), "discovered roots");
        Ok(roots)
    }

    fn collect_roots(&self, dir: &Path, roots: &mut Vec<PathBuf>) -> BuildResult<()> {
        let scan_error = |source| BuildError::Scan {
            path: dir.to_path_buf(),
            source,
        };

        for entry in fs::read_dir(dir).map_err(scan_error)? {
            let path = entry.map_err(scan_error)?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if path.is_dir() {
                if !hidden {
                    self.collect_roots(&path, roots)?;
                }
            } else if self.is_root(&path) {
                roots.push(path);
            }
        }
        Ok(())
    }

    /// Compile `root` and wrap the result into a new unit.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn build_root(&mut self, root: &Path, reporter: &mut dyn Reporter) -> Result<StoryModule, Vec<Diagnostic>> {
        let root = normalize_path(root);
        let artifact = self.driver.compile(&root, &mut self.tracker, reporter)?;
        Ok(self.generator.generate(&root, artifact))
    }

    /// Roots a change to `changed` requires rebuilding, without rebuilding them.
    pub fn roots_for_change(&self, changed: &Path) -> PathSet {
        let changed = normalize_path(changed);
        let mut roots = self.tracker.affected_roots(&changed);
        if self.is_root(&changed) && changed.is_file() {
            roots.insert(changed);
        }
        roots
    }

    /// Rebuild every root affected by a change to `changed`.
    ///
    /// A root that no longer exists is dropped from the index instead of being
    /// rebuilt.
    pub fn handle_change(&mut self, changed: &Path, reporter: &mut dyn Reporter) -> Vec<RootUpdate> {
        self.handle_changes([changed], reporter)
    }

    /// Rebuild every root affected by a batch of changes, each root once.
    ///
    /// Deleted roots are forgotten before the batch is resolved, so an include
    /// saved together with the deletion does not bring the root back.
    pub fn handle_changes<'a>(
        &mut self,
        changed: impl IntoIterator<Item = &'a Path>,
        reporter: &mut dyn Reporter,
    ) -> Vec<RootUpdate> {
        let changed: Vec<PathBuf> = changed.into_iter().map(normalize_path).collect();
        for path in &changed {
            if self.is_root(path) && !path.is_file() {
                self.tracker.clear(path);
            }
        }

        let mut roots = PathSet::new();
        for path in &changed {
            let affected = self.roots_for_change(path);
            if affected.is_empty() {
                debug!(file = %path.display(), "change affects no roots");
            }
            roots.extend(affected);
        }

        if roots.is_empty() {
            return Vec::new();
        }
        info!(files = changed.len(), roots = roots.len(), "rebuilding");

        roots
            .into_iter()
            .map(|root| {
                let result = self.build_root(&root, reporter);
                RootUpdate { root, result }
            })
            .collect()
    }
}
