//! Compiling one root document while recording the includes it resolves.

use std::path::{Path, PathBuf};

use sl_script::{Diagnostic, IncludeError, IncludeHandler, ScriptCompiler, Severity, StoryCompiler};
use sl_story::StoryArtifact;
use tracing::{debug, error, info, instrument, warn};

use crate::loader::SourceLoader;
use crate::paths::normalize_path;
use crate::tracker::DependencyTracker;

/// Receives compiler diagnostics one at a time, as they are produced.
pub trait Reporter {
    /// Handle a single diagnostic.
    fn report(&mut self, diagnostic: &Diagnostic);
}

impl<F> Reporter for F
where
    F: FnMut(&Diagnostic),
{
    fn report(&mut self, diagnostic: &Diagnostic) {
        self(diagnostic)
    }
}

/// Reporter that forwards diagnostics to `tracing` at the matching level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, diagnostic: &Diagnostic) {
        let file = diagnostic
            .file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        match diagnostic.severity {
            Severity::Info => info!(%file, "{}", diagnostic.message),
            Severity::Warning => warn!(%file, "{}", diagnostic.message),
            Severity::Error => error!(%file, "{}", diagnostic.message),
        }
    }
}

/// Reporter that keeps every diagnostic in arrival order.
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    diagnostics: Vec<Diagnostic>,
}

impl CollectingReporter {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything reported so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the collector.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl Reporter for CollectingReporter {
    fn report(&mut self, diagnostic: &Diagnostic) {
        self.diagnostics.push(diagnostic.clone());
    }
}

/// Include handler that records an edge for every include before it is read.
struct TrackingIncludes<'a> {
    root: &'a Path,
    base: PathBuf,
    loader: &'a SourceLoader,
    tracker: &'a mut DependencyTracker,
}

impl IncludeHandler for TrackingIncludes<'_> {
    fn resolve(&mut self, name: &str) -> PathBuf {
        let path = normalize_path(&self.base.join(name));
        // Tracked even if loading fails, so creating or fixing the file rebuilds the root.
        self.tracker.track(self.root, &path);
        path
    }

    fn load(&mut self, path: &Path) -> Result<String, IncludeError> {
        self.loader.load(path).map_err(|e| IncludeError {
            path: e.path().to_path_buf(),
            message: e.reason(),
        })
    }
}

/// Runs a [`StoryCompiler`] against root documents.
///
/// Each call to [`compile`](Self::compile) first drops the root's edges from
/// the tracker, then records every include the compiler resolves, so the
/// tracker always reflects the latest pass of that root whether or not it
/// succeeded.
#[derive(Debug, Default)]
pub struct CompilationDriver<C = ScriptCompiler> {
    compiler: C,
    loader: SourceLoader,
}

impl CompilationDriver {
    /// Driver for `.tale` scripts without preprocessors.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: StoryCompiler> CompilationDriver<C> {
    /// Driver using a custom compiler.
    pub fn with_compiler(compiler: C) -> Self {
        Self {
            compiler,
            loader: SourceLoader::new(),
        }
    }

    /// Replace the loader used for roots and includes.
    pub fn with_loader(mut self, loader: SourceLoader) -> Self {
        self.loader = loader;
        self
    }

    /// The loader used for roots and includes.
    pub fn loader(&self) -> &SourceLoader {
        &self.loader
    }

    /// Compile `root`, forwarding diagnostics to `reporter` as they occur.
    ///
    /// On failure, returns the error-level diagnostics of the pass. Warnings and
    /// infos only reach the reporter.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub fn compile(
        &self,
        root: &Path,
        tracker: &mut DependencyTracker,
        reporter: &mut dyn Reporter,
    ) -> Result<StoryArtifact, Vec<Diagnostic>> {
        let root = normalize_path(root);
        tracker.clear(&root);

        let source = match self.loader.load(&root) {
            Ok(source) => source,
            Err(e) => {
                let diagnostic = Diagnostic::error(0..0, e.reason()).in_file(&root);
                reporter.report(&diagnostic);
                return Err(vec![diagnostic]);
            }
        };

        let mut includes = TrackingIncludes {
            root: &root,
            base: root.parent().map(Path::to_path_buf).unwrap_or_default(),
            loader: &self.loader,
            tracker,
        };
        let mut errors = Vec::new();
        let artifact = self.compiler.compile(&root, &source, &mut includes, &mut |diagnostic: Diagnostic| {
            reporter.report(&diagnostic);
            if diagnostic.is_error() {
                errors.push(diagnostic);
            }
        });

        match artifact {
            Some(artifact) if errors.is_empty() => {
                debug!(knots = artifact.knots.len(), "compiled");
                Ok(artifact)
            }
            Some(_) => Err(errors),
            None => {
                if errors.is_empty() {
                    let diagnostic = Diagnostic::error(0..0, "compiler produced no artifact").in_file(&root);
                    reporter.report(&diagnostic);
                    errors.push(diagnostic);
                }
                Err(errors)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn write(&self, name: &str, text: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, text).unwrap();
            normalize_path(&path)
        }

        fn path(&self, name: &str) -> PathBuf {
            normalize_path(&self.dir.path().join(name))
        }
    }

    fn includes(tracker: &DependencyTracker, root: &Path) -> Vec<PathBuf> {
        tracker
            .includes_of(root)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn compiles_root_and_tracks_includes() {
        let fx = Fixture::new();
        let common = fx.write("common.tale", "== shared ==\nShared words.\n-> END\n");
        let main = fx.write("main.tale", "INCLUDE common.tale\nHello.\n-> shared\n");

        let mut tracker = DependencyTracker::new();
        let mut reporter = CollectingReporter::new();
        let artifact = CompilationDriver::new()
            .compile(&main, &mut tracker, &mut reporter)
            .unwrap();

        assert!(artifact.knot("shared").is_some());
        assert_eq!(includes(&tracker, &main), vec![common.clone()]);
        assert!(tracker.affected_roots(&common).contains(&main));
        assert!(tracker.affected_roots(&fx.path("untracked.tale")).is_empty());
    }

    #[test]
    fn missing_root_fails_with_one_diagnostic() {
        let fx = Fixture::new();
        let mut tracker = DependencyTracker::new();
        let mut seen = Vec::new();
        let mut reporter = |d: &Diagnostic| seen.push(d.clone());

        let errors = CompilationDriver::new()
            .compile(&fx.path("nope.tale"), &mut tracker, &mut reporter)
            .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("not found"));
        assert_eq!(errors[0].file.as_deref(), Some(fx.path("nope.tale").as_path()));
        assert_eq!(seen, errors);
    }

    #[test]
    fn failed_pass_keeps_edges_resolved_before_failure() {
        let fx = Fixture::new();
        let good = fx.write("good.tale", "Good.\n");
        let main = fx.write("main.tale", "INCLUDE good.tale\nINCLUDE missing.tale\n-> END\n");

        let mut tracker = DependencyTracker::new();
        let errors = CompilationDriver::new()
            .compile(&main, &mut tracker, &mut CollectingReporter::new())
            .unwrap_err();

        assert!(errors.iter().any(|d| d.message.contains("missing.tale")));
        assert!(tracker.affected_roots(&good).contains(&main));
        assert!(tracker.affected_roots(&fx.path("missing.tale")).contains(&main));
    }

    #[test]
    fn recompiling_with_fewer_includes_drops_stale_edges() {
        let fx = Fixture::new();
        let x = fx.write("x.tale", "X.\n");
        let y = fx.write("y.tale", "Y.\n");
        let main = fx.write("main.tale", "INCLUDE x.tale\nINCLUDE y.tale\n-> END\n");

        let driver = CompilationDriver::new();
        let mut tracker = DependencyTracker::new();
        driver
            .compile(&main, &mut tracker, &mut CollectingReporter::new())
            .unwrap();
        assert!(tracker.affected_roots(&y).contains(&main));

        fs::write(&main, "INCLUDE x.tale\n-> END\n").unwrap();
        driver
            .compile(&main, &mut tracker, &mut CollectingReporter::new())
            .unwrap();

        assert!(tracker.affected_roots(&x).contains(&main));
        assert!(tracker.affected_roots(&y).is_empty());
    }

    #[test]
    fn diagnostics_arrive_individually_and_only_errors_fail() {
        let fx = Fixture::new();
        let main = fx.write("main.tale", "// TODO: write an ending\nHello.\n-> END\n");

        let mut reporter = CollectingReporter::new();
        let result = CompilationDriver::new().compile(&main, &mut DependencyTracker::new(), &mut reporter);

        assert!(result.is_ok());
        assert_eq!(reporter.diagnostics().len(), 1);
        assert_eq!(reporter.diagnostics()[0].severity, Severity::Info);
    }

    #[test]
    fn all_errors_of_a_pass_are_returned() {
        let fx = Fixture::new();
        let main = fx.write("main.tale", "-> nowhere\n== a ==\nA.\n-> END\n== a ==\nAgain.\n-> END\n");

        let errors = CompilationDriver::new()
            .compile(&main, &mut DependencyTracker::new(), &mut CollectingReporter::new())
            .unwrap_err();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn preprocessing_failure_in_include_is_attributed_to_include() {
        let fx = Fixture::new();
        let tmpl = fx.write("part.tmpl", "broken");
        let main = fx.write("main.tale", "INCLUDE part.tmpl\n-> END\n");

        let loader = SourceLoader::new().with_engine("tmpl", |_: &Path, _: &str| -> Result<String, String> {
            Err("bad template".into())
        });
        let mut tracker = DependencyTracker::new();
        let errors = CompilationDriver::new()
            .with_loader(loader)
            .compile(&main, &mut tracker, &mut CollectingReporter::new())
            .unwrap_err();

        assert!(errors[0].message.contains("bad template"), "{errors:?}");
        assert!(errors[0].message.contains("part.tmpl"));
        assert!(tracker.affected_roots(&tmpl).contains(&main));
    }

    #[test]
    fn preprocessed_root_is_compiled() {
        let fx = Fixture::new();
        let root = fx.write("main.tmpl", "Hello, NAME.\n-> END\n");
        let loader = SourceLoader::new().with_engine("tmpl", |_: &Path, text: &str| -> Result<String, String> {
            Ok(text.replace("NAME", "Ada"))
        });

        let artifact = CompilationDriver::new()
            .with_loader(loader)
            .compile(&root, &mut DependencyTracker::new(), &mut CollectingReporter::new())
            .unwrap();
        let mut story = sl_story::Story::new(std::sync::Arc::new(artifact)).unwrap();
        assert_eq!(story.continue_line().as_deref(), Some("Hello, Ada."));
    }
}
