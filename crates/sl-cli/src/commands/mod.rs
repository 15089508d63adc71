//! Subcommand implementations.

/// `loom build`.
pub mod build;
/// `loom check`.
pub mod check;
/// `loom deps`.
pub mod deps;
/// `loom play`.
pub mod play;

use std::path::{Path, PathBuf};

use sl_build::{BuildConfig, BuildOptions, BuildPipeline, CollectingReporter, StoryModule, normalize_path};
use sl_script::diagnostics::render_file_diagnostics;
use sl_script::{Diagnostic, Severity};

/// Resolve build options from `--config`, or from the nearest `loom.toml` above `dir`.
pub fn load_options(config: Option<&Path>, dir: &Path) -> Result<BuildOptions, String> {
    let config = match config {
        Some(path) => BuildConfig::load(path),
        None => BuildConfig::discover(&normalize_path(dir)),
    }
    .map_err(|e| e.to_string())?;
    config.resolve().map_err(|e| e.to_string())
}

/// Every root compiled in one run.
pub struct Compiled {
    /// Pipeline holding the include edges of every root.
    pub pipeline: BuildPipeline,
    /// Units of the roots that compiled.
    pub modules: Vec<StoryModule>,
    /// Roots that failed to compile.
    pub failed: Vec<PathBuf>,
}

/// Compile every root below `dir`, printing diagnostics as they come.
fn compile_all(config: Option<&Path>, dir: &Path) -> Result<Compiled, String> {
    let options = load_options(config, dir)?;
    let mut pipeline = BuildPipeline::new(&options);
    let roots = pipeline.discover_roots(dir).map_err(|e| e.to_string())?;
    if roots.is_empty() {
        return Err(format!("no story roots found in '{}'", dir.display()));
    }

    let mut modules = Vec::new();
    let mut failed = Vec::new();
    let mut reporter = CollectingReporter::new();
    for root in roots {
        match pipeline.build_root(&root, &mut reporter) {
            Ok(module) => modules.push(module),
            Err(_) => failed.push(root),
        }
    }
    print_diagnostics(reporter.diagnostics());

    Ok(Compiled {
        pipeline,
        modules,
        failed,
    })
}

/// Print diagnostics to stderr using ariadne.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    eprint!("{}", render_file_diagnostics(diagnostics));

    let errors = diagnostics.iter().filter(|d| d.severity == Severity::Error).count();
    let warnings = diagnostics.iter().filter(|d| d.severity == Severity::Warning).count();

    if errors > 0 {
        eprintln!(
            "  {} error{}, {} warning{}",
            errors,
            if errors == 1 { "" } else { "s" },
            warnings,
            if warnings == 1 { "" } else { "s" },
        );
    } else if warnings > 0 {
        eprintln!("  {} warning{}", warnings, if warnings == 1 { "" } else { "s" },);
    }
}

/// `path` relative to `base` when it lies below it.
fn display_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base).unwrap_or(path).display().to_string()
}
