//! Lexer, parser, and compiler for `.tale` narrative scripts.
//!
//! The build pipeline only talks to compilers through the [`StoryCompiler`]
//! and [`IncludeHandler`] traits; [`ScriptCompiler`] is the implementation
//! for the `.tale` language:
//!
//! ```text
//! INCLUDE common.tale
//! VAR gold = 0
//! You wake at a crossroads.
//! -> crossroads
//!
//! == crossroads ==
//! * Go left -> left
//! + {left} Go home -> END
//! ```

/// Syntax tree for parsed scripts.
pub mod ast;
/// Compiler traits and the `.tale` compiler.
pub mod compiler;
/// Diagnostics and their terminal rendering.
pub mod diagnostics;
/// Line-oriented lexer.
pub mod lexer;
/// Parser from tokens to syntax tree.
pub mod parser;

use std::path::{Path, PathBuf};

use sl_story::StoryArtifact;

pub use compiler::{IncludeError, IncludeHandler, ScriptCompiler, StoryCompiler};
pub use diagnostics::{Diagnostic, Severity};

/// Result of compiling a standalone script.
#[derive(Debug)]
pub struct CompileResult {
    /// The artifact, present only when no error was reported.
    pub artifact: Option<StoryArtifact>,
    /// Every diagnostic in the order it was reported.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileResult {
    /// Returns `true` if any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Include handler for sources that are not allowed to include anything.
struct NoIncludes;

impl IncludeHandler for NoIncludes {
    fn resolve(&mut self, name: &str) -> PathBuf {
        PathBuf::from(name)
    }

    fn load(&mut self, path: &Path) -> Result<String, IncludeError> {
        Err(IncludeError {
            path: path.to_path_buf(),
            message: "includes are not available for inline sources".to_string(),
        })
    }
}

/// Compile a single source string that has no includes.
pub fn compile_source(source: &str) -> CompileResult {
    let mut diagnostics = Vec::new();
    let artifact = ScriptCompiler.compile(
        Path::new("<source>"),
        source,
        &mut NoIncludes,
        &mut |d| diagnostics.push(d),
    );
    let failed = diagnostics.iter().any(Diagnostic::is_error);
    CompileResult {
        artifact: artifact.filter(|_| !failed),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_source_produces_artifact() {
        let result = compile_source("Hello.\n-> END\n");
        assert!(!result.has_errors());
        assert!(result.artifact.is_some());
    }

    #[test]
    fn compile_source_rejects_includes() {
        let result = compile_source("INCLUDE other.tale\n");
        assert!(result.has_errors());
        assert!(result.artifact.is_none());
    }
}
