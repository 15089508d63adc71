use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use sl_story::{ChoicePoint, Knot, ROOT_KNOT, Step, StoryArtifact, Target, Value};
use tracing::debug;

use crate::ast::*;
use crate::diagnostics::{Diagnostic, Severity};
use crate::lexer::lex;
use crate::parser::parse;

/// Failure to read an included document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot include {}: {message}", path.display())]
pub struct IncludeError {
    /// The resolved path that failed to load.
    pub path: PathBuf,
    /// Why it failed.
    pub message: String,
}

/// File access used by a compiler while resolving `INCLUDE` lines.
pub trait IncludeHandler {
    /// Map an include name, as written in the script, to an absolute path.
    ///
    /// Called once per distinct include name in a compilation pass, before the
    /// file is loaded.
    fn resolve(&mut self, name: &str) -> PathBuf;

    /// Read the text of a resolved include.
    fn load(&mut self, path: &Path) -> Result<String, IncludeError>;
}

/// A compiler that turns a root document into a [`StoryArtifact`].
pub trait StoryCompiler {
    /// Compile `source` (the text of `root`).
    ///
    /// Diagnostics are pushed to `report` as they are found. Returns `None` when
    /// no artifact could be produced; callers must also treat any error-level
    /// diagnostic as a failed pass.
    fn compile(
        &self,
        root: &Path,
        source: &str,
        includes: &mut dyn IncludeHandler,
        report: &mut dyn FnMut(Diagnostic),
    ) -> Option<StoryArtifact>;
}

/// Compiler for the `.tale` line-oriented script language.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptCompiler;

impl StoryCompiler for ScriptCompiler {
    fn compile(
        &self,
        root: &Path,
        source: &str,
        includes: &mut dyn IncludeHandler,
        report: &mut dyn FnMut(Diagnostic),
    ) -> Option<StoryArtifact> {
        let mut pass = Pass::new(root, includes, report);
        pass.process_file(root, source);
        pass.finish()
    }
}

/// A divert or choice target waiting for all knots to be known.
struct PendingTarget {
    name: String,
    span: Span,
    file: PathBuf,
}

/// State for one compilation of one root document.
struct Pass<'a> {
    includes: &'a mut dyn IncludeHandler,
    report: &'a mut dyn FnMut(Diagnostic),
    seen_names: HashSet<String>,
    seen_paths: HashSet<PathBuf>,
    knots: BTreeMap<String, Knot>,
    /// Where each knot was declared, for end-of-knot warnings.
    knot_origins: BTreeMap<String, (PathBuf, Span)>,
    globals: BTreeMap<String, Value>,
    current: String,
    targets: Vec<PendingTarget>,
    errors: usize,
}

impl<'a> Pass<'a> {
    fn new(
        root: &Path,
        includes: &'a mut dyn IncludeHandler,
        report: &'a mut dyn FnMut(Diagnostic),
    ) -> Self {
        let mut knots = BTreeMap::new();
        knots.insert(ROOT_KNOT.to_string(), Knot::default());
        Self {
            includes,
            report,
            seen_names: HashSet::new(),
            seen_paths: HashSet::from([root.to_path_buf()]),
            knots,
            knot_origins: BTreeMap::new(),
            globals: BTreeMap::new(),
            current: ROOT_KNOT.to_string(),
            targets: Vec::new(),
            errors: 0,
        }
    }

    fn emit(&mut self, diagnostic: Diagnostic) {
        if diagnostic.severity == Severity::Error {
            self.errors += 1;
        }
        (self.report)(diagnostic);
    }

    fn process_file(&mut self, file: &Path, source: &str) {
        debug!(file = %file.display(), "compiling script");

        let (tokens, lex_errors) = lex(source);
        for e in lex_errors {
            self.emit(Diagnostic::error(e.span, e.message).in_file(file));
        }
        let (script, parse_errors) = parse(&tokens);
        for e in parse_errors {
            self.emit(Diagnostic::error(e.span, e.message).in_file(file));
        }

        for item in script.items {
            self.process_item(file, item);
        }
    }

    fn process_item(&mut self, file: &Path, item: Spanned<Item>) {
        let Spanned { node, span } = item;
        match node {
            Item::Include(name) => self.include(file, &name, span),
            Item::Var { name, value } => {
                if self.globals.contains_key(&name) {
                    self.emit(
                        Diagnostic::error(span, format!("variable \"{name}\" is already declared"))
                            .in_file(file),
                    );
                } else {
                    self.globals.insert(name, literal_value(value));
                }
            }
            Item::Knot(name) => {
                if name == ROOT_KNOT || self.knots.contains_key(&name) {
                    self.emit(
                        Diagnostic::error(span, format!("knot \"{name}\" is already defined"))
                            .with_label("duplicate knot")
                            .in_file(file),
                    );
                    return;
                }
                self.knots.insert(name.clone(), Knot::default());
                self.knot_origins
                    .insert(name.clone(), (file.to_path_buf(), span));
                self.current = name;
            }
            Item::Text(text) => self.push_step(file, span, Step::Text(text)),
            Item::Divert(target) => {
                let target = self.target(file, span.clone(), target);
                self.push_step(file, span, Step::Divert(target));
            }
            Item::Assign { name, value } => self.push_step(
                file,
                span,
                Step::Set {
                    name,
                    value: literal_value(value),
                },
            ),
            Item::Choice(line) => self.push_choice(file, span, line),
            Item::Todo(note) => self.emit(Diagnostic::info(span, format!("TODO: {note}")).in_file(file)),
        }
    }

    fn include(&mut self, file: &Path, name: &str, span: Span) {
        if !self.seen_names.insert(name.to_string()) {
            return;
        }
        let path = self.includes.resolve(name);
        if !self.seen_paths.insert(path.clone()) {
            return;
        }

        match self.includes.load(&path) {
            Ok(text) => {
                // Included top-level content lands in the knot that was open at the INCLUDE.
                let resume = self.current.clone();
                self.process_file(&path, &text);
                self.current = resume;
            }
            Err(e) => self.emit(
                Diagnostic::error(span, e.to_string())
                    .with_label("included here")
                    .in_file(file),
            ),
        }
    }

    fn target(&mut self, file: &Path, span: Span, name: String) -> Target {
        match name.as_str() {
            "END" | "DONE" => Target::End,
            _ => {
                self.targets.push(PendingTarget {
                    name: name.clone(),
                    span,
                    file: file.to_path_buf(),
                });
                Target::Knot(name)
            }
        }
    }

    fn current_steps(&mut self) -> &mut Vec<Step> {
        &mut self
            .knots
            .entry(self.current.clone())
            .or_default()
            .steps
    }

    fn push_step(&mut self, file: &Path, span: Span, step: Step) {
        if matches!(self.current_steps().last(), Some(Step::Choices(_))) {
            self.emit(
                Diagnostic::warning(span, "content after a choice block is never reached")
                    .in_file(file),
            );
            return;
        }
        self.current_steps().push(step);
    }

    fn push_choice(&mut self, file: &Path, span: Span, line: ChoiceLine) {
        let target = self.target(file, span, line.target);
        let knot = self.current.clone();
        let steps = self.current_steps();

        let numbered = steps
            .iter()
            .map(|s| match s {
                Step::Choices(points) => points.len(),
                _ => 0,
            })
            .sum::<usize>();
        let point = ChoicePoint {
            id: format!("{knot}.{numbered}"),
            text: line.text,
            sticky: line.sticky,
            condition: line.condition,
            target,
        };

        match steps.last_mut() {
            Some(Step::Choices(points)) => points.push(point),
            _ => steps.push(Step::Choices(vec![point])),
        }
    }

    fn finish(mut self) -> Option<StoryArtifact> {
        for pending in std::mem::take(&mut self.targets) {
            if !self.knots.contains_key(&pending.name) {
                self.emit(
                    Diagnostic::error(pending.span, format!("unknown knot \"{}\"", pending.name))
                        .with_label("not defined anywhere")
                        .in_file(pending.file),
                );
            }
        }

        let origins = std::mem::take(&mut self.knot_origins);
        for (name, (file, span)) in origins {
            let ends_cleanly = self.knots.get(&name).is_some_and(|knot| {
                matches!(knot.steps.last(), Some(Step::Divert(_) | Step::Choices(_)))
            });
            if !ends_cleanly {
                self.emit(
                    Diagnostic::warning(span, format!("knot \"{name}\" ends without a divert; the story stops there"))
                        .in_file(file),
                );
            }
        }

        if self.errors > 0 {
            return None;
        }

        Some(StoryArtifact {
            knots: self.knots,
            globals: self.globals,
            ..StoryArtifact::default()
        })
    }
}

fn literal_value(literal: Literal) -> Value {
    match literal {
        Literal::Bool(b) => Value::Bool(b),
        Literal::Int(n) => Value::Int(n),
        Literal::Str(s) => Value::Str(s),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use sl_story::Story;
    use std::sync::Arc;

    use super::*;

    /// In-memory include handler that records every resolve call.
    #[derive(Default)]
    struct MemoryFiles {
        files: HashMap<PathBuf, String>,
        resolved: Vec<String>,
    }

    impl MemoryFiles {
        fn with(mut self, path: &str, text: &str) -> Self {
            self.files.insert(PathBuf::from(path), text.to_string());
            self
        }
    }

    impl IncludeHandler for MemoryFiles {
        fn resolve(&mut self, name: &str) -> PathBuf {
            self.resolved.push(name.to_string());
            Path::new("/story").join(name)
        }

        fn load(&mut self, path: &Path) -> Result<String, IncludeError> {
            self.files.get(path).cloned().ok_or_else(|| IncludeError {
                path: path.to_path_buf(),
                message: "no such file".to_string(),
            })
        }
    }

    fn compile(files: &mut MemoryFiles, source: &str) -> (Option<StoryArtifact>, Vec<Diagnostic>) {
        let mut diagnostics = Vec::new();
        let artifact = ScriptCompiler.compile(
            Path::new("/story/main.tale"),
            source,
            files,
            &mut |d| diagnostics.push(d),
        );
        (artifact, diagnostics)
    }

    #[test]
    fn compiles_knots_and_choices() {
        let mut files = MemoryFiles::default();
        let (artifact, diagnostics) = compile(
            &mut files,
            "VAR gold = 2\nIt begins.\n-> hall\n== hall ==\nA hall. {gold} coins.\n* East -> east\n+ Stay -> hall\n== east ==\nThe end.\n-> END\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let artifact = artifact.unwrap();

        assert_eq!(artifact.globals.get("gold"), Some(&Value::Int(2)));
        let hall = artifact.knot("hall").unwrap();
        let Some(Step::Choices(points)) = hall.steps.last() else {
            panic!("expected choices, got {:?}", hall.steps);
        };
        assert_eq!(points[0].id, "hall.0");
        assert_eq!(points[1].id, "hall.1");
        assert!(points[1].sticky);

        let mut story = Story::new(Arc::new(artifact)).unwrap();
        assert_eq!(story.continue_maximally(), vec!["It begins.", "A hall. 2 coins."]);
    }

    #[test]
    fn includes_are_resolved_once_and_inlined() {
        let mut files = MemoryFiles::default()
            .with("/story/common.tale", "Shared intro.\n== shared ==\nShared knot.\n-> END\n");
        let (artifact, diagnostics) = compile(
            &mut files,
            "INCLUDE common.tale\nINCLUDE common.tale\n-> shared\n",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert_eq!(files.resolved, vec!["common.tale"]);

        let mut story = Story::new(Arc::new(artifact.unwrap())).unwrap();
        assert_eq!(story.continue_maximally(), vec!["Shared intro.", "Shared knot."]);
    }

    #[test]
    fn missing_include_is_an_error_but_compilation_continues() {
        let mut files = MemoryFiles::default().with("/story/b.tale", "== b ==\n-> END\n");
        let (artifact, diagnostics) = compile(
            &mut files,
            "INCLUDE a.tale\nINCLUDE b.tale\n-> nowhere\n",
        );
        assert!(artifact.is_none());
        assert_eq!(files.resolved, vec!["a.tale", "b.tale"]);

        let errors: Vec<_> = diagnostics.iter().filter(|d| d.is_error()).collect();
        assert_eq!(errors.len(), 2, "{diagnostics:?}");
        assert!(errors[0].message.contains("cannot include /story/a.tale"));
        assert_eq!(errors[0].file.as_deref(), Some(Path::new("/story/main.tale")));
        assert!(errors[1].message.contains("unknown knot \"nowhere\""));
    }

    #[test]
    fn root_including_itself_is_ignored() {
        let mut files = MemoryFiles::default();
        let (artifact, diagnostics) = compile(&mut files, "INCLUDE main.tale\nHello.\n");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        assert!(artifact.is_some());
    }

    #[test]
    fn duplicate_knots_and_variables_are_errors() {
        let mut files = MemoryFiles::default();
        let (artifact, diagnostics) = compile(
            &mut files,
            "VAR a = 1\nVAR a = 2\n== k ==\n-> END\n== k ==\n-> END\n",
        );
        assert!(artifact.is_none());
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "variable \"a\" is already declared",
                "knot \"k\" is already defined"
            ]
        );
    }

    #[test]
    fn warnings_and_infos_do_not_fail() {
        let mut files = MemoryFiles::default();
        let (artifact, diagnostics) = compile(
            &mut files,
            "// TODO: better opening\n-> cellar\n== cellar ==\nDark.\n* Up -> END\nUnreachable.\n",
        );
        assert!(artifact.is_some());
        let severities: Vec<_> = diagnostics.iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Info, Severity::Warning]);
        assert_eq!(diagnostics[0].message, "TODO: better opening");
    }

    #[test]
    fn knot_without_divert_is_warned() {
        let mut files = MemoryFiles::default();
        let (artifact, diagnostics) = compile(&mut files, "-> quiet\n== quiet ==\nSilence.\n");
        assert!(artifact.is_some());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("ends without a divert"));
    }
}
