//! Terminal play, optionally rebuilding the story while it runs.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc;

use colored::Colorize;
use sl_build::{BuildPipeline, CollectingReporter, RootUpdate, normalize_path};
use sl_live::{HotContext, HotUpdate, LiveSession, Renderer};
use sl_story::{Choice, Story};
use tracing::info;

use crate::watch::{self, Input};

/// Renderer printing to stdout.
#[derive(Default)]
struct TerminalRenderer {
    shown: bool,
}

impl Renderer for TerminalRenderer {
    fn paragraph(&mut self, text: &str) {
        self.shown = true;
        println!("{text}");
    }

    fn choices(&mut self, choices: &[Choice]) {
        self.shown = true;
        println!();
        if choices.is_empty() {
            println!("  {}", "THE END".dimmed());
            return;
        }
        for (i, choice) in choices.iter().enumerate() {
            println!("  {}. {}", i + 1, choice.text);
        }
    }

    fn notice(&mut self, message: &str) {
        self.shown = true;
        println!("{}", message.yellow());
    }

    fn clear(&mut self) {
        if self.shown {
            println!("{}", "-".repeat(40).dimmed());
        }
        self.shown = false;
    }
}

/// Play `root` in the terminal, rebuilding it on file changes when `watch` is set.
pub fn run(config: Option<&Path>, root: &Path, watch: bool) -> Result<(), String> {
    let root = normalize_path(root);
    if !root.is_file() {
        return Err(format!("'{}' not found", root.display()));
    }
    let dir = root.parent().map(Path::to_path_buf).unwrap_or_default();
    let options = super::load_options(config, &dir)?;
    let mut pipeline = BuildPipeline::new(&options);

    let mut reporter = CollectingReporter::new();
    let first = pipeline.build_root(&root, &mut reporter);
    super::print_diagnostics(reporter.diagnostics());
    let first = first.map_err(|_| "compilation failed with errors".to_string())?;
    let story = first.story().map_err(|e| e.to_string())?;

    let session = Rc::new(RefCell::new(LiveSession::new(TerminalRenderer::default())));
    session.borrow_mut().start(story);

    let mut hot = HotContext::for_module(&first);
    let target = Rc::clone(&session);
    hot.on_hot_reload(move |story| {
        target.borrow_mut().reload(story);
    });

    let (tx, rx) = mpsc::channel();
    watch::read_lines(tx.clone());
    let _watcher = if watch {
        info!(dir = %dir.display(), "watching for changes");
        Some(watch::spawn(&dir, tx).map_err(|e| format!("cannot watch '{}': {e}", dir.display()))?)
    } else {
        None
    };

    loop {
        if !watch && session.borrow().story().is_some_and(Story::has_ended) {
            break;
        }
        let Ok(input) = rx.recv() else { break };

        match input {
            Input::Line(line) => {
                let line = line.trim();
                if line == "q" || line == "quit" {
                    break;
                }
                choose(&mut session.borrow_mut(), line)?;
            }
            Input::Changed(paths) => {
                if let Some(update) = rebuild(&mut pipeline, &root, &paths) {
                    deliver(&mut hot, update)?;
                }
            }
            Input::Closed => break,
        }
    }

    Ok(())
}

/// Apply a 1-based choice typed by the player.
fn choose(session: &mut LiveSession<TerminalRenderer>, line: &str) -> Result<(), String> {
    let offered = session.story().map_or(0, |story| story.current_choices().len());
    if offered == 0 {
        return Ok(());
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=offered).contains(&n) => session.choose(n - 1).map_err(|e| e.to_string()),
        _ => {
            println!("  Enter a number between 1 and {offered}.");
            Ok(())
        }
    }
}

/// Rebuild `root` once if any of `paths` affects it.
fn rebuild(pipeline: &mut BuildPipeline, root: &Path, paths: &BTreeSet<PathBuf>) -> Option<RootUpdate> {
    let relevant: Vec<&Path> = paths
        .iter()
        .map(PathBuf::as_path)
        .filter(|path| pipeline.roots_for_change(path).contains(root))
        .collect();
    if relevant.is_empty() {
        return None;
    }

    let mut reporter = CollectingReporter::new();
    let updates = pipeline.handle_changes(relevant, &mut reporter);
    super::print_diagnostics(reporter.diagnostics());
    updates.into_iter().find(|update| update.root == root)
}

fn deliver(hot: &mut HotContext, update: RootUpdate) -> Result<(), String> {
    match hot.accept(update.result.ok()).map_err(|e| e.to_string())? {
        HotUpdate::Transferred { id } => info!(%id, "story replaced"),
        HotUpdate::Duplicate => {}
        HotUpdate::FullReload { reason } => {
            eprintln!("{}", format!("Keeping the current story: {reason}").yellow());
        }
    }
    Ok(())
}
