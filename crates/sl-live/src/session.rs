//! Live play that survives story replacement.
//!
//! ```text
//!             choose                      reload (record non-empty)
//!   PlayingLive ─────► PlayingLive   PlayingLive ──► Replaying ──┬─► PlayingLive
//!                                                                └─► Fallback ──► PlayingLive
//! ```
//!
//! `PlayingLive` is the only steady state. A reload always ends in it.

use std::fmt;

use sl_story::{Choice, Story};
use tracing::{debug, info, warn};

use crate::error::{LiveError, LiveResult, ReplayDivergence};
use crate::record::ChoiceRecord;
use crate::replay::{Replay, ReplayStep};

/// Where a session is in the continuity protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Recorded decisions are being applied to a new story.
    Replaying,
    /// The player is choosing.
    PlayingLive,
    /// Replay stopped early; the player resumes from where it stopped.
    Fallback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Replaying => "replaying",
            Phase::PlayingLive => "playing",
            Phase::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// Output side of a session.
pub trait Renderer {
    /// Show one paragraph of story text.
    fn paragraph(&mut self, text: &str);
    /// Show the choices on offer. Empty when the story has ended.
    fn choices(&mut self, choices: &[Choice]);
    /// Show a message that is not part of the story.
    fn notice(&mut self, message: &str);
    /// Remove everything shown so far.
    fn clear(&mut self);
}

/// One thing shown by a [`Transcript`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Story text.
    Paragraph(String),
    /// Choice texts in order.
    Choices(Vec<String>),
    /// A message outside the story.
    Notice(String),
}

/// Renderer that records everything in memory.
///
/// Only the latest set of choices is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything shown since the last clear.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Story text shown since the last clear.
    pub fn paragraphs(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Paragraph(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Notices shown since the last clear.
    pub fn notices(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|e| match e {
                Entry::Notice(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The most recently shown choices.
    pub fn last_choices(&self) -> Option<&[String]> {
        self.entries.iter().rev().find_map(|e| match e {
            Entry::Choices(texts) => Some(texts.as_slice()),
            _ => None,
        })
    }
}

impl Renderer for Transcript {
    fn paragraph(&mut self, text: &str) {
        self.entries.push(Entry::Paragraph(text.to_string()));
    }

    fn choices(&mut self, choices: &[Choice]) {
        // Options already passed are no longer shown.
        self.entries.retain(|e| !matches!(e, Entry::Choices(_)));
        self.entries
            .push(Entry::Choices(choices.iter().map(|c| c.text.clone()).collect()));
    }

    fn notice(&mut self, message: &str) {
        self.entries.push(Entry::Notice(message.to_string()));
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Outcome of replacing the story of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    /// Decisions re-applied to the new story.
    pub replayed: usize,
    /// Set when replay stopped before the end of the record.
    pub divergence: Option<ReplayDivergence>,
    /// Phases entered during the reload, in order.
    pub phases: Vec<Phase>,
}

impl ReloadReport {
    /// Returns `true` if the session fell back to live play early.
    pub fn diverged(&self) -> bool {
        self.divergence.is_some()
    }
}

/// Text of the notice shown when replay stops early.
pub fn fallback_notice(divergence: &ReplayDivergence) -> String {
    format!(
        "The story changed and your earlier choices could not all be replayed ({divergence}). Continuing from here."
    )
}

/// An interactive session that keeps the player's place across reloads.
#[derive(Debug)]
pub struct LiveSession<R: Renderer> {
    story: Option<Story>,
    record: ChoiceRecord,
    phase: Phase,
    renderer: R,
}

impl<R: Renderer> LiveSession<R> {
    /// Create a session with nothing loaded.
    pub fn new(renderer: R) -> Self {
        Self {
            story: None,
            record: ChoiceRecord::new(),
            phase: Phase::PlayingLive,
            renderer,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Decisions made in the current story.
    pub fn record(&self) -> &ChoiceRecord {
        &self.record
    }

    /// The running story.
    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Mutable access to the renderer.
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Start `story` from the beginning, forgetting earlier decisions.
    pub fn start(&mut self, story: Story) {
        self.record.clear();
        self.phase = Phase::PlayingLive;
        self.renderer.clear();
        self.story = Some(story);
        self.present();
    }

    /// Take a choice in the running story.
    pub fn choose(&mut self, index: usize) -> LiveResult<()> {
        let story = self.story.as_mut().ok_or(LiveError::NotStarted)?;
        story.choose_choice_index(index)?;
        self.record.push(index);
        self.present();
        Ok(())
    }

    /// Replace the running story, replaying recorded decisions against it.
    ///
    /// Never fails. When a recorded decision does not fit the new story, one
    /// notice is shown and the player continues from that point.
    pub fn reload(&mut self, story: Story) -> ReloadReport {
        let recorded = self.record.take();
        self.renderer.clear();

        let mut report = ReloadReport {
            replayed: 0,
            divergence: None,
            phases: Vec::new(),
        };
        let mut story = story;

        if !recorded.is_empty() {
            self.enter(Phase::Replaying, &mut report);
            let mut replay = Replay::new(recorded);

            loop {
                match replay.step(&mut story) {
                    ReplayStep::Applied { index, text } => {
                        self.show(&text);
                        self.record.push(index);
                        report.replayed += 1;
                    }
                    ReplayStep::Diverged { divergence, text } => {
                        self.show(&text);
                        self.enter(Phase::Fallback, &mut report);
                        warn!(%divergence, "replay diverged");
                        self.renderer.notice(&fallback_notice(&divergence));
                        report.divergence = Some(divergence);
                        break;
                    }
                    ReplayStep::Exhausted => break,
                }
            }
        }

        self.enter(Phase::PlayingLive, &mut report);
        self.story = Some(story);
        self.present();
        info!(replayed = report.replayed, diverged = report.diverged(), "story reloaded");
        report
    }

    fn enter(&mut self, phase: Phase, report: &mut ReloadReport) {
        debug!(from = %self.phase, to = %phase, "phase");
        self.phase = phase;
        report.phases.push(phase);
    }

    fn show(&mut self, text: &[String]) {
        for paragraph in text {
            self.renderer.paragraph(paragraph);
        }
    }

    /// Read up to the next choice point and show the choices.
    fn present(&mut self) {
        let Some(story) = self.story.as_mut() else {
            return;
        };
        for paragraph in story.continue_maximally() {
            self.renderer.paragraph(&paragraph);
        }
        self.renderer.choices(story.current_choices());
    }
}
