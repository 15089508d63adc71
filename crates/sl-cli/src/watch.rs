//! Input sources for `loom play`: stdin lines and, with `--watch`, file changes.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

/// Quiet period after the last file event before a batch is delivered.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// One input to the play loop.
#[derive(Debug)]
pub enum Input {
    /// A line typed by the player.
    Line(String),
    /// Files changed since the last batch.
    Changed(BTreeSet<PathBuf>),
    /// Stdin reached its end.
    Closed,
}

/// Forward stdin lines to `tx`, then [`Input::Closed`] at end of input.
pub fn read_lines(tx: Sender<Input>) {
    thread::spawn(move || {
        for line in io::stdin().lines() {
            let Ok(line) = line else { break };
            if tx.send(Input::Line(line)).is_err() {
                return;
            }
        }
        let _ = tx.send(Input::Closed);
    });
}

/// Watch `dir` recursively and forward debounced batches of changed paths to `tx`.
///
/// Events stop when the returned watcher is dropped.
pub fn spawn(dir: &Path, tx: Sender<Input>) -> notify::Result<RecommendedWatcher> {
    let (notify_tx, notify_rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    thread::spawn(move || forward(notify_rx, tx));
    Ok(watcher)
}

fn forward(rx: Receiver<notify::Result<Event>>, tx: Sender<Input>) {
    let mut pending = BTreeSet::new();
    loop {
        let received = if pending.is_empty() {
            rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            rx.recv_timeout(DEBOUNCE)
        };
        match received {
            Ok(Ok(event)) => pending.extend(changed_paths(&event)),
            Ok(Err(e)) => warn!(error = %e, "watch error"),
            Err(RecvTimeoutError::Timeout) => {
                debug!(count = pending.len(), "files changed");
                if tx.send(Input::Changed(std::mem::take(&mut pending))).is_err() {
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Paths in `event` whose content may have changed.
pub fn changed_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        // Permission and timestamp updates do not touch content.
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => event.paths.clone(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, MetadataKind};

    fn event(kind: EventKind) -> Event {
        Event::new(kind).add_path(PathBuf::from("/stories/main.tale"))
    }

    #[test]
    fn content_changes_are_reported() {
        for kind in [
            EventKind::Create(CreateKind::File),
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            EventKind::Remove(notify::event::RemoveKind::File),
        ] {
            assert_eq!(changed_paths(&event(kind)), vec![PathBuf::from("/stories/main.tale")]);
        }
    }

    #[test]
    fn metadata_and_access_are_ignored() {
        assert!(changed_paths(&event(EventKind::Modify(ModifyKind::Metadata(MetadataKind::Any)))).is_empty());
        assert!(changed_paths(&event(EventKind::Access(AccessKind::Any))).is_empty());
    }

    #[test]
    fn burst_of_events_is_delivered_as_one_batch() {
        let (notify_tx, notify_rx) = mpsc::channel();
        let (tx, rx) = mpsc::channel();
        let worker = thread::spawn(move || forward(notify_rx, tx));

        for name in ["a.tale", "b.part", "a.tale"] {
            let event = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(PathBuf::from(name));
            notify_tx.send(Ok(event)).unwrap();
        }

        let Input::Changed(paths) = rx.recv().unwrap() else {
            panic!("expected a batch of changes");
        };
        assert_eq!(paths.into_iter().collect::<Vec<_>>(), vec![PathBuf::from("a.tale"), PathBuf::from("b.part")]);

        drop(notify_tx);
        worker.join().unwrap();
    }
}
