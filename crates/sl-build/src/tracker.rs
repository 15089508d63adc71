//! Reverse dependency index from included documents to the roots that include them.
//!
//! The index is a many-to-many relation stored twice:
//! - forward: root → documents it included in its latest compilation pass
//! - reverse: included document → roots depending on it
//!
//! Every edge is owned by its root. [`DependencyTracker::clear`] walks only the
//! root's own forward set, so it costs O(edges of that root) and can never
//! touch an edge owned by another root, even when both include the same file.
//!
//! Paths are stored as given; callers pass normalized paths
//! (see [`normalize_path`](crate::paths::normalize_path)).

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::debug;

/// Ordered set of document paths.
pub type PathSet = BTreeSet<PathBuf>;

/// Many-to-many index of inclusion edges.
///
/// # Invariants
/// - `(root, file)` is in `forward` iff it is in `reverse`
/// - no empty sets are stored
/// - no self-edges `(root, root)`
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DependencyTracker {
    forward: BTreeMap<PathBuf, PathSet>,
    reverse: BTreeMap<PathBuf, PathSet>,
}

impl DependencyTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `root` includes `included`.
    ///
    /// Idempotent. Returns `true` if the edge is new. A root including itself
    /// is ignored.
    pub fn track(&mut self, root: &Path, included: &Path) -> bool {
        if root == included {
            return false;
        }

        let added = self
            .forward
            .entry(root.to_path_buf())
            .or_default()
            .insert(included.to_path_buf());
        if added {
            self.reverse
                .entry(included.to_path_buf())
                .or_default()
                .insert(root.to_path_buf());
            debug!(root = %root.display(), included = %included.display(), "tracking include");
        }
        added
    }

    /// Drop every edge owned by `root`. Returns how many edges were removed.
    pub fn clear(&mut self, root: &Path) -> usize {
        let Some(included) = self.forward.remove(root) else {
            return 0;
        };

        for file in &included {
            if let Some(dependents) = self.reverse.get_mut(file) {
                dependents.remove(root);
                if dependents.is_empty() {
                    self.reverse.remove(file);
                }
            }
        }

        debug!(root = %root.display(), removed = included.len(), "cleared includes");
        included.len()
    }

    /// Roots that currently include `changed`. Empty when nothing depends on it.
    pub fn affected_roots(&self, changed: &Path) -> PathSet {
        self.reverse.get(changed).cloned().unwrap_or_default()
    }

    /// Documents `root` included in its latest pass.
    pub fn includes_of(&self, root: &Path) -> Option<&PathSet> {
        self.forward.get(root)
    }

    /// Roots that own at least one edge.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.forward.keys().map(PathBuf::as_path)
    }

    /// Every included document with the roots depending on it.
    pub fn dependents(&self) -> impl Iterator<Item = (&Path, &PathSet)> {
        self.reverse.iter().map(|(file, roots)| (file.as_path(), roots))
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    /// Returns `true` if no edges are tracked.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    fn set(paths: &[&str]) -> PathSet {
        paths.iter().map(|p| path(p)).collect()
    }

    #[test]
    fn new_tracker_is_empty() {
        let tracker = DependencyTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.affected_roots(&path("/any.tale")).is_empty());
    }

    #[test]
    fn editing_include_reports_root() {
        let mut tracker = DependencyTracker::new();
        tracker.track(&path("/s/main.tale"), &path("/s/common.tale"));

        assert_eq!(
            tracker.affected_roots(&path("/s/common.tale")),
            set(&["/s/main.tale"])
        );
        assert!(tracker.affected_roots(&path("/s/untracked.tale")).is_empty());
        assert!(tracker.affected_roots(&path("/s/main.tale")).is_empty());
    }

    #[test]
    fn track_is_idempotent() {
        let mut tracker = DependencyTracker::new();
        assert!(tracker.track(&path("/a.tale"), &path("/inc.tale")));
        assert!(!tracker.track(&path("/a.tale"), &path("/inc.tale")));
        assert_eq!(tracker.edge_count(), 1);
    }

    #[test]
    fn self_edges_are_ignored() {
        let mut tracker = DependencyTracker::new();
        assert!(!tracker.track(&path("/a.tale"), &path("/a.tale")));
        assert!(tracker.is_empty());
    }

    #[test]
    fn shared_include_survives_clearing_one_root() {
        let mut tracker = DependencyTracker::new();
        tracker.track(&path("/a.tale"), &path("/shared.tale"));
        tracker.track(&path("/b.tale"), &path("/shared.tale"));
        assert_eq!(
            tracker.affected_roots(&path("/shared.tale")),
            set(&["/a.tale", "/b.tale"])
        );

        assert_eq!(tracker.clear(&path("/a.tale")), 1);
        assert_eq!(
            tracker.affected_roots(&path("/shared.tale")),
            set(&["/b.tale"])
        );
    }

    #[test]
    fn retracking_smaller_set_drops_old_edges() {
        let mut tracker = DependencyTracker::new();
        let root = path("/main.tale");
        tracker.track(&root, &path("/x.tale"));
        tracker.track(&root, &path("/y.tale"));

        tracker.clear(&root);
        tracker.track(&root, &path("/x.tale"));

        assert_eq!(tracker.affected_roots(&path("/x.tale")), set(&["/main.tale"]));
        assert!(tracker.affected_roots(&path("/y.tale")).is_empty());
        assert_eq!(tracker.includes_of(&root), Some(&set(&["/x.tale"])));
    }

    #[test]
    fn clearing_unknown_root_is_a_no_op() {
        let mut tracker = DependencyTracker::new();
        tracker.track(&path("/a.tale"), &path("/inc.tale"));
        let before = tracker.clone();

        assert_eq!(tracker.clear(&path("/b.tale")), 0);
        assert_eq!(tracker, before);
    }

    #[test]
    fn dependents_lists_reverse_index() {
        let mut tracker = DependencyTracker::new();
        tracker.track(&path("/a.tale"), &path("/x.tale"));
        tracker.track(&path("/b.tale"), &path("/x.tale"));
        tracker.track(&path("/b.tale"), &path("/y.tale"));

        let listed: Vec<_> = tracker
            .dependents()
            .map(|(file, roots)| (file.to_path_buf(), roots.len()))
            .collect();
        assert_eq!(listed, vec![(path("/x.tale"), 2), (path("/y.tale"), 1)]);
        let roots: Vec<_> = tracker.roots().collect();
        assert_eq!(roots, vec![Path::new("/a.tale"), Path::new("/b.tale")]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        #[derive(Debug, Clone)]
        enum Op {
            Track(u8, u8),
            Clear(u8),
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                3 => (0u8..4, 0u8..6).prop_map(|(r, f)| Op::Track(r, f)),
                1 => (0u8..4).prop_map(Op::Clear),
            ]
        }

        fn root(r: u8) -> PathBuf {
            PathBuf::from(format!("/roots/{r}.tale"))
        }

        fn file(f: u8) -> PathBuf {
            PathBuf::from(format!("/inc/{f}.tale"))
        }

        proptest! {
            #[test]
            fn affected_roots_match_live_edges(ops in prop::collection::vec(op(), 0..64)) {
                let mut tracker = DependencyTracker::new();
                let mut model: HashSet<(u8, u8)> = HashSet::new();

                for op in &ops {
                    match *op {
                        Op::Track(r, f) => {
                            tracker.track(&root(r), &file(f));
                            model.insert((r, f));
                        }
                        Op::Clear(r) => {
                            tracker.clear(&root(r));
                            model.retain(|&(owner, _)| owner != r);
                        }
                    }
                }

                for f in 0u8..6 {
                    let expected: PathSet = model
                        .iter()
                        .filter(|&&(_, file)| file == f)
                        .map(|&(r, _)| root(r))
                        .collect();
                    prop_assert_eq!(tracker.affected_roots(&file(f)), expected);
                }
                prop_assert_eq!(tracker.edge_count(), model.len());
            }

            #[test]
            fn clearing_one_root_never_touches_another(
                ops in prop::collection::vec(op(), 0..64),
                victim in 0u8..4,
            ) {
                let mut tracker = DependencyTracker::new();
                for op in &ops {
                    match *op {
                        Op::Track(r, f) => { tracker.track(&root(r), &file(f)); }
                        Op::Clear(r) => { tracker.clear(&root(r)); }
                    }
                }

                let others: Vec<_> = (0u8..4)
                    .filter(|&r| r != victim)
                    .map(|r| (r, tracker.includes_of(&root(r)).cloned()))
                    .collect();

                tracker.clear(&root(victim));

                prop_assert!(tracker.includes_of(&root(victim)).is_none());
                for (r, before) in others {
                    prop_assert_eq!(tracker.includes_of(&root(r)).cloned(), before);
                    for f in 0u8..6 {
                        let tracked = tracker.includes_of(&root(r)).is_some_and(|s| s.contains(&file(f)));
                        prop_assert_eq!(tracker.affected_roots(&file(f)).contains(&root(r)), tracked);
                    }
                }
            }

            #[test]
            fn unrelated_call_order_does_not_matter(
                a in prop::collection::vec(0u8..6, 0..8),
                b in prop::collection::vec(0u8..6, 0..8),
            ) {
                let mut first = DependencyTracker::new();
                for &f in &a { first.track(&root(0), &file(f)); }
                for &f in &b { first.track(&root(1), &file(f)); }

                let mut second = DependencyTracker::new();
                for &f in &b { second.track(&root(1), &file(f)); }
                for &f in &a { second.track(&root(0), &file(f)); }

                prop_assert_eq!(first, second);
            }
        }
    }
}
