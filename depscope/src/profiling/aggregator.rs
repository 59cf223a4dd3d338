//! # Edge Aggregation
//!
//! Folds captured stacks into the shared dependency edge set.
//!
//! ## Walking a stack
//!
//! Frames are visited innermost first. Every frame is resolved to a file,
//! the file to a package, and the package is kept only if it lives under the
//! namespace prefix. Rejected frames are invisible: they neither produce an
//! edge nor reset the cursor, so two accepted packages separated only by
//! rejected frames count as adjacent.
//!
//! ```text
//! frame (innermost first)        package        cursor     edge
//! ─────────────────────────────  ─────────────  ─────────  ──────────────────
//! /go/src/appX/pkg2/h.go         appX/pkg2      -          -
//! /go/src/appX/pkg2/g.go         appX/pkg2      appX/pkg2  - (same package)
//! /go/src/appX/pkg1/f.go         appX/pkg1      appX/pkg2  appX/pkg1 → appX/pkg2
//! /go/src/libB/b.go              (filtered)     appX/pkg1  -
//! ```
//!
//! Since the walk starts at the innermost frame, the cursor always holds the
//! callee when its caller is visited, and edges read "from calls into to".
//!
//! ## Locking
//!
//! Resolution and classification run without the lock. The edges of a whole
//! tick are then inserted under a single lock acquisition, so an exporter
//! sees either all of a tick or none of it.

use log::debug;
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use crate::classification::PackageClassifier;
use crate::domain::{Edge, PackageId, StackSample};
use crate::symbolization::AddressResolver;

/// Deduplicated set of every edge observed since the profiler started
///
/// Entries are never evicted. Growth is bounded by the number of package
/// pairs in the profiled namespace, which is small for a diagnostic tool
/// but unbounded in principle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: BTreeSet<Edge>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge, returning true if it was not present
    ///
    /// Self-edges are rejected.
    pub fn insert(&mut self, edge: Edge) -> bool {
        if edge.from == edge.to {
            return false;
        }
        self.edges.insert(edge)
    }

    #[must_use]
    pub fn contains(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges in sorted order
    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Edge> {
        self.edges.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a Edge;
    type IntoIter = std::collections::btree_set::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

/// Turns captured stacks into edges between packages of one namespace
pub struct Aggregator<R> {
    prefix: String,
    classifier: PackageClassifier,
    resolver: R,
}

impl<R: AddressResolver> Aggregator<R> {
    pub fn new(prefix: impl Into<String>, classifier: PackageClassifier, resolver: R) -> Self {
        Self { prefix: prefix.into(), classifier, resolver }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Package of one frame, if it is part of the profiled namespace
    fn accept(&mut self, addr: u64) -> Option<PackageId> {
        let file = self.resolver.resolve(addr)?;
        let pkg = self.classifier.classify(&file)?;
        pkg.has_prefix(&self.prefix).then_some(pkg)
    }

    /// Edges implied by one stack, in walk order (may contain duplicates)
    pub fn stack_edges(&mut self, sample: &StackSample, out: &mut Vec<Edge>) {
        let mut cursor: Option<PackageId> = None;

        for &addr in &sample.frames {
            let Some(pkg) = self.accept(addr) else { continue };
            if let Some(prev) = cursor.as_ref() {
                if *prev != pkg {
                    out.push(Edge { from: pkg.clone(), to: prev.clone() });
                }
            }
            cursor = Some(pkg);
        }
    }

    /// Record the edges of one tick's samples
    ///
    /// Returns how many edges were new.
    pub fn aggregate(&mut self, samples: &[StackSample], edges: &Mutex<EdgeSet>) -> usize {
        let mut found = Vec::new();
        for sample in samples {
            self.stack_edges(sample, &mut found);
        }

        // no invariant spans entries, so a panicked holder leaves the set usable
        let mut set = edges.lock().unwrap_or_else(PoisonError::into_inner);
        let added = found.into_iter().filter(|edge| set.insert(edge.clone())).count();

        if added > 0 {
            debug!("Recorded {added} new edge(s), {} total", set.len());
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolization::StaticResolver;

    fn resolver() -> StaticResolver {
        StaticResolver::new()
            .with(1, "/go/src/libA/a.go")
            .with(2, "/go/src/libB/b.go")
            .with(3, "/go/src/appX/pkg1/f.go")
            .with(4, "/go/src/appX/pkg2/g.go")
            .with(5, "/go/src/appX/pkg2/h.go")
            .with(6, "/go/src/appX/pkg3/k.go")
            .with(7, "/usr/lib/runtime/proc.go")
            .with(8, "/go/src/appX/main.go")
    }

    fn aggregator() -> Aggregator<StaticResolver> {
        Aggregator::new("appX/", PackageClassifier::default(), resolver())
    }

    #[test]
    fn test_edge_set_rejects_self_edges() {
        let mut set = EdgeSet::new();
        assert!(!set.insert(Edge::new("app/a", "app/a")));
        assert!(set.is_empty());
    }

    #[test]
    fn test_edge_set_deduplicates() {
        let mut set = EdgeSet::new();
        assert!(set.insert(Edge::new("app/a", "app/b")));
        assert!(!set.insert(Edge::new("app/a", "app/b")));
        assert!(set.insert(Edge::new("app/b", "app/a")));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_edge_set_iterates_sorted() {
        let mut set = EdgeSet::new();
        set.insert(Edge::new("app/c", "app/a"));
        set.insert(Edge::new("app/a", "app/b"));
        let order: Vec<String> = set.iter().map(ToString::to_string).collect();
        assert_eq!(order, vec!["app/a -> app/b", "app/c -> app/a"]);
    }

    #[test]
    fn test_stack_edges_points_from_outer_to_inner() {
        let mut agg = aggregator();
        let mut out = Vec::new();
        // innermost first: pkg2 is called by pkg1, which is called by pkg3
        agg.stack_edges(&StackSample::new(vec![4, 3, 6]), &mut out);

        assert_eq!(
            out,
            vec![Edge::new("appX/pkg1", "appX/pkg2"), Edge::new("appX/pkg3", "appX/pkg1")]
        );
    }

    #[test]
    fn test_filtered_frames_are_invisible() {
        let mut agg = aggregator();
        let mut out = Vec::new();
        agg.stack_edges(&StackSample::new(vec![3, 1, 7, 0xdead, 2, 6]), &mut out);

        assert_eq!(out, vec![Edge::new("appX/pkg3", "appX/pkg1")]);
    }

    #[test]
    fn test_unclassifiable_frames_do_not_reset_cursor() {
        let mut agg = aggregator();
        let mut out = Vec::new();
        // 8 sits directly under the source root and has no package
        agg.stack_edges(&StackSample::new(vec![3, 8, 6]), &mut out);

        assert_eq!(out, vec![Edge::new("appX/pkg3", "appX/pkg1")]);
    }

    #[test]
    fn test_aggregate_counts_new_edges_only() {
        let mut agg = aggregator();
        let edges = Mutex::new(EdgeSet::new());
        let samples = vec![StackSample::new(vec![4, 3]), StackSample::new(vec![5, 3])];

        assert_eq!(agg.aggregate(&samples, &edges), 1);
        assert_eq!(agg.aggregate(&samples, &edges), 0);
        assert_eq!(edges.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_aggregate_survives_poisoned_lock() {
        let edges = std::sync::Arc::new(Mutex::new(EdgeSet::new()));
        let poisoner = edges.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison");
        })
        .join();

        let mut agg = aggregator();
        assert_eq!(agg.aggregate(&[StackSample::new(vec![4, 3])], &edges), 1);
    }

    #[test]
    fn test_aggregate_empty_tick() {
        let mut agg = aggregator();
        let edges = Mutex::new(EdgeSet::new());
        assert_eq!(agg.aggregate(&[], &edges), 0);
        assert_eq!(agg.aggregate(&[StackSample::default()], &edges), 0);
        assert!(edges.lock().unwrap().is_empty());
    }
}
