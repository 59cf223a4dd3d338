//! Package classification for resolved source files.
//!
//! A frame's package is inferred purely from the shape of its file path:
//! everything between a source-root marker and the file name is the package
//! identity.
//!
//! ```text
//! /home/dev/go/src/github.com/acme/shop/cart/cart.go
//!              ^^^^^ marker
//!                   ^^^^^^^^^^^^^^^^^^^^^^^^^^ package
//! ```
//!
//! # Limitations
//!
//! This is a heuristic, not a build-graph lookup. It assumes the marker
//! appears in every path worth classifying and that the first occurrence is
//! the source root. Paths produced by other layouts (registry checkouts,
//! toolchain sources, generated code) either fail to classify or yield an id
//! outside the profiled namespace, and are skipped by the aggregator.

use crate::domain::PackageId;

/// Source-root marker used when none is configured
pub const DEFAULT_PATH_MARKER: &str = "/src/";

/// Extracts package identities from source file paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageClassifier {
    marker: String,
}

impl Default for PackageClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_MARKER)
    }
}

impl PackageClassifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Classify a file path
    ///
    /// Returns None if the marker is absent or if no directory sits between
    /// the marker and the file name.
    #[must_use]
    pub fn classify(&self, file: &str) -> Option<PackageId> {
        if self.marker.is_empty() {
            return None;
        }
        let start = file.find(&self.marker)? + self.marker.len();
        let end = file.rfind('/')?;
        if end <= start {
            return None;
        }
        Some(PackageId(file[start..end].to_string()))
    }
}
