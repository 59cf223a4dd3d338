//! Domain types providing compile-time safety and self-documentation
//!
//! These newtype wrappers keep package identities apart from the raw file
//! paths they are derived from, and make function signatures more expressive.

use serde::Serialize;
use std::fmt;

/// Logical package identity
///
/// A slash-delimited directory chain taken from a source file path, such as
/// `myapp/net/tcp`. Two ids are equal iff their strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PackageId(pub String);

impl PackageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this package lives under the given namespace prefix
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Display label with the namespace prefix removed
    ///
    /// The stored id is never modified; this only affects rendering.
    #[must_use]
    pub fn display_label<'a>(&'a self, prefix: &str) -> &'a str {
        self.0.strip_prefix(prefix).unwrap_or(&self.0)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PackageId {
    fn from(s: &str) -> Self {
        PackageId(s.to_string())
    }
}

/// Directed dependency between two packages
///
/// `from` is the caller side and `to` the callee side, as observed through
/// stack adjacency (filtered-out frames in between are invisible).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub from: PackageId,
    pub to: PackageId,
}

impl Edge {
    pub fn new(from: impl Into<PackageId>, to: impl Into<PackageId>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Thread ID
///
/// Kernel thread id as used by `tgkill` and `/proc/<pid>/task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tid(pub i32);

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TID:{}", self.0)
    }
}

/// One thread's call chain at a point in time
///
/// Addresses are ordered innermost frame first. Samples are produced fresh
/// on every tick and dropped after aggregation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSample {
    pub frames: Vec<u64>,
}

impl StackSample {
    pub fn new(frames: Vec<u64>) -> Self {
        Self { frames }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl From<Vec<u64>> for StackSample {
    fn from(frames: Vec<u64>) -> Self {
        Self { frames }
    }
}
