//! Graph export
//!
//! Turns a consistent snapshot of the edge set into a Graphviz description
//! and hands it to an external layout engine.
//!
//! The edge-set lock is held only while the description is serialized. The
//! renderer runs on the finished snapshot, so a slow or hung renderer can
//! never stall the sampler or other requests.

pub mod dot;
pub mod renderer;

pub use dot::write_dot;
pub use renderer::Renderer;

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{Edge, ExportError};
use crate::profiling::EdgeSet;

/// Read side of a profiler's edge set
#[derive(Debug)]
pub struct Exporter {
    edges: Arc<Mutex<EdgeSet>>,
    prefix: String,
    renderer: Renderer,
}

impl Exporter {
    pub fn new(edges: Arc<Mutex<EdgeSet>>, prefix: impl Into<String>, renderer: Renderer) -> Self {
        Self { edges, prefix: prefix.into(), renderer }
    }

    /// Sorted copy of every recorded edge
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.edges.lock().unwrap_or_else(PoisonError::into_inner).to_vec()
    }

    /// DOT description of the current edge set
    ///
    /// # Errors
    /// Only fails if writing to memory fails
    pub fn dot(&self) -> Result<Vec<u8>, ExportError> {
        let mut buf = Vec::new();
        let edges = self.edges.lock().unwrap_or_else(PoisonError::into_inner);
        write_dot(&edges, &self.prefix, &mut buf)?;
        Ok(buf)
    }

    /// Render the current edge set through the external layout engine
    ///
    /// # Errors
    /// Returns an error if the renderer is missing, fails or times out
    pub async fn render(&self) -> Result<Vec<u8>, ExportError> {
        let description = self.dot()?;
        self.renderer.render(description).await
    }
}
