//! Profiling core modules
//!
//! The sampling pipeline, leaf-first:
//! - Thread enumeration for the current process
//! - Stack capture with retry-on-resize, behind the `StackSource` seam
//! - Signal-driven capture of every thread (Linux)
//! - Edge aggregation into the shared edge set
//! - The background loop driving capture and aggregation

pub mod aggregator;
pub mod background;
pub mod sampler;
#[cfg(target_os = "linux")]
pub mod signal_source;
#[cfg(target_os = "linux")]
pub mod threads;

// Re-export common types
pub use aggregator::{Aggregator, EdgeSet};
pub use background::{SamplerLoop, SAMPLER_THREAD_NAME};
pub use sampler::{capture_all, Capture, StackSource, CAPTURE_SLACK};
#[cfg(target_os = "linux")]
pub use signal_source::SignalStackSource;
#[cfg(target_os = "linux")]
pub use threads::{current_tid, list_own_threads};
