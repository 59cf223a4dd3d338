//! Background sampling loop
//!
//! A dedicated OS thread alternates capture and aggregation, then waits for
//! the sampling interval. The wait doubles as the stop signal: dropping or
//! stopping the [`SamplerLoop`] wakes the thread immediately.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{error, info, trace};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::aggregator::{Aggregator, EdgeSet};
use super::sampler::{capture_all, StackSource};
use crate::domain::ProfilerError;
use crate::symbolization::AddressResolver;

/// Name of the sampler thread, as shown in /proc and debuggers
pub const SAMPLER_THREAD_NAME: &str = "depscope-sampler";

/// Handle to the running sampler thread
#[derive(Debug)]
pub struct SamplerLoop {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SamplerLoop {
    /// Start sampling `source` into `edges` every `interval`
    ///
    /// The first tick runs immediately.
    ///
    /// # Errors
    /// Returns an error if the thread cannot be spawned
    pub fn spawn<S, R>(
        mut source: S,
        mut aggregator: Aggregator<R>,
        edges: Arc<Mutex<EdgeSet>>,
        interval: Duration,
    ) -> Result<Self, ProfilerError>
    where
        S: StackSource + Send + 'static,
        R: AddressResolver + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || {
                info!(
                    "Sampling stacks every {interval:?} for packages under \"{}\"",
                    aggregator.prefix()
                );
                let mut ticks: u64 = 0;
                loop {
                    // capture happens outside the edge-set lock
                    let samples = capture_all(&mut source);
                    let added = aggregator.aggregate(&samples, &edges);
                    ticks += 1;
                    trace!("Tick {ticks}: {} stacks, {added} new edges", samples.len());

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("Sampler stopped after {ticks} ticks");
            })
            .map_err(ProfilerError::SpawnFailed)?;

        Ok(Self { stop_tx: Some(stop_tx), handle: Some(handle) })
    }

    /// True until [`SamplerLoop::stop`] has been called
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop the loop and wait for the in-flight tick to finish
    ///
    /// Calling this more than once is harmless.
    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // the thread may already be gone; disconnect stops it too
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Sampler thread panicked");
            }
        }
    }
}

impl Drop for SamplerLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
