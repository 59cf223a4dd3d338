//! Profiler construction and ownership
//!
//! A [`Profiler`] owns one edge set, the background sampler feeding it and
//! the exporter reading it. Sampling starts on construction and stops on
//! [`Profiler::shutdown`] or drop.

use std::sync::{Arc, Mutex};

use axum::Router;
use log::info;

use crate::classification::PackageClassifier;
use crate::config::ProfilerConfig;
use crate::domain::{Edge, ProfilerError};
use crate::export::{Exporter, Renderer};
use crate::profiling::{Aggregator, EdgeSet, SamplerLoop, StackSource};
use crate::symbolization::AddressResolver;

pub struct Profiler {
    config: ProfilerConfig,
    exporter: Arc<Exporter>,
    sampler: SamplerLoop,
}

impl Profiler {
    /// Profile this process for packages under `filter_prefix`
    ///
    /// # Errors
    /// See [`Profiler::start`]
    pub fn new(filter_prefix: impl Into<String>) -> Result<Self, ProfilerError> {
        Self::start(ProfilerConfig::new(filter_prefix))
    }

    /// Profile this process with signal-based sampling and DWARF resolution
    ///
    /// # Errors
    /// Returns an error if the signal handler cannot be installed, the
    /// executable's debug info cannot be loaded or the sampler thread cannot
    /// be spawned
    #[cfg(target_os = "linux")]
    pub fn start(config: ProfilerConfig) -> Result<Self, ProfilerError> {
        use crate::profiling::signal_source::{SignalStackSource, DEFAULT_SIGNAL};
        use crate::symbolization::DwarfResolver;

        let resolver = DwarfResolver::for_current_exe()
            .map_err(|e| ProfilerError::SymbolizationFailed(format!("{e:#}")))?;
        let source = SignalStackSource::with_options(DEFAULT_SIGNAL, config.signal_timeout())?;
        Self::with_parts(config, source, resolver)
    }

    /// Stack sampling needs Linux signals and /proc
    ///
    /// # Errors
    /// Always returns [`ProfilerError::Unsupported`]; use [`Profiler::with_parts`]
    #[cfg(not(target_os = "linux"))]
    pub fn start(_config: ProfilerConfig) -> Result<Self, ProfilerError> {
        Err(ProfilerError::Unsupported)
    }

    /// Profile with caller-supplied capture and resolution primitives
    ///
    /// # Errors
    /// Returns an error if the sampler thread cannot be spawned
    pub fn with_parts<S, R>(
        config: ProfilerConfig,
        source: S,
        resolver: R,
    ) -> Result<Self, ProfilerError>
    where
        S: StackSource + Send + 'static,
        R: AddressResolver + Send + 'static,
    {
        let edges = Arc::new(Mutex::new(EdgeSet::new()));

        let aggregator = Aggregator::new(
            config.filter_prefix.clone(),
            PackageClassifier::new(config.path_marker.clone()),
            resolver,
        );
        let renderer = Renderer::new(
            config.render_command.clone(),
            config.render_args.clone(),
            config.render_timeout(),
        );
        let exporter =
            Arc::new(Exporter::new(edges.clone(), config.filter_prefix.clone(), renderer));

        let sampler = SamplerLoop::spawn(source, aggregator, edges, config.interval())?;
        info!("Dependency profiler started for \"{}\"", config.filter_prefix);

        Ok(Self { config, exporter, sampler })
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Sorted snapshot of every edge recorded so far
    #[must_use]
    pub fn edges(&self) -> Vec<Edge> {
        self.exporter.edges()
    }

    pub fn exporter(&self) -> Arc<Exporter> {
        self.exporter.clone()
    }

    /// HTTP surface for this profiler; see [`crate::http`]
    pub fn router(&self) -> Router {
        crate::http::router(self.exporter.clone())
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sampler.is_running()
    }

    /// Stop sampling; recorded edges stay available through the exporter
    pub fn stop(&mut self) {
        self.sampler.stop();
    }

    /// Stop sampling and release the profiler
    pub fn shutdown(mut self) {
        self.stop();
        info!("Dependency profiler stopped");
    }
}
