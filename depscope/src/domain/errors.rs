//! Structured error types for depscope
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Failed to install handler for signal {signal}: {source}")]
    SignalSetupFailed {
        signal: i32,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn sampler thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Symbol resolution failed: {0}")]
    SymbolizationFailed(String),

    #[error("Stack sampling is not supported on this platform")]
    Unsupported,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Graph renderer `{0}` not found (is Graphviz installed?)")]
    RendererNotFound(String),

    #[error("Failed to start graph renderer `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write graph description to renderer: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Graph renderer `{command}` exited with {status}")]
    RendererFailed { command: String, status: std::process::ExitStatus },

    #[error("Graph renderer `{command}` did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
