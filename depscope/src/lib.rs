//! # depscope - Runtime Package Dependency Profiler
//!
//! depscope is an embedded diagnostic tool for a live service. It samples
//! the call stacks of every thread in its own process, works out which
//! packages call into which other packages, and serves the resulting
//! dependency graph over HTTP as an SVG rendered by Graphviz.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Host Application                            │
//! │        (threads running code in the profiled namespace)         │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ SIGPROF, one thread at a time
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   depscope (This Crate)                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐        │
//! │  │   Sampler    │──▶│  Aggregator  │──▶│   EdgeSet    │        │
//! │  │  (signals)   │   │              │   │   (Mutex)    │        │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘        │
//! │                            │                   │                │
//! │                            ▼                   ▼                │
//! │                     ┌──────────────┐   ┌──────────────┐        │
//! │                     │ Symbolizer + │   │   Exporter   │──▶ dot │
//! │                     │  Classifier  │   │  (HTTP/axum) │        │
//! │                     └──────────────┘   └──────────────┘        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`profiling`]: stack capture, edge aggregation and the background loop
//! - [`symbolization`]: address to source file via DWARF (`addr2line`)
//! - [`classification`]: source file to package id
//! - [`export`]: DOT description and the external renderer
//! - [`http`]: `axum` router exposing the graph
//! - [`profiler`]: construction interface tying it together
//! - [`config`], [`domain`]: configuration, core types and errors
//!
//! ## Typical Usage
//!
//! ```rust,ignore
//! let profiler = depscope::Profiler::new("myservice/")?;
//! let app = axum::Router::new().nest("/debug/deps", profiler.router());
//! ```
//!
//! The host binary needs line-table debug info (`debug = "line-tables-only"`
//! or more) for addresses to resolve to files.

pub mod classification;
pub mod cli;
pub mod config;
pub mod domain;
pub mod export;
pub mod http;
pub mod profiler;
pub mod profiling;
pub mod symbolization;

pub use config::ProfilerConfig;
pub use domain::{Edge, ExportError, PackageId, ProfilerError};
pub use profiler::Profiler;
