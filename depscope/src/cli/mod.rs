//! Command-line interface for the demo host binary

pub mod args;

pub use args::Args;
