//! Embedding depscope in an axum service
//!
//! The profiler is mounted under `/debug/deps` next to the service's own
//! routes. The prefix targets crates from the registry, so the graph shows
//! how hyper, tokio and axum call into each other while serving requests.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example embedded-server
//!
//! # In another terminal: generate load, then fetch the graph
//! hey -n 5000 -c 20 http://localhost:3000/work
//! curl 'http://localhost:3000/debug/deps?show=graph' > deps.svg
//! ```

use axum::{routing::get, Router};
use depscope::{Profiler, ProfilerConfig};

async fn work() -> String {
    let mut result = String::from("depscope");
    for _ in 0..5_000 {
        result = result.chars().rev().collect();
    }
    result
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let profiler = Profiler::start(ProfilerConfig::new("index.crates.io"))?;

    let app = Router::new().route("/work", get(work)).nest("/debug/deps", profiler.router());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    println!("Service listening on http://localhost:3000");
    println!("Dependency graph at http://localhost:3000/debug/deps?show=graph");
    axum::serve(listener, app).await?;

    profiler.shutdown();
    Ok(())
}
