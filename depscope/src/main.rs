//! # depscope - Demo Host
//!
//! Runs the profiler against this very process and serves the graph. Useful
//! for checking that symbolization and rendering work on a machine before
//! embedding the library in a real service.
//!
//! ```bash
//! RUST_LOG=depscope=debug depscope --prefix index.crates.io
//! curl 'http://127.0.0.1:6060/?show=graph' > deps.svg
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use depscope::cli::Args;
use depscope::Profiler;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_ERROR
        }
    });
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();

    let profiler =
        Profiler::start(args.profiler_config()).context("Failed to start dependency profiler")?;

    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("Serving dependency graph on http://{}/?show=graph", args.listen);
    println!("depscope v{} listening on http://{}", env!("CARGO_PKG_VERSION"), args.listen);

    axum::serve(listener, profiler.router())
        .with_graceful_shutdown(async {
            // without a Ctrl+C handler, run until killed
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("HTTP server failed")?;

    profiler.shutdown();
    Ok(())
}
