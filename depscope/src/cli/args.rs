//! CLI argument definitions

use clap::Parser;
use std::net::SocketAddr;

use crate::config::{
    ProfilerConfig, DEFAULT_INTERVAL_MS, DEFAULT_RENDER_COMMAND, DEFAULT_RENDER_TIMEOUT_MS,
};

#[derive(Parser)]
#[command(
    name = "depscope",
    about = "Serve a live package dependency graph of this process",
    after_help = "\
EXAMPLES:
    depscope --prefix index.crates.io              Crates calling into crates
    depscope --listen 0.0.0.0:6060 --prefix ''     Every classifiable package
    depscope --renderer cat                        Serve DOT text instead of SVG"
)]
pub struct Args {
    /// Address to serve the graph on
    #[arg(short, long, default_value = "127.0.0.1:6060")]
    pub listen: SocketAddr,

    /// Only track packages whose id starts with this
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Source-root marker in resolved file paths
    #[arg(short, long, default_value = "/src/")]
    pub marker: String,

    /// Sampling interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Graph layout command, fed DOT on stdin
    #[arg(long, default_value = DEFAULT_RENDER_COMMAND)]
    pub renderer: String,

    /// Arguments for the layout command
    #[arg(
        long = "renderer-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        default_values_t = vec!["-Tsvg".to_string()]
    )]
    pub renderer_args: Vec<String>,

    /// Kill the layout command after this many milliseconds
    #[arg(long, default_value_t = DEFAULT_RENDER_TIMEOUT_MS)]
    pub render_timeout_ms: u64,
}

impl Args {
    #[must_use]
    pub fn profiler_config(&self) -> ProfilerConfig {
        ProfilerConfig {
            filter_prefix: self.prefix.clone(),
            path_marker: self.marker.clone(),
            interval_ms: self.interval_ms,
            render_command: self.renderer.clone(),
            render_args: self.renderer_args.clone(),
            render_timeout_ms: self.render_timeout_ms,
            ..ProfilerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_profiler_defaults() {
        let args = Args::parse_from(["depscope"]);
        assert_eq!(args.profiler_config(), ProfilerConfig::default());
        assert_eq!(args.listen.port(), 6060);
    }

    #[test]
    fn test_flags_flow_into_config() {
        let args = Args::parse_from([
            "depscope",
            "--prefix",
            "app/",
            "--marker",
            "/crates/",
            "--renderer",
            "dot",
            "--renderer-arg",
            "-Tpng",
        ]);
        let config = args.profiler_config();
        assert_eq!(config.filter_prefix, "app/");
        assert_eq!(config.path_marker, "/crates/");
        assert_eq!(config.render_args, vec!["-Tpng"]);
    }
}
