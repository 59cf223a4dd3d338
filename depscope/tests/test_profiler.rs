use depscope::domain::{Edge, StackSample};
use depscope::profiling::{Capture, StackSource};
use depscope::symbolization::StaticResolver;
use depscope::{Profiler, ProfilerConfig};
use std::time::{Duration, Instant};

/// Every thread is always inside web, which calls into db through a third-party frame
struct FixedSource;

impl StackSource for FixedSource {
    fn live_count(&mut self) -> usize {
        2
    }

    fn capture(&mut self, buf: &mut [StackSample]) -> Capture {
        if buf.len() < 2 {
            return Capture::CapacityExceeded { live: 2 };
        }
        buf[0] = StackSample::new(vec![3, 2, 1]);
        buf[1] = StackSample::new(vec![0x999]);
        Capture::Complete(2)
    }
}

fn resolver() -> StaticResolver {
    StaticResolver::new()
        .with(1, "/srv/shop/src/shop/web/handler.rs")
        .with(2, "/home/ci/.cargo/registry/src/index.crates.io-6f17d22bba15001f/sqlx-0.8.0/src/pool.rs")
        .with(3, "/srv/shop/src/shop/db/query.rs")
}

fn wait_for_edges(profiler: &Profiler) -> Vec<Edge> {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let edges = profiler.edges();
        if !edges.is_empty() || Instant::now() >= deadline {
            return edges;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_profiler_records_edges_in_background() {
    let config = ProfilerConfig::new("shop/")
        .with_interval(Duration::from_millis(5))
        .with_renderer("cat", vec![]);
    let profiler = Profiler::with_parts(config, FixedSource, resolver()).unwrap();
    assert!(profiler.is_running());

    assert_eq!(wait_for_edges(&profiler), vec![Edge::new("shop/web", "shop/db")]);
    assert_eq!(profiler.exporter().dot().unwrap(), b"digraph g {\n  \"web\" -> \"db\";\n}\n");

    profiler.shutdown();
}

#[test]
fn test_edges_survive_stop() {
    let config = ProfilerConfig::new("shop/").with_interval(Duration::from_millis(5));
    let mut profiler = Profiler::with_parts(config, FixedSource, resolver()).unwrap();

    assert!(!wait_for_edges(&profiler).is_empty());
    profiler.stop();
    assert!(!profiler.is_running());
    assert_eq!(profiler.edges(), vec![Edge::new("shop/web", "shop/db")]);
}

#[tokio::test]
async fn test_profiler_renders_through_configured_renderer() {
    let config = ProfilerConfig::new("shop/")
        .with_interval(Duration::from_millis(5))
        .with_renderer("cat", vec![]);
    let profiler = Profiler::with_parts(config, FixedSource, resolver()).unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while profiler.edges().is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let rendered = profiler.exporter().render().await.unwrap();
    assert_eq!(String::from_utf8(rendered).unwrap(), "digraph g {\n  \"web\" -> \"db\";\n}\n");
}

#[cfg(target_os = "linux")]
#[test]
fn test_live_profiler_starts_and_stops() {
    let config = ProfilerConfig::new("depscope-test-namespace/").with_interval(Duration::from_millis(10));
    let profiler = Profiler::start(config).expect("Failed to start profiler on this process");

    assert!(profiler.is_running());
    std::thread::sleep(Duration::from_millis(50));
    // nothing in this process lives under that prefix
    assert!(profiler.edges().is_empty());
    assert_eq!(profiler.config().filter_prefix, "depscope-test-namespace/");

    profiler.shutdown();
}

#[test]
fn test_config_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("depscope.toml");
    std::fs::write(
        &path,
        "filter_prefix = \"shop/\"\ninterval_ms = 250\nrender_args = [\"-Tpng\"]\n",
    )
    .unwrap();

    let config: ProfilerConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(config.filter_prefix, "shop/");
    assert_eq!(config.interval(), Duration::from_millis(250));
    assert_eq!(config.render_args, vec!["-Tpng"]);
    assert_eq!(config.render_command, "dot");
}
