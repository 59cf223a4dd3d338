//! HTTP surface
//!
//! A single route whose `show` query parameter selects what to return:
//!
//! | query          | response                                      |
//! |----------------|-----------------------------------------------|
//! | `?show=graph`  | SVG rendered by the external layout engine    |
//! | `?show=dot`    | the DOT description, no renderer needed       |
//! | `?show=edges`  | JSON array of `{"from", "to"}` package pairs  |
//! | anything else  | HTML link to `?show=graph`                    |
//!
//! Only the first `show` parameter counts; repeats are ignored.
//!
//! The router is meant to be nested by the host, e.g.
//! `app.nest("/debug/deps", profiler.router())`. Links are relative, so any
//! mount point works.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::error;

use crate::export::Exporter;

/// Body served when no graph is requested
pub const INDEX_HTML: &str = r#"<a href="?show=graph">Graph</a>"#;

/// First `show` value of a decoded query string
fn show_param(params: &[(String, String)]) -> Option<&str> {
    params.iter().find(|(key, _)| key == "show").map(|(_, value)| value.as_str())
}

/// Router serving the dependency graph at `/`
pub fn router(exporter: Arc<Exporter>) -> Router {
    Router::new().route("/", get(handle)).with_state(exporter)
}

/// Dispatch on `?show=`
pub async fn handle(
    State(exporter): State<Arc<Exporter>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Response {
    match show_param(&params) {
        Some("graph") => match exporter.render().await {
            Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
            Err(e) => {
                error!("Failed to render dependency graph: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                    format!("failed to render dependency graph: {e}\n"),
                )
                    .into_response()
            }
        },
        Some("dot") => match exporter.dot() {
            Ok(dot) => ([(header::CONTENT_TYPE, "text/vnd.graphviz")], dot).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        },
        Some("edges") => Json(exporter.edges()).into_response(),
        _ => Html(INDEX_HTML).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Edge;
    use crate::export::Renderer;
    use crate::profiling::EdgeSet;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    fn exporter(command: &str) -> Arc<Exporter> {
        let mut edges = EdgeSet::new();
        edges.insert(Edge::new("app/web", "app/db"));
        Arc::new(Exporter::new(
            Arc::new(Mutex::new(edges)),
            "app/",
            Renderer::new(command, vec![], Duration::from_secs(10)),
        ))
    }

    async fn body(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn query(show: Option<&str>) -> Query<Vec<(String, String)>> {
        Query(show.map(|v| ("show".to_string(), v.to_string())).into_iter().collect())
    }

    async fn send(exporter: Arc<Exporter>, uri: &str) -> Response {
        router(exporter)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_index_without_query() {
        let response = handle(State(exporter("cat")), query(None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, INDEX_HTML);
    }

    #[tokio::test]
    async fn test_index_for_unknown_mode() {
        let response = handle(State(exporter("cat")), query(Some("flamegraph"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.contains("?show=graph"));
    }

    #[tokio::test]
    async fn test_graph_is_renderer_output() {
        let response = handle(State(exporter("cat")), query(Some("graph"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(body(response).await, "digraph g {\n  \"web\" -> \"db\";\n}\n");
    }

    #[tokio::test]
    async fn test_graph_renderer_failure_is_500() {
        let response = handle(State(exporter("depscope-missing-dot")), query(Some("graph"))).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body(response).await.contains("depscope-missing-dot"));
    }

    #[tokio::test]
    async fn test_edges_as_json() {
        let response = handle(State(exporter("cat")), query(Some("edges"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let edges: serde_json::Value = serde_json::from_str(&body(response).await).unwrap();
        assert_eq!(edges, serde_json::json!([{"from": "app/web", "to": "app/db"}]));
    }

    #[tokio::test]
    async fn test_dot_without_renderer() {
        let response = handle(State(exporter("depscope-missing-dot")), query(Some("dot"))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.starts_with("digraph g {"));
    }

    #[tokio::test]
    async fn test_router_dispatches_on_show() {
        let response = send(exporter("cat"), "/?show=dot").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body(response).await.starts_with("digraph g {"));

        let response = send(exporter("cat"), "/").await;
        assert_eq!(body(response).await, INDEX_HTML);
    }

    #[tokio::test]
    async fn test_router_uses_first_repeated_show() {
        let response = send(exporter("cat"), "/?show=graph&show=dot").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");

        let response = send(exporter("cat"), "/?show=x&show=y").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(response).await, INDEX_HTML);
    }

    #[tokio::test]
    async fn test_router_ignores_unrelated_params() {
        let response = send(exporter("cat"), "/?page=2&show=edges&show=graph").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_show_param_first_wins() {
        let params = vec![
            ("other".to_string(), "graph".to_string()),
            ("show".to_string(), "dot".to_string()),
            ("show".to_string(), "graph".to_string()),
        ];
        assert_eq!(show_param(&params), Some("dot"));
        assert_eq!(show_param(&[]), None);
    }
}
