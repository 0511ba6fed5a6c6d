//! Catalog lookup gateway.
//!
//! A thin HTTP proxy in front of the catalog provider:
//!
//! | Path | Description |
//! |------|-------------|
//! | `GET /api/search?q=<query>` | Upstream `search` response, passed through verbatim |
//! | `GET /api/health` | Liveness probe |
//!
//! It runs standalone (`preview-tui serve`) or embedded in the TUI process on
//! an ephemeral localhost port.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

pub mod error;

pub use error::GatewayError;

/// Shared state for gateway handlers.
#[derive(Debug, Clone)]
pub struct GatewayState {
    client: reqwest::Client,
    upstream: String,
}

impl GatewayState {
    pub fn new(upstream: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            upstream: upstream.into().trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Build the gateway router.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// GET /api/search?q=<query>
async fn search(
    State(state): State<Arc<GatewayState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, GatewayError> {
    // A malformed query string (e.g. a repeated `q`) gets the same JSON 400.
    let Query(params) = params.map_err(|e| {
        tracing::debug!("Rejected search query string: {}", e);
        GatewayError::MissingQuery
    })?;
    let query = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or(GatewayError::MissingQuery)?;

    let url = format!(
        "{}/search?q={}",
        state.upstream,
        urlencoding::encode(&query)
    );
    tracing::info!("Searching upstream for {:?}", query);

    let response = state.client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(GatewayError::UpstreamStatus(status.as_u16()));
    }

    let body = response.bytes().await?;

    Ok((
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::CONTENT_TYPE, "application/json"),
        ],
        body,
    )
        .into_response())
}

/// GET /api/health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Run the gateway in the foreground until Ctrl+C.
pub async fn run(config: &ServerConfig, timeout: Duration) -> Result<()> {
    let state = GatewayState::new(&config.upstream, timeout)?;
    let listener = TcpListener::bind(&config.bind).await?;

    tracing::info!("Gateway listening on {}", listener.local_addr()?);
    tracing::info!("Upstream: {}", config.upstream);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down gateway");
        })
        .await?;

    Ok(())
}

/// Start a gateway on an ephemeral localhost port and return its address.
pub async fn spawn_embedded(upstream: &str, timeout: Duration) -> Result<SocketAddr> {
    let state = GatewayState::new(upstream, timeout)?;
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            tracing::error!("Embedded gateway stopped: {}", e);
        }
    });

    tracing::info!("Embedded gateway on {}", addr);
    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::client::CatalogClient;

    const TIMEOUT: Duration = Duration::from_secs(5);

    async fn get(app: Router, uri: &str) -> (StatusCode, Response) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_search_passes_body_through() {
        let upstream = MockServer::start().await;
        let payload = serde_json::json!({
            "data": [{ "id": 1, "title": "Imagine", "artist": { "name": "John Lennon" } }],
            "total": 1,
            "next": "https://api.example.com/search?q=imagine&index=25"
        });
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "imagine"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .expect(1)
            .mount(&upstream)
            .await;

        let app = router(GatewayState::new(upstream.uri(), TIMEOUT).unwrap());
        let (status, response) = get(app, "/api/search?q=imagine").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_json(response).await, payload);
    }

    #[tokio::test]
    async fn test_missing_query_is_bad_request() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        for uri in ["/api/search", "/api/search?q=", "/api/search?q=%20%20"] {
            let app = router(GatewayState::new(upstream.uri(), TIMEOUT).unwrap());
            let (status, response) = get(app, uri).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
                "*"
            );
            let body = body_json(response).await;
            assert_eq!(body["error"], "A search term is required");
        }
    }

    #[tokio::test]
    async fn test_search_body_is_forwarded_byte_for_byte() {
        let upstream = MockServer::start().await;
        let raw = r#"{"total":1,"data":[{"title":"Imagine","id":1,"artist":{"name":"John Lennon"}}]}"#;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(raw, "application/json"))
            .mount(&upstream)
            .await;

        let app = router(GatewayState::new(upstream.uri(), TIMEOUT).unwrap());
        let (status, response) = get(app, "/api/search?q=imagine").await;

        assert_eq!(status, StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], raw.as_bytes());
    }

    #[tokio::test]
    async fn test_repeated_query_key_is_json_bad_request() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let app = router(GatewayState::new(upstream.uri(), TIMEOUT).unwrap());
        let (status, response) = get(app, "/api/search?q=a&q=b").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"], "A search term is required");
    }

    #[tokio::test]
    async fn test_upstream_failure_is_internal_error() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&upstream)
            .await;

        let app = router(GatewayState::new(upstream.uri(), TIMEOUT).unwrap());
        let (status, response) = get(app, "/api/search?q=imagine").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal error while searching tracks");
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_internal_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let app = router(GatewayState::new("http://127.0.0.1:9", TIMEOUT).unwrap());
        let (status, _) = get(app, "/api/search?q=imagine").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health() {
        let app = router(GatewayState::new("http://127.0.0.1:9", TIMEOUT).unwrap());
        let (status, response) = get(app, "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_embedded_gateway_with_client() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "daft punk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": 1, "title": "One More Time", "preview": "https://cdn.example.com/1.mp3",
                      "artist": { "name": "Daft Punk" } },
                    { "id": 2, "title": "Aerodynamic", "preview": "",
                      "artist": { "name": "Daft Punk" } }
                ]
            })))
            .mount(&upstream)
            .await;

        let addr = spawn_embedded(&upstream.uri(), TIMEOUT).await.unwrap();
        let client = CatalogClient::new(format!("http://{addr}"), TIMEOUT).unwrap();
        let tracks = client.search("daft punk").await.unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].title, "One More Time");
        assert!(tracks[1].preview_url().is_none());
    }
}
