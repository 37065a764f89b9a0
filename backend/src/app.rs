use axum::extract::{MatchedPath, Request};
use axum::routing::get;
use axum::Router;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use crate::routes::{health, transactions};
use crate::state::AppState;

pub fn create_app(state: AppState, cors: CorsLayer) -> Router {
    let trace = TraceLayer::new_for_http().make_span_with(|req: &Request| {
        let matched_path = req
            .extensions()
            .get::<MatchedPath>()
            .map(|matched_path| matched_path.as_str());
        tracing::debug_span!("request", method = %req.method(), uri = %req.uri(), matched_path)
    });

    Router::<AppState>::new()
        .route("/", get(health::root))
        .nest("/health", health::router())
        .nest("/api/transactions", transactions::router())
        .layer(trace)
        .layer(cors)
        .with_state(state)
}

/// Allows the configured frontend origins with the methods and headers the API uses.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let origins = origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|_| ConfigError::Invalid {
                key: "CORS_ALLOWED_ORIGINS",
                reason: format!("`{}` is not a valid origin", origin),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::store::InMemoryTransactionStore;

    fn app_with_cors() -> Router {
        let cors = cors_layer(&["http://localhost:5173".to_string()]).unwrap();
        create_app(AppState::new(Arc::new(InMemoryTransactionStore::new())), cors)
    }

    #[tokio::test]
    async fn test_root_reports_running() {
        let response = app_with_cors()
            .oneshot(http::Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Money Manager API is running");
    }

    #[tokio::test]
    async fn test_health_ok() {
        let response = app_with_cors()
            .oneshot(http::Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let response = app_with_cors()
            .oneshot(
                http::Request::builder()
                    .method("OPTIONS")
                    .uri("/api/transactions")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_cors_ignores_unknown_origin() {
        let response = app_with_cors()
            .oneshot(
                http::Request::builder()
                    .uri("/health")
                    .header("origin", "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[test]
    fn test_cors_layer_rejects_invalid_origin() {
        let err = cors_layer(&["bad\norigin".to_string()]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "CORS_ALLOWED_ORIGINS", .. }));
    }
}
