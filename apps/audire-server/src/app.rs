//! Router assembly

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::routes;
use crate::state::AppState;

/// CORS for the configured review front-ends; `*` allows any origin
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();
    base.allow_origin(allowed)
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let config = state.config();
    let cors = cors_layer(&config.cors.origins);
    let exports = ServeDir::new(&config.export.export_dir);

    Router::new()
        .merge(routes::health::router())
        .merge(routes::documents::router(config.server.max_upload_bytes))
        .merge(routes::refine::router())
        .merge(routes::prompts::router())
        .nest_service("/exports", exports)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::export::SofficeConverter;
    use crate::findings::StubRefiner;
    use crate::prompts::PromptSet;

    fn app(dir: &std::path::Path) -> Router {
        let mut config = Config::default();
        config.storage.temp_dir = dir.join("temp");
        config.export.export_dir = dir.join("exports");
        let state = AppState::with_parts(
            config,
            Arc::new(StubRefiner::new(Duration::ZERO)),
            Arc::new(SofficeConverter::new("soffice", Duration::from_secs(1))),
            PromptSet::new(),
        );
        router(state)
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/process-document")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_missing_export_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::builder()
                    .uri("/exports/nothing.docx")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_wildcard_origin() {
        // Building must not panic for either form
        let _ = cors_layer(&["*".to_string()]);
        let _ = cors_layer(&["http://a:1".to_string(), "bad\norigin".to_string()]);
    }
}
