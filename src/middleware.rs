//! Request middleware: correlation-ID assignment, structured request
//! logging, and conversion metrics recording.
//!
//! Nesting order is fixed: `request_id` is outermost, wrapping
//! `log_requests`, wrapping the router. `track_conversions` wraps only the
//! conversion route so that `/health` and `/metrics` traffic never pollutes
//! the conversion metrics.

use crate::context::{Outcome, RequestCtx};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use std::time::Instant;

/// Header used to carry the correlation ID in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reuse a non-empty inbound `X-Request-ID` verbatim, or generate a new
/// UUIDv4. The resulting ID is attached to the request as a [`RequestCtx`]
/// and always written back as a response header.
pub async fn request_id(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestCtx::new(id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Emit exactly one structured log line per request, after the inner
/// service returns. Streaming responses are timed from entry to return of
/// the inner call, not to the end of the body.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let ctx = request.extensions().get::<RequestCtx>().cloned();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;
    let request_id = ctx
        .as_ref()
        .map(|ctx| ctx.id().to_string())
        .unwrap_or_default();

    match ctx.as_ref().and_then(|ctx| ctx.log_error()) {
        Some(error) => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            duration_ms,
            error = %error,
            "request completed"
        ),
        None => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            duration_ms,
            "request completed"
        ),
    }

    response
}

/// Decrements the in-flight gauge when dropped, so the count stays correct
/// even if the inner future is dropped mid-flight.
struct InFlightGuard(Arc<AppState>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.metrics.dec_in_flight();
    }
}

/// Record conversion metrics around the inner call: in-flight gauge,
/// duration histogram, and exactly one outcome counter. An unset outcome
/// counts as failed.
pub async fn track_conversions(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = request.extensions().get::<RequestCtx>().cloned();

    state.metrics.inc_in_flight();
    let guard = InFlightGuard(state.clone());
    let start = Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    drop(guard);
    state.metrics.observe_duration(duration_ms);

    match ctx.and_then(|ctx| ctx.outcome()).unwrap_or(Outcome::Failed) {
        Outcome::Success => state.metrics.inc_success(),
        Outcome::Timeout => state.metrics.inc_timeout(),
        Outcome::Failed => state.metrics.inc_failed(),
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Extension, Router};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    fn id_echo_router() -> Router {
        Router::new()
            .route(
                "/health",
                get(|Extension(ctx): Extension<RequestCtx>| async move { ctx.id().to_string() }),
            )
            .layer(axum::middleware::from_fn(request_id))
    }

    async fn body_string(response: Response) -> String {
        use http_body_util::BodyExt;
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn generates_uuid_when_header_absent() {
        let response = id_echo_router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        let header_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .expect("response header")
            .to_string();
        assert_eq!(header_id.len(), 36);
        let chars: Vec<char> = header_id.chars().collect();
        assert_eq!(chars[14], '4', "version nibble must be 4: {header_id}");
        assert!(
            matches!(chars[19], '8' | '9' | 'a' | 'b'),
            "variant bits must be RFC 4122: {header_id}"
        );

        // The handler saw the same ID that came back on the header.
        let seen_by_handler = body_string(response).await;
        assert_eq!(seen_by_handler, header_id);
    }

    #[tokio::test]
    async fn echoes_inbound_id_verbatim() {
        let response = id_echo_router()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .header(REQUEST_ID_HEADER, "my-existing-id")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("my-existing-id")
        );
        assert_eq!(body_string(response).await, "my-existing-id");
    }

    fn tracked_router(state: Arc<AppState>, outcome: Option<Outcome>) -> Router {
        Router::new()
            .route(
                "/convert",
                post(move |ctx: Option<Extension<RequestCtx>>| async move {
                    if let (Some(Extension(ctx)), Some(outcome)) = (ctx, outcome) {
                        ctx.set_outcome(outcome);
                    }
                    StatusCode::OK
                }),
            )
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                track_conversions,
            ))
            .layer(axum::middleware::from_fn(request_id))
    }

    async fn post_convert(app: Router) {
        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/convert")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn success_outcome_increments_success_counter() {
        let state = Arc::new(AppState::new(ServerConfig::default()));
        post_convert(tracked_router(state.clone(), Some(Outcome::Success))).await;

        let body = state.metrics.render();
        assert!(body.contains("docpdf_conversions_total{outcome=\"success\"} 1"));
        assert!(body.contains("docpdf_conversions_total{outcome=\"failed\"} 0"));
        assert!(body.contains("docpdf_conversion_duration_ms_count 1"));
    }

    #[tokio::test]
    async fn timeout_outcome_increments_timeout_counter() {
        let state = Arc::new(AppState::new(ServerConfig::default()));
        post_convert(tracked_router(state.clone(), Some(Outcome::Timeout))).await;

        assert!(state
            .metrics
            .render()
            .contains("docpdf_conversions_total{outcome=\"timeout\"} 1"));
    }

    #[tokio::test]
    async fn unset_outcome_counts_as_failed() {
        let state = Arc::new(AppState::new(ServerConfig::default()));
        post_convert(tracked_router(state.clone(), None)).await;

        assert!(state
            .metrics
            .render()
            .contains("docpdf_conversions_total{outcome=\"failed\"} 1"));
    }

    #[tokio::test]
    async fn in_flight_gauge_follows_blocked_handler() {
        let state = Arc::new(AppState::new(ServerConfig::default()));
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let handler = {
            let started = started.clone();
            let release = release.clone();
            move |ctx: Option<Extension<RequestCtx>>| {
                let started = started.clone();
                let release = release.clone();
                async move {
                    started.notify_one();
                    release.notified().await;
                    if let Some(Extension(ctx)) = ctx {
                        ctx.set_outcome(Outcome::Success);
                    }
                    StatusCode::OK
                }
            }
        };

        let app = Router::new()
            .route("/convert", post(handler))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                track_conversions,
            ))
            .layer(axum::middleware::from_fn(request_id));

        let request = axum::http::Request::builder()
            .method("POST")
            .uri("/convert")
            .body(Body::empty())
            .expect("request");
        let task = tokio::spawn(app.oneshot(request));

        started.notified().await;
        assert!(state
            .metrics
            .render()
            .contains("docpdf_conversions_in_flight 1"));

        release.notify_one();
        let response = task.await.expect("join").expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = state.metrics.render();
        assert!(body.contains("docpdf_conversions_in_flight 0"));
        assert!(body.contains("docpdf_conversions_total{outcome=\"success\"} 1"));
    }
}
