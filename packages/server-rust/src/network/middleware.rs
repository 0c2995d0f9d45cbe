//! HTTP middleware stack for the `logctx` server.
//!
//! The outermost layer is the request boundary: it establishes the
//! diagnostic context for every inbound request, logs entry and exit, and
//! guarantees the context is cleared before control returns -- whatever the
//! outcome. Middleware ordering follows the outer-to-inner convention: the
//! first layer listed is the outermost.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::response::Response;
use http::header::HeaderName;
use http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use metrics::{counter, histogram};
use tower::{Layer, Service, ServiceBuilder};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::info;

use logctx_core::mdc::{self, keys, ClearGuard};
use logctx_core::request_id;

use super::config::NetworkConfig;
use super::shutdown::ShutdownController;

/// Correlation header, adopted verbatim when present and non-empty, echoed
/// on every response.
pub const X_REQUEST_ID: &str = "x-request-id";
/// User identity header; absent or empty falls back to [`ANONYMOUS_USER`].
pub const X_USER_ID: &str = "x-user-id";
/// Sentinel identity for unauthenticated requests.
pub const ANONYMOUS_USER: &str = "anonymous";

/// The composed Tower layer type produced by [`build_http_layers`].
///
/// This type alias keeps the function signature readable. Each layer wraps
/// the next in a `Stack`, from innermost (first in the type) to outermost.
type HttpLayers = tower::layer::util::Stack<
    TimeoutLayer,
    tower::layer::util::Stack<
        CorsLayer,
        tower::layer::util::Stack<ContextLayer, tower::layer::util::Identity>,
    >,
>;

/// Builds the HTTP middleware stack from the network configuration.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `Context` -- establishes the per-request diagnostic context, logs
///    entry/exit, echoes `X-Request-Id`, tracks in-flight requests
/// 2. `CORS` -- Cross-Origin Resource Sharing based on configured origins
/// 3. `Timeout` -- enforces a maximum request processing duration
#[must_use]
pub fn build_http_layers(config: &NetworkConfig, shutdown: Arc<ShutdownController>) -> HttpLayers {
    let cors = build_cors_layer(&config.cors_origins);

    ServiceBuilder::new()
        .layer(ContextLayer::new(shutdown))
        .layer(cors)
        .layer(TimeoutLayer::new(config.request_timeout))
        .into_inner()
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` in the origins list allows any origin. Otherwise, each
/// origin string is parsed and added to an explicit allowlist.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

// ---------------------------------------------------------------------------
// ContextLayer
// ---------------------------------------------------------------------------

/// Tower layer installing the request boundary around the inner router.
#[derive(Debug, Clone)]
pub struct ContextLayer {
    shutdown: Arc<ShutdownController>,
}

impl ContextLayer {
    #[must_use]
    pub fn new(shutdown: Arc<ShutdownController>) -> Self {
        Self { shutdown }
    }
}

impl<S> Layer<S> for ContextLayer {
    type Service = ContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ContextService {
            inner,
            shutdown: Arc::clone(&self.shutdown),
        }
    }
}

// ---------------------------------------------------------------------------
// ContextService
// ---------------------------------------------------------------------------

/// The request boundary.
///
/// Resolves the request and user identifiers from the inbound headers,
/// then awaits the downstream future inside a fresh `mdc::scope` with both
/// installed -- handler and service code reads the store with no explicit
/// propagation, and the cell cannot outlive the request. A [`ClearGuard`]
/// additionally clears the store on every exit path before control
/// returns, success and failure alike.
#[derive(Debug, Clone)]
pub struct ContextService<S> {
    inner: S,
    shutdown: Arc<ShutdownController>,
}

impl<S> Service<Request<Body>> for ContextService<S>
where
    S: Service<Request<Body>, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();
        let request_id = resolve_request_id(req.headers());
        let user_id = resolve_user_id(req.headers());

        let fut = self.inner.call(req);
        let shutdown = Arc::clone(&self.shutdown);
        let started = Instant::now();

        Box::pin(mdc::scope(async move {
            let _in_flight = shutdown.in_flight_guard();
            mdc::put(keys::REQUEST_ID, request_id.as_str());
            mdc::put(keys::USER_ID, user_id.as_str());
            let _cleanup = ClearGuard::new();

            info!(">>> {} {}", method, path);

            match fut.await {
                Ok(mut response) => {
                    let status = response.status();
                    info!("<<< {} {} - status {}", method, path, status.as_u16());

                    // Echo the resolved id so the caller can correlate its
                    // own logs, on failure responses too.
                    if let Ok(value) = HeaderValue::from_str(&request_id) {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static(X_REQUEST_ID), value);
                    }

                    counter!("logctx_http_requests_total", "status" => status_class(status))
                        .increment(1);
                    histogram!("logctx_http_request_duration_seconds")
                        .record(started.elapsed().as_secs_f64());

                    Ok(response)
                }
                Err(err) => {
                    // Unreachable with axum's infallible router; kept so the
                    // exit log and cleanup hold for any inner service.
                    info!("<<< {} {} - failed", method, path);
                    Err(err)
                }
            }
        }))
    }
}

/// Resolved request identifier: inbound header when present and non-empty,
/// otherwise freshly generated.
fn resolve_request_id(headers: &HeaderMap) -> String {
    header_value(headers, X_REQUEST_ID).unwrap_or_else(request_id::generate)
}

/// Resolved user identifier: inbound header when present and non-empty,
/// otherwise the anonymous sentinel.
fn resolve_user_id(headers: &HeaderMap) -> String {
    header_value(headers, X_USER_ID).unwrap_or_else(|| ANONYMOUS_USER.to_owned())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

fn status_class(status: StatusCode) -> String {
    format!("{}xx", status.as_u16() / 100)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
