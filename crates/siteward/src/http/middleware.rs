use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

/// Header carrying the function key.
pub const FUNCTION_KEY_HEADER: &str = "x-functions-key";
/// Query parameter carrying the function key when the header is absent.
pub const FUNCTION_KEY_QUERY: &str = "code";

/// The shared secret callers must present on protected routes.
#[derive(Clone)]
pub struct FunctionKey(Arc<SecretString>);

impl FunctionKey {
    pub fn new(key: SecretString) -> Self {
        Self(Arc::new(key))
    }

    fn matches(&self, presented: &str) -> bool {
        self.0.expose_secret() == presented
    }
}

/// Rejects requests without a matching function key with an empty 401.
///
/// Runs as a route layer, so the body is never read for rejected calls.
pub async fn require_function_key(
    State(key): State<FunctionKey>,
    req: Request,
    next: Next,
) -> Response {
    if presented_key(&req).is_some_and(|presented| key.matches(&presented)) {
        return next.run(req).await;
    }

    warn!(path = %req.uri().path(), "rejected request without a valid function key");
    StatusCode::UNAUTHORIZED.into_response()
}

fn presented_key(req: &Request) -> Option<String> {
    if let Some(value) = req
        .headers()
        .get(FUNCTION_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(value.to_owned());
    }

    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(name, _)| name == FUNCTION_KEY_QUERY)
        .map(|(_, value)| value.into_owned())
}

/// Logs every request once it completes.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned());

    let response = next.run(req).await;

    info!(
        method = %method,
        path = %path,
        matched_path = matched_path.as_deref(),
        status = response.status().as_u16(),
        duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        "HTTP request completed"
    );

    response
}
