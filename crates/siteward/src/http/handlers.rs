use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

use siteward_core::SessionProvider;

use super::AppState;

/// Request body of `POST /api/SetSiteReadOnly`.
///
/// Both fields are optional at the wire level; blank or missing values are
/// rejected by the downgrader with the parameter name.
#[derive(Debug, Default, Deserialize)]
pub struct SetSiteReadOnlyRequest {
    #[serde(rename = "SiteURL", default)]
    pub site_url: Option<String>,
    #[serde(rename = "Owner", default)]
    pub owner: Option<String>,
}

/// Any failure of the trigger: 503 with the message as a JSON string.
#[derive(Debug)]
pub struct TriggerError(String);

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, Json(self.0)).into_response()
    }
}

pub async fn set_site_read_only<P>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Result<Response, TriggerError>
where
    P: SessionProvider + 'static,
{
    let request: SetSiteReadOnlyRequest = serde_json::from_slice(&body).map_err(|err| {
        error!(error = %err, "malformed request body");
        TriggerError(format!("Invalid request body: {err}"))
    })?;

    // The downgrader logs its own failures.
    let outcome = state
        .downgrader
        .downgrade(
            request.site_url.as_deref().unwrap_or_default(),
            request.owner.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|err| TriggerError(err.to_string()))?;

    Ok((StatusCode::OK, Json(outcome)).into_response())
}

#[allow(clippy::unused_async)]
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
