// ── Core error types ──
//
// Domain errors from siteward-core. Callers never see HTTP status codes or
// JSON parse failures directly; the `From<siteward_api::Error>` impl
// translates transport-layer errors into these variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Request errors ───────────────────────────────────────────────
    /// A required request field was missing or blank.
    #[error("Parameter cannot be null or empty (Parameter '{field}')")]
    Validation { field: &'static str },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to site at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Remote service timed out")]
    Timeout,

    // ── Remote service errors ────────────────────────────────────────
    #[error("Remote service error: {message}")]
    Remote {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` for failures detected before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<siteward_api::Error> for CoreError {
    fn from(err: siteward_api::Error) -> Self {
        use siteward_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => CoreError::AuthenticationFailed { message },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Remote {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::Remote { status, message } => CoreError::Remote {
                message,
                status: Some(status),
            },
            ref e @ (ApiError::Throttled { .. } | ApiError::RetriesExhausted { .. }) => {
                CoreError::Remote {
                    message: e.to_string(),
                    status: e.status(),
                }
            }
            ApiError::MissingBatchResponse { id } => CoreError::Remote {
                message: format!("remote service returned no result for request {id}"),
                status: None,
            },
            ApiError::Deserialization { message, body: _ } => CoreError::Remote {
                message: format!("malformed response: {message}"),
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_field() {
        let err = CoreError::Validation { field: "SiteURL" };
        assert_eq!(
            err.to_string(),
            "Parameter cannot be null or empty (Parameter 'SiteURL')"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn remote_status_survives_conversion() {
        let err: CoreError = siteward_api::Error::Remote {
            status: 403,
            message: "Access denied.".into(),
        }
        .into();
        assert!(matches!(
            err,
            CoreError::Remote { status: Some(403), ref message } if message == "Access denied."
        ));
    }

    #[test]
    fn exhausted_retries_keep_attempt_count() {
        let err: CoreError = siteward_api::Error::RetriesExhausted {
            attempts: 10,
            last: Box::new(siteward_api::Error::Throttled {
                status: 429,
                retry_after_secs: 2,
            }),
        }
        .into();
        match err {
            CoreError::Remote { message, status } => {
                assert!(message.contains("after 10 attempts"), "got: {message}");
                assert_eq!(status, Some(429));
            }
            other => panic!("expected Remote, got: {other:?}"),
        }
    }

    #[test]
    fn auth_error_maps_to_authentication_failed() {
        let err: CoreError = siteward_api::Error::Authentication {
            message: "bad token".into(),
        }
        .into();
        assert!(matches!(err, CoreError::AuthenticationFailed { .. }));
    }
}
