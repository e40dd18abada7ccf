use thiserror::Error;

/// Top-level error type for the `siteward-api` crate.
///
/// Covers every failure mode of talking to a remote site:
/// token acquisition, transport, batch execution, and payload decoding.
/// `siteward-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token acquisition failed or the site rejected the bearer token.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The site asked us to back off (HTTP 429 / 503).
    #[error("Throttled by remote service (HTTP {status}) -- retry after {retry_after_secs}s")]
    Throttled { status: u16, retry_after_secs: u64 },

    /// The retry policy gave up. `last` is the error from the final attempt.
    #[error("Request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: Box<Error> },

    // ── Remote service ──────────────────────────────────────────────
    /// Non-success status from the site, either for the whole request or
    /// for a single operation inside a batch.
    #[error("Remote service error (HTTP {status}): {message}")]
    Remote { status: u16, message: String },

    /// A sent request has no matching entry in the batch response.
    #[error("Batch response is missing an entry for request {id}")]
    MissingBatchResponse { id: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the failure is an authentication problem.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Throttled { .. } => true,
            _ => false,
        }
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Remote { status, .. } => Some(*status),
            Self::Throttled { status, .. } => Some(*status),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_is_transient() {
        let err = Error::Throttled {
            status: 429,
            retry_after_secs: 5,
        };
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn busy_site_keeps_its_status() {
        let err = Error::RetriesExhausted {
            attempts: 10,
            last: Box::new(Error::Throttled {
                status: 503,
                retry_after_secs: 0,
            }),
        };
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn remote_error_is_not_transient() {
        let err = Error::Remote {
            status: 403,
            message: "Access denied".into(),
        };
        assert!(!err.is_transient());
        assert!(!err.is_auth());
    }

    #[test]
    fn exhausted_reports_last_status() {
        let err = Error::RetriesExhausted {
            attempts: 3,
            last: Box::new(Error::Remote {
                status: 503,
                message: "Server too busy".into(),
            }),
        };
        assert_eq!(err.status(), Some(503));
        assert_eq!(
            err.to_string(),
            "Request failed after 3 attempts: Remote service error (HTTP 503): Server too busy"
        );
    }
}
