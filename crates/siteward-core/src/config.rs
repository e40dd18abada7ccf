// ── Runtime connection configuration ──
//
// These types describe *how* to reach a remote site. They carry credential
// data and connection tuning, but never touch disk. The binary builds a
// `ConnectionConfig` through siteward-config and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use siteward_api::{Credentials, RetryPolicy, TlsMode, TransportConfig};

/// Configuration shared by every connection the service opens.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// How to obtain bearer tokens.
    pub credentials: Credentials,
    /// TLS verification strategy.
    pub tls: TlsMode,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry policy for every flush.
    pub retry: RetryPolicy,
}

impl ConnectionConfig {
    /// A config that presents a fixed bearer token.
    pub fn with_access_token(token: SecretString) -> Self {
        Self {
            credentials: Credentials::AccessToken(token),
            tls: TlsMode::System,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }

    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}
