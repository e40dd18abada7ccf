//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use siteward_config::ConfigError;
use siteward_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONFIG: i32 = 78;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to site at {url}")]
    #[diagnostic(
        code(siteward::connection_failed),
        help(
            "{reason}\n\
             Check the site URL and the [remote] section of your configuration."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(siteward::auth_failed),
        help("Verify the tenant, client id and client secret, or the access token.")
    )]
    AuthFailed { message: String },

    #[error("No credentials configured")]
    #[diagnostic(
        code(siteward::no_credentials),
        help(
            "Set remote.access_token, or remote.tenant_id + remote.client_id + \
             remote.client_secret.\n\
             Environment overrides use SITEWARD_REMOTE__<KEY>."
        )
    )]
    NoCredentials,

    // ── Remote ───────────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(siteward::remote))]
    Remote { message: String },

    #[error("Remote service timed out")]
    #[diagnostic(
        code(siteward::timeout),
        help("Increase remote.timeout or check the service health.")
    )]
    Timeout,

    // ── Validation ───────────────────────────────────────────────────

    #[error("{message}")]
    #[diagnostic(code(siteward::validation))]
    Validation { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(siteward::config),
        help("Run `siteward config-path` to locate the configuration file.")
    )]
    Config { message: String },

    // ── Server ───────────────────────────────────────────────────────

    #[error("HTTP server failed")]
    #[diagnostic(code(siteward::server))]
    Server(#[from] std::io::Error),

    #[error("Could not encode output: {0}")]
    #[diagnostic(code(siteward::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoCredentials | Self::Config { .. } => exit_code::CONFIG,
            Self::Remote { .. } | Self::Server(_) | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { .. } => Self::Validation {
                message: err.to_string(),
            },
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed { message },
            CoreError::Timeout => Self::Timeout,
            CoreError::Remote { message, .. } => Self::Remote { message },
            CoreError::Config { message } => Self::Config { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials => Self::NoCredentials,
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_keeps_parameter_message() {
        let err = CliError::from(CoreError::Validation { field: "Owner" });
        assert_eq!(err.exit_code(), exit_code::USAGE);
        assert_eq!(
            err.to_string(),
            "Parameter cannot be null or empty (Parameter 'Owner')"
        );
    }

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (
                CoreError::ConnectionFailed {
                    url: "https://x".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::AuthenticationFailed {
                    message: "bad secret".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::Timeout, exit_code::TIMEOUT),
            (
                CoreError::Remote {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn missing_credentials_is_a_config_failure() {
        let err = CliError::from(ConfigError::NoCredentials);
        assert!(matches!(err, CliError::NoCredentials));
        assert_eq!(err.exit_code(), exit_code::CONFIG);
    }
}
