//! Configuration for the siteward service.
//!
//! TOML file + `SITEWARD_`-prefixed environment, layered by figment over
//! built-in defaults, and translated into `siteward_core::ConnectionConfig`
//! for the remote side and a bind address / function key for the trigger.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use siteward_api::{Credentials, DEFAULT_AUTHORITY, RetryPolicy, TlsMode};
use siteward_core::ConnectionConfig;

/// Environment variable prefix; nested keys are separated by `__`,
/// e.g. `SITEWARD_SERVER__FUNCTION_KEY`.
pub const ENV_PREFIX: &str = "SITEWARD_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no remote credentials configured: set remote.access_token or remote.tenant_id, remote.client_id and remote.client_secret")]
    NoCredentials,

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP trigger settings.
#[derive(Debug, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Key callers must present via `x-functions-key` or `?code=`.
    pub function_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            function_key: None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:7071".into()
}

/// Remote site access.
#[derive(Debug, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Pre-issued bearer token. Takes precedence over the app registration.
    pub access_token: Option<String>,

    /// Directory (tenant) id of the app registration.
    pub tenant_id: Option<String>,

    /// Application (client) id.
    pub client_id: Option<String>,

    /// Client secret in plaintext; `client_secret_env` takes precedence.
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    /// Token authority root.
    #[serde(default = "default_authority")]
    pub authority: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Skip TLS verification.
    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
            client_secret_env: None,
            authority: default_authority(),
            timeout: default_timeout(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.into()
}
fn default_timeout() -> u64 {
    30
}

/// Backoff for flushes against the remote site.
#[derive(Debug, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    10
}
fn default_initial_delay_ms() -> u64 {
    500
}
fn default_max_delay_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "cumulus", "siteward").map_or_else(
        || PathBuf::from("siteward.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

/// Load the full Config from file + environment. A missing file is not an
/// error; defaults and environment still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    let config: Config = figment(&path).extract()?;
    Ok(config)
}

// ── Resolution ──────────────────────────────────────────────────────

impl Config {
    /// Listen address for the HTTP trigger.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Validation {
                field: "server.bind".into(),
                reason: format!("{e}: {}", self.server.bind),
            })
    }

    /// The function key; the trigger refuses to start without one.
    pub fn function_key(&self) -> Result<SecretString, ConfigError> {
        match self.server.function_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(SecretString::from(key.to_owned())),
            _ => Err(ConfigError::Validation {
                field: "server.function_key".into(),
                reason: "a function key is required to serve requests".into(),
            }),
        }
    }

    /// Connection settings for `RemoteSessionProvider`.
    pub fn connection(&self) -> Result<ConnectionConfig, ConfigError> {
        let remote = &self.remote;

        let tls = if remote.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca_path) = remote.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else {
            TlsMode::System
        };

        Ok(ConnectionConfig {
            credentials: resolve_credentials(remote)?,
            tls,
            timeout: Duration::from_secs(remote.timeout),
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
            },
        })
    }
}

/// Credential chain: access token, then app registration (secret from the
/// named env var, then plaintext).
pub fn resolve_credentials(remote: &RemoteConfig) -> Result<Credentials, ConfigError> {
    if let Some(ref token) = remote.access_token {
        return Ok(Credentials::AccessToken(SecretString::from(token.clone())));
    }

    let (Some(tenant_id), Some(client_id)) = (&remote.tenant_id, &remote.client_id) else {
        return Err(ConfigError::NoCredentials);
    };

    let secret = remote
        .client_secret_env
        .as_ref()
        .and_then(|name| std::env::var(name).ok())
        .or_else(|| remote.client_secret.clone())
        .ok_or(ConfigError::NoCredentials)?;

    let authority = remote
        .authority
        .parse::<url::Url>()
        .map_err(|e| ConfigError::Validation {
            field: "remote.authority".into(),
            reason: format!("{e}: {}", remote.authority),
        })?;

    Ok(Credentials::ClientSecret {
        tenant_id: tenant_id.clone(),
        client_id: client_id.clone(),
        client_secret: SecretString::from(secret),
        authority,
    })
}
