// Token acquisition
//
// App-only bearer tokens for the site API. Either a pre-issued token is
// handed in, or one is requested with the OAuth2 client-credentials grant
// from the tenant's authority, scoped to the site's host.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Default Azure AD authority.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// How to obtain a bearer token for a site.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// A token issued elsewhere (e.g. by a managed identity sidecar).
    AccessToken(SecretString),

    /// App registration with a client secret.
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: SecretString,
        /// Authority root, e.g. `https://login.microsoftonline.com`.
        authority: Url,
    },
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Client for the authority's token endpoint.
pub struct TokenClient {
    http: reqwest::Client,
}

impl TokenClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Obtain a bearer token valid for `site_url`.
    ///
    /// Pre-issued tokens are returned as-is; client secrets go through the
    /// client-credentials grant with scope `{scheme}://{host}/.default`.
    pub async fn acquire(
        &self,
        credentials: &Credentials,
        site_url: &Url,
    ) -> Result<SecretString, Error> {
        let (tenant_id, client_id, client_secret, authority) = match credentials {
            Credentials::AccessToken(token) => return Ok(token.clone()),
            Credentials::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority,
            } => (tenant_id, client_id, client_secret, authority),
        };

        let url = token_endpoint(authority, tenant_id)?;
        let scope = resource_scope(site_url)?;

        debug!(endpoint = %url, %scope, "requesting app-only token");

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.expose_secret()),
            ("scope", scope.as_str()),
        ];

        let resp = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;

        if !status.is_success() {
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or(body);
            return Err(Error::Authentication {
                message: format!("token request failed (HTTP {status}): {detail}"),
            });
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: String::new(),
            })?;

        debug!("token acquired");
        Ok(SecretString::from(token.access_token))
    }
}

/// `{authority}/{tenant}/oauth2/v2.0/token`
fn token_endpoint(authority: &Url, tenant_id: &str) -> Result<Url, Error> {
    let full = format!(
        "{}/{}/oauth2/v2.0/token",
        authority.as_str().trim_end_matches('/'),
        tenant_id
    );
    Url::parse(&full).map_err(Error::InvalidUrl)
}

/// The `.default` scope for the site's origin, e.g.
/// `https://contoso.sharepoint.com/.default`.
pub fn resource_scope(site_url: &Url) -> Result<String, Error> {
    let host = site_url.host_str().ok_or_else(|| Error::Authentication {
        message: format!("site URL has no host: {site_url}"),
    })?;
    Ok(match site_url.port() {
        Some(port) => format!("{}://{host}:{port}/.default", site_url.scheme()),
        None => format!("{}://{host}/.default", site_url.scheme()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_uses_site_origin() {
        let url = Url::parse("https://contoso.sharepoint.com/sites/finance").expect("url");
        assert_eq!(
            resource_scope(&url).expect("scope"),
            "https://contoso.sharepoint.com/.default"
        );
    }

    #[test]
    fn scope_keeps_explicit_port() {
        let url = Url::parse("http://127.0.0.1:8080/sites/x").expect("url");
        assert_eq!(
            resource_scope(&url).expect("scope"),
            "http://127.0.0.1:8080/.default"
        );
    }

    #[test]
    fn token_endpoint_tolerates_trailing_slash() {
        let authority = Url::parse("https://login.example.com/").expect("url");
        let url = token_endpoint(&authority, "tenant-1").expect("endpoint");
        assert_eq!(
            url.as_str(),
            "https://login.example.com/tenant-1/oauth2/v2.0/token"
        );
    }
}
