// Site API HTTP client
//
// Wraps `reqwest::Client` with site-scoped URL construction, `$batch`
// execution under a retry policy, and status-to-error mapping. Endpoint
// paths for groups, users and properties live in `site.rs`.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::batch::{BatchEnvelope, BatchResponse, RequestBatch, remote_message};
use crate::error::Error;
use crate::retry::RetryPolicy;
use crate::transport::{TransportConfig, site_headers};

/// Raw HTTP client for one site's REST API.
///
/// All traffic goes through [`execute`](Self::execute): queued operations
/// are posted to `{site}/_api/$batch` as a single round trip.
pub struct SiteClient {
    http: reqwest::Client,
    site_url: Url,
    retry: RetryPolicy,
}

impl SiteClient {
    /// Create a client that authenticates with `token` on every request.
    ///
    /// `site_url` is the site root, e.g. `https://contoso.sharepoint.com/sites/finance`.
    pub fn new(
        site_url: Url,
        token: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let headers = site_headers(token.expose_secret())?;
        let http = transport.build_client_with_headers(headers)?;
        Ok(Self::with_client(http, site_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// The caller is responsible for any authentication headers.
    pub fn with_client(http: reqwest::Client, site_url: Url) -> Self {
        Self {
            http,
            site_url,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy used for batch execution.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn site_url(&self) -> &Url {
        &self.site_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{site}/_api/{path}`
    pub fn api_url(&self, path: &str) -> Result<Url, Error> {
        let full = format!(
            "{}/_api/{}",
            self.site_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Flush every pending operation in `batch` as one round trip.
    ///
    /// The batch is drained even on failure; nothing is replayed on the
    /// next flush. An empty batch returns an empty response without
    /// touching the network.
    pub async fn execute(&self, batch: &mut RequestBatch) -> Result<BatchResponse, Error> {
        let requests = batch.take();
        if requests.is_empty() {
            return Ok(BatchResponse::default());
        }

        let url = self.api_url("$batch")?;
        debug!(%url, operations = requests.len(), "executing batch");

        let envelope = BatchEnvelope {
            requests: &requests,
        };
        let response = self
            .retry
            .run(|| self.post_batch(url.clone(), &envelope))
            .await?;

        response.check(&requests)?;
        Ok(response)
    }

    async fn post_batch(
        &self,
        url: Url,
        envelope: &BatchEnvelope<'_>,
    ) -> Result<BatchResponse, Error> {
        let resp = self
            .http
            .post(url)
            .json(envelope)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::SERVICE_UNAVAILABLE
        {
            let retry_after_secs = resp
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            return Err(Error::Throttled {
                status: status.as_u16(),
                retry_after_secs,
            });
        }

        let body = resp.text().await.map_err(Error::Transport)?;

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Authentication {
                message: format!("site rejected credentials (HTTP {status})"),
            });
        }

        if !status.is_success() {
            let message = serde_json::from_str(&body)
                .ok()
                .and_then(|v| remote_message(&v))
                .unwrap_or(body);
            return Err(Error::Remote {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(site: &str) -> SiteClient {
        SiteClient::with_client(
            reqwest::Client::new(),
            Url::parse(site).expect("site url"),
        )
    }

    #[test]
    fn api_url_joins_without_double_slashes() {
        let c = client("https://contoso.sharepoint.com/sites/finance/");
        assert_eq!(
            c.api_url("/web/SiteUsers").expect("url").as_str(),
            "https://contoso.sharepoint.com/sites/finance/_api/web/SiteUsers"
        );
    }

    #[test]
    fn api_url_keeps_batch_segment() {
        let c = client("https://contoso.sharepoint.com/sites/finance");
        assert_eq!(
            c.api_url("$batch").expect("url").as_str(),
            "https://contoso.sharepoint.com/sites/finance/_api/$batch"
        );
    }

    #[tokio::test]
    async fn empty_batch_skips_round_trip() {
        // Unroutable site: any network attempt would fail.
        let c = client("http://127.0.0.1:9/sites/none");
        let mut batch = RequestBatch::new();
        let resp = c.execute(&mut batch).await.expect("no request made");
        assert!(resp.is_empty());
    }
}
