// ── Remote sessions ──
//
// The production `SessionProvider`: acquires a bearer token for the site,
// builds a `SiteClient`, and drives it through a `RequestBatch`.

use siteward_api::{AssociatedGroup, RequestBatch, SiteClient, SiteGroup, SiteUser, TokenClient};
use tracing::debug;
use url::Url;

use crate::config::ConnectionConfig;
use crate::error::CoreError;
use crate::session::{SessionProvider, SiteSession, SiteSnapshot};

/// Opens sessions against the real site API.
pub struct RemoteSessionProvider {
    config: ConnectionConfig,
    tokens: TokenClient,
}

impl RemoteSessionProvider {
    pub fn new(config: ConnectionConfig) -> Result<Self, CoreError> {
        let tokens = TokenClient::new(&config.transport())?;
        Ok(Self { config, tokens })
    }

    async fn open(&self, site_url: &str) -> Result<RemoteSiteSession, CoreError> {
        let url = Url::parse(site_url).map_err(|e| CoreError::ConnectionFailed {
            url: site_url.to_owned(),
            reason: format!("invalid site URL: {e}"),
        })?;

        let token = self.tokens.acquire(&self.config.credentials, &url).await?;
        let client = SiteClient::new(url, &token, &self.config.transport())?
            .with_retry(self.config.retry.clone());

        debug!(site = %client.site_url(), "session established");
        Ok(RemoteSiteSession::new(client))
    }
}

impl SessionProvider for RemoteSessionProvider {
    type Session = RemoteSiteSession;

    async fn connect(&self, site_url: &str) -> Result<RemoteSiteSession, CoreError> {
        self.open(site_url)
            .await
            .map_err(|err| match err {
                CoreError::ConnectionFailed { .. } => err,
                other => CoreError::ConnectionFailed {
                    url: site_url.to_owned(),
                    reason: other.to_string(),
                },
            })
    }
}

/// One site, one client, one pending batch.
pub struct RemoteSiteSession {
    client: SiteClient,
    batch: RequestBatch,
}

impl RemoteSiteSession {
    pub fn new(client: SiteClient) -> Self {
        Self {
            client,
            batch: RequestBatch::new(),
        }
    }
}

impl SiteSession for RemoteSiteSession {
    async fn load_snapshot(&mut self) -> Result<SiteSnapshot, CoreError> {
        let properties = self.batch.load_properties();
        let site_users = self.batch.load_site_users();
        let visitors = self.batch.load_associated_group(AssociatedGroup::Visitors);
        let members = self.batch.load_associated_group(AssociatedGroup::Members);
        let owners = self.batch.load_associated_group(AssociatedGroup::Owners);

        let mut resp = self.client.execute(&mut self.batch).await?;

        Ok(SiteSnapshot {
            properties: resp.take(properties)?,
            site_users: resp.take(site_users)?.value,
            visitors: resp.take(visitors)?,
            members: resp.take(members)?,
            owners: resp.take(owners)?,
        })
    }

    fn queue_remove(&mut self, group: &SiteGroup, user: &SiteUser) {
        self.batch.remove_user_from_group(group.id, user.id);
    }

    fn queue_add(&mut self, group: &SiteGroup, login_name: &str) {
        self.batch.add_user_to_group(group.id, login_name);
    }

    fn pending(&self) -> usize {
        self.batch.len()
    }

    async fn execute(&mut self) -> Result<(), CoreError> {
        self.client.execute(&mut self.batch).await?;
        Ok(())
    }
}
