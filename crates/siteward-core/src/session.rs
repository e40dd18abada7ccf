// ── Session seam ──
//
// A `SiteSession` is the remote query executor for one site: reads and
// membership writes are queued, then flushed in a single round trip.
// A `SessionProvider` opens authenticated sessions by site URL.

use std::future::Future;

use siteward_api::{PropertyBag, SiteGroup, SiteUser};

use crate::error::CoreError;

/// Group type recorded in the property bag of sites backed by a private group.
pub const PRIVATE_GROUP_TYPE: &str = "Private";

/// Everything the downgrade reads, fetched in one flush.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteSnapshot {
    pub properties: PropertyBag,
    pub site_users: Vec<SiteUser>,
    pub visitors: SiteGroup,
    pub members: SiteGroup,
    pub owners: SiteGroup,
}

impl SiteSnapshot {
    /// `true` when `GroupType` is present and exactly `"Private"`.
    pub fn is_private(&self) -> bool {
        self.properties.group_type().as_deref() == Some(PRIVATE_GROUP_TYPE)
    }
}

/// Queue-then-flush access to one remote site.
pub trait SiteSession: Send {
    /// Load properties, site users and the three associated groups in a
    /// single flush.
    fn load_snapshot(&mut self) -> impl Future<Output = Result<SiteSnapshot, CoreError>> + Send;

    /// Queue removal of `user` from `group`.
    fn queue_remove(&mut self, group: &SiteGroup, user: &SiteUser);

    /// Queue adding the principal `login_name` to `group`.
    fn queue_add(&mut self, group: &SiteGroup, login_name: &str);

    /// Number of operations waiting for the next flush.
    fn pending(&self) -> usize;

    /// Flush every queued operation as one round trip.
    fn execute(&mut self) -> impl Future<Output = Result<(), CoreError>> + Send;
}

/// Opens authenticated sessions. Failures surface as
/// [`CoreError::ConnectionFailed`].
pub trait SessionProvider: Send + Sync {
    type Session: SiteSession;

    fn connect(
        &self,
        site_url: &str,
    ) -> impl Future<Output = Result<Self::Session, CoreError>> + Send;
}
