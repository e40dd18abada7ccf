// siteward-core: Site permission workflows on top of siteward-api.

pub mod config;
pub mod downgrade;
pub mod error;
pub mod remote;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ConnectionConfig;
pub use downgrade::{RetainedMembers, SetReadOnlyOutcome, SiteAccessDowngrader};
pub use error::CoreError;
pub use remote::{RemoteSessionProvider, RemoteSiteSession};
pub use session::{PRIVATE_GROUP_TYPE, SessionProvider, SiteSession, SiteSnapshot};
