// siteward-api: Async Rust client for a collaboration site's REST API

pub mod auth;
pub mod batch;
pub mod client;
pub mod error;
pub mod models;
pub mod retry;
pub mod site;
pub mod transport;

pub use auth::{Credentials, DEFAULT_AUTHORITY, TokenClient};
pub use batch::{BatchMethod, BatchRequest, BatchResponse, Loaded, RequestBatch};
pub use client::SiteClient;
pub use error::Error;
pub use models::{EVERYONE_EXCEPT_EXTERNAL, ODataCollection, PropertyBag, SiteGroup, SiteUser};
pub use retry::RetryPolicy;
pub use site::AssociatedGroup;
pub use transport::{TlsMode, TransportConfig};
