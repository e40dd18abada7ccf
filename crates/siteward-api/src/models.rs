// Wire models for the site REST API (OData, `nometadata` flavour).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Login-name prefix of the synthetic "everyone except external users" claim.
pub const EVERYONE_EXCEPT_EXTERNAL: &str = "c:0-.f|rolemanager|spo-grid-all-users/";

/// OData collection wrapper: `{ "value": [...] }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ODataCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A principal known to the site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteUser {
    pub id: i64,
    pub login_name: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl SiteUser {
    /// `true` for the "everyone except external users" claim.
    pub fn is_everyone_except_external(&self) -> bool {
        self.login_name.starts_with(EVERYONE_EXCEPT_EXTERNAL)
    }
}

/// A site permission group with its expanded member list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SiteGroup {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub users: Vec<SiteUser>,
}

/// The web's `AllProperties` bag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(pub BTreeMap<String, serde_json::Value>);

impl PropertyBag {
    /// The value of `key` rendered as a string. Non-string scalars are
    /// rendered with their JSON text; `null` counts as absent.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// The `GroupType` flag set on group-connected sites.
    pub fn group_type(&self) -> Option<String> {
        self.get_str("GroupType")
    }
}
