// Site endpoints
//
// Queueing helpers for the handful of web-level resources we touch:
// the property bag, the site user list, the three associated groups,
// and group membership writes.

use crate::batch::{Loaded, RequestBatch};
use crate::models::{ODataCollection, PropertyBag, SiteGroup, SiteUser};

/// The three permission groups every site is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociatedGroup {
    Visitors,
    Members,
    Owners,
}

impl AssociatedGroup {
    /// Navigation property on the web.
    pub fn property(self) -> &'static str {
        match self {
            Self::Visitors => "AssociatedVisitorGroup",
            Self::Members => "AssociatedMemberGroup",
            Self::Owners => "AssociatedOwnerGroup",
        }
    }
}

impl RequestBatch {
    /// `GET web/AllProperties`
    pub fn load_properties(&mut self) -> Loaded<PropertyBag> {
        self.queue_get("web/AllProperties")
    }

    /// `GET web/SiteUsers`
    pub fn load_site_users(&mut self) -> Loaded<ODataCollection<SiteUser>> {
        self.queue_get("web/SiteUsers?$select=Id,LoginName,Title")
    }

    /// One associated group with its title and expanded member list.
    pub fn load_associated_group(&mut self, group: AssociatedGroup) -> Loaded<SiteGroup> {
        self.queue_get(format!(
            "web/{}?$select=Id,Title,Users/Id,Users/LoginName,Users/Title&$expand=Users",
            group.property()
        ))
    }

    /// Queue removal of a user from a group by id.
    pub fn remove_user_from_group(&mut self, group_id: i64, user_id: i64) -> String {
        self.queue_post(
            format!("web/sitegroups/GetById({group_id})/users/removebyid({user_id})"),
            None,
        )
    }

    /// Queue adding a principal to a group by login name. The site
    /// resolves (and if needed, ensures) the principal server-side.
    pub fn add_user_to_group(&mut self, group_id: i64, login_name: &str) -> String {
        self.queue_post(
            format!("web/sitegroups/GetById({group_id})/users"),
            Some(serde_json::json!({ "LoginName": login_name })),
        )
    }
}
