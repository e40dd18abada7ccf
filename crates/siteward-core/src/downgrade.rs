// ── Site access downgrade ──
//
// Moves a site's permission groups to a read-only configuration:
// everybody leaves visitors, members and owners; the new owner joins
// owners; visitors is repopulated from the former members/owners (private
// sites) or from the "everyone except external users" claim (otherwise).
//
// Three flushes: read, removals, additions. Nothing spans them, so a
// failure after the removal flush leaves the site with empty groups.

use serde::{Deserialize, Serialize};
use siteward_api::SiteUser;
use tracing::{error, info};

use crate::error::CoreError;
use crate::session::{SessionProvider, SiteSession, SiteSnapshot};

/// Result of a successful downgrade. There is no `false` path: failures
/// are reported through `CoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetReadOnlyOutcome {
    #[serde(rename = "SetReadOnly")]
    pub set_read_only: bool,
}

impl SetReadOnlyOutcome {
    fn read_only() -> Self {
        Self {
            set_read_only: true,
        }
    }
}

/// Former members and owners, in the order they were collected
/// (members first, then owners). Replayed newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetainedMembers(Vec<SiteUser>);

impl RetainedMembers {
    pub fn push(&mut self, user: SiteUser) {
        self.0.push(user);
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Reverse of collection order.
    pub fn replay_order(&self) -> impl Iterator<Item = &SiteUser> {
        self.0.iter().rev()
    }
}

/// Switches sites to read-only through sessions from `P`.
pub struct SiteAccessDowngrader<P> {
    provider: P,
}

impl<P: SessionProvider> SiteAccessDowngrader<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Downgrade `site_url` to read-only, leaving `new_owner` as the only owner.
    ///
    /// Errors are logged here once, with their debug form standing in for a
    /// stack trace. Changes flushed before a failure are not rolled back.
    pub async fn downgrade(
        &self,
        site_url: &str,
        new_owner: &str,
    ) -> Result<SetReadOnlyOutcome, CoreError> {
        let result = self.run(site_url, new_owner).await;
        if let Err(ref err) = result {
            error!(site = site_url, error = %err, details = ?err, "failed to set site read-only");
        }
        result
    }

    async fn run(&self, site_url: &str, new_owner: &str) -> Result<SetReadOnlyOutcome, CoreError> {
        let site_url = required("SiteURL", site_url)?;
        let new_owner = required("Owner", new_owner)?;

        let mut session = self.provider.connect(site_url).await?;
        let snapshot = session.load_snapshot().await?;

        let retained = queue_removals(&mut session, &snapshot);
        info!(
            site = site_url,
            operations = session.pending(),
            "flushing removals"
        );
        session.execute().await?;

        queue_additions(&mut session, &snapshot, &retained, new_owner);
        info!(
            site = site_url,
            operations = session.pending(),
            "flushing additions"
        );
        session.execute().await?;

        info!(site = site_url, owner = new_owner, "site set to read-only");
        Ok(SetReadOnlyOutcome::read_only())
    }
}

/// Trimmed value of a required request field.
fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::Validation { field });
    }
    Ok(value)
}

/// Queue removal of every visitor, member and owner. Members and owners
/// are retained for a possible replay into visitors.
fn queue_removals<S: SiteSession>(session: &mut S, snapshot: &SiteSnapshot) -> RetainedMembers {
    let mut retained = RetainedMembers::default();

    for user in &snapshot.visitors.users {
        info!(login = %user.login_name, group = %snapshot.visitors.title, "removing user");
        session.queue_remove(&snapshot.visitors, user);
    }

    for group in [&snapshot.members, &snapshot.owners] {
        for user in &group.users {
            retained.push(user.clone());
            info!(login = %user.login_name, group = %group.title, "removing user");
            session.queue_remove(group, user);
        }
    }

    retained
}

fn queue_additions<S: SiteSession>(
    session: &mut S,
    snapshot: &SiteSnapshot,
    retained: &RetainedMembers,
    new_owner: &str,
) {
    let visitors = &snapshot.visitors;

    info!(login = new_owner, group = %snapshot.owners.title, "adding user");
    session.queue_add(&snapshot.owners, new_owner);

    if snapshot.is_private() {
        info!(
            group = %visitors.title,
            retained = retained.len(),
            "site is connected to a private group, adding former members and owners to visitors"
        );
        for user in retained.replay_order() {
            info!(login = %user.login_name, group = %visitors.title, "adding user");
            session.queue_add(visitors, &user.login_name);
        }
    } else {
        info!(
            group = %visitors.title,
            "site is standalone or connected to a public group, adding everyone except external users to visitors"
        );
        for user in snapshot
            .site_users
            .iter()
            .filter(|u| u.is_everyone_except_external())
        {
            info!(login = %user.login_name, group = %visitors.title, "adding user");
            session.queue_add(visitors, &user.login_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use siteward_api::{EVERYONE_EXCEPT_EXTERNAL, PropertyBag, SiteGroup};

    use super::*;

    // ── In-memory site ───────────────────────────────────────────────

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Remove { group: String, login: String },
        Add { group: String, login: String },
        Flush { operations: usize },
    }

    #[derive(Debug)]
    struct SiteState {
        properties: PropertyBag,
        site_users: Vec<SiteUser>,
        visitors: SiteGroup,
        members: SiteGroup,
        owners: SiteGroup,
        log: Vec<Op>,
        /// 1-based flush number to fail (the read counts as flush 1).
        fail_flush: Option<usize>,
        flushes: usize,
    }

    impl SiteState {
        fn group_mut(&mut self, id: i64) -> &mut SiteGroup {
            [&mut self.visitors, &mut self.members, &mut self.owners]
                .into_iter()
                .find(|g| g.id == id)
                .expect("known group")
        }

        fn resolve(&mut self, login: &str) -> SiteUser {
            if let Some(u) = self.site_users.iter().find(|u| u.login_name == login) {
                return u.clone();
            }
            let user = SiteUser {
                id: 1000 + i64::try_from(self.site_users.len()).expect("small"),
                login_name: login.to_owned(),
                title: None,
            };
            self.site_users.push(user.clone());
            user
        }

        fn begin_flush(&mut self) -> Result<(), CoreError> {
            self.flushes += 1;
            if self.fail_flush == Some(self.flushes) {
                return Err(CoreError::Remote {
                    message: "The operation has timed out".into(),
                    status: Some(503),
                });
            }
            Ok(())
        }
    }

    enum Pending {
        Remove { group_id: i64, user_id: i64 },
        Add { group_id: i64, login: String },
    }

    struct FakeSession {
        state: Arc<Mutex<SiteState>>,
        pending: Vec<Pending>,
    }

    impl SiteSession for FakeSession {
        async fn load_snapshot(&mut self) -> Result<SiteSnapshot, CoreError> {
            let mut state = self.state.lock().expect("lock");
            state.begin_flush()?;
            Ok(SiteSnapshot {
                properties: state.properties.clone(),
                site_users: state.site_users.clone(),
                visitors: state.visitors.clone(),
                members: state.members.clone(),
                owners: state.owners.clone(),
            })
        }

        fn queue_remove(&mut self, group: &SiteGroup, user: &SiteUser) {
            self.pending.push(Pending::Remove {
                group_id: group.id,
                user_id: user.id,
            });
        }

        fn queue_add(&mut self, group: &SiteGroup, login_name: &str) {
            self.pending.push(Pending::Add {
                group_id: group.id,
                login: login_name.to_owned(),
            });
        }

        fn pending(&self) -> usize {
            self.pending.len()
        }

        async fn execute(&mut self) -> Result<(), CoreError> {
            let pending = std::mem::take(&mut self.pending);
            let mut state = self.state.lock().expect("lock");
            state.begin_flush()?;
            state.log.push(Op::Flush {
                operations: pending.len(),
            });

            for op in pending {
                match op {
                    Pending::Remove { group_id, user_id } => {
                        let group = state.group_mut(group_id);
                        let title = group.title.clone();
                        let idx = group
                            .users
                            .iter()
                            .position(|u| u.id == user_id)
                            .expect("member");
                        let user = group.users.remove(idx);
                        state.log.push(Op::Remove {
                            group: title,
                            login: user.login_name,
                        });
                    }
                    Pending::Add { group_id, login } => {
                        let user = state.resolve(&login);
                        let group = state.group_mut(group_id);
                        let title = group.title.clone();
                        if !group.users.iter().any(|u| u.id == user.id) {
                            group.users.push(user);
                        }
                        state.log.push(Op::Add { group: title, login });
                    }
                }
            }
            Ok(())
        }
    }

    struct FakeProvider {
        state: Arc<Mutex<SiteState>>,
        connects: AtomicUsize,
        refuse: bool,
    }

    impl SessionProvider for FakeProvider {
        type Session = FakeSession;

        async fn connect(&self, site_url: &str) -> Result<FakeSession, CoreError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(CoreError::ConnectionFailed {
                    url: site_url.to_owned(),
                    reason: "token request failed".into(),
                });
            }
            Ok(FakeSession {
                state: Arc::clone(&self.state),
                pending: Vec::new(),
            })
        }
    }

    // ── Fixtures ─────────────────────────────────────────────────────

    const SITE: &str = "https://contoso.sharepoint.com/sites/finance";
    const NEW_OWNER: &str = "i:0#.f|membership|boss@contoso.com";
    const EXTERNAL: &str = "i:0#.f|membership|ext@x.com";

    fn user(id: i64, login: &str) -> SiteUser {
        SiteUser {
            id,
            login_name: login.to_owned(),
            title: None,
        }
    }

    fn group(id: i64, title: &str, users: Vec<SiteUser>) -> SiteGroup {
        SiteGroup {
            id,
            title: title.to_owned(),
            users,
        }
    }

    fn props(group_type: Option<&str>) -> PropertyBag {
        let mut map = BTreeMap::new();
        if let Some(t) = group_type {
            map.insert("GroupType".to_owned(), serde_json::Value::from(t));
        }
        PropertyBag(map)
    }

    fn site(group_type: Option<&str>) -> SiteState {
        let a = user(10, "i:0#.f|membership|a@contoso.com");
        let b = user(11, "i:0#.f|membership|b@contoso.com");
        let v = user(12, "i:0#.f|membership|v@contoso.com");
        SiteState {
            properties: props(group_type),
            site_users: vec![
                user(1, EVERYONE_EXCEPT_EXTERNAL),
                user(2, EXTERNAL),
                a.clone(),
                b.clone(),
                v.clone(),
            ],
            visitors: group(3, "Finance Visitors", vec![v]),
            members: group(4, "Finance Members", vec![a]),
            owners: group(5, "Finance Owners", vec![b]),
            log: Vec::new(),
            fail_flush: None,
            flushes: 0,
        }
    }

    fn downgrader(state: SiteState) -> (SiteAccessDowngrader<FakeProvider>, Arc<Mutex<SiteState>>) {
        let state = Arc::new(Mutex::new(state));
        let provider = FakeProvider {
            state: Arc::clone(&state),
            connects: AtomicUsize::new(0),
            refuse: false,
        };
        (SiteAccessDowngrader::new(provider), state)
    }

    fn logins(group: &SiteGroup) -> Vec<&str> {
        group.users.iter().map(|u| u.login_name.as_str()).collect()
    }

    fn add(group: &str, login: &str) -> Op {
        Op::Add {
            group: group.to_owned(),
            login: login.to_owned(),
        }
    }

    fn remove(group: &str, login: &str) -> Op {
        Op::Remove {
            group: group.to_owned(),
            login: login.to_owned(),
        }
    }

    // ── Tests ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn blank_fields_fail_before_connecting() {
        let (d, state) = downgrader(site(None));

        for (url, owner, field) in [
            ("", NEW_OWNER, "SiteURL"),
            ("   ", NEW_OWNER, "SiteURL"),
            (SITE, "", "Owner"),
            (SITE, "\t", "Owner"),
        ] {
            match d.downgrade(url, owner).await {
                Err(CoreError::Validation { field: f }) => assert_eq!(f, field),
                other => panic!("expected validation error for {field}, got: {other:?}"),
            }
        }

        assert_eq!(d.provider().connects.load(Ordering::SeqCst), 0);
        assert!(state.lock().expect("lock").log.is_empty());
    }

    #[tokio::test]
    async fn private_site_replays_members_and_owners_in_reverse() {
        let (d, state) = downgrader(site(Some("Private")));

        let outcome = d.downgrade(SITE, NEW_OWNER).await.expect("downgrade");
        assert!(outcome.set_read_only);

        let state = state.lock().expect("lock");
        assert_eq!(
            state.log,
            vec![
                Op::Flush { operations: 3 },
                remove("Finance Visitors", "i:0#.f|membership|v@contoso.com"),
                remove("Finance Members", "i:0#.f|membership|a@contoso.com"),
                remove("Finance Owners", "i:0#.f|membership|b@contoso.com"),
                Op::Flush { operations: 3 },
                add("Finance Owners", NEW_OWNER),
                add("Finance Visitors", "i:0#.f|membership|b@contoso.com"),
                add("Finance Visitors", "i:0#.f|membership|a@contoso.com"),
            ]
        );
        assert!(state.members.users.is_empty());
        assert_eq!(logins(&state.owners), vec![NEW_OWNER]);
    }

    #[tokio::test]
    async fn public_site_adds_only_everyone_claim() {
        let (d, state) = downgrader(site(None));

        d.downgrade(SITE, NEW_OWNER).await.expect("downgrade");

        let state = state.lock().expect("lock");
        assert_eq!(logins(&state.visitors), vec![EVERYONE_EXCEPT_EXTERNAL]);
        assert!(
            !state.log.contains(&add("Finance Visitors", EXTERNAL)),
            "external users must not be added"
        );
    }

    #[tokio::test]
    async fn group_type_other_than_private_counts_as_public() {
        for group_type in ["Public", "private", ""] {
            let (d, state) = downgrader(site(Some(group_type)));
            d.downgrade(SITE, NEW_OWNER).await.expect("downgrade");
            let state = state.lock().expect("lock");
            assert_eq!(
                logins(&state.visitors),
                vec![EVERYONE_EXCEPT_EXTERNAL],
                "GroupType {group_type:?}"
            );
        }
    }

    #[tokio::test]
    async fn rerun_leaves_single_owner() {
        let (d, state) = downgrader(site(Some("Private")));

        d.downgrade(SITE, NEW_OWNER).await.expect("first run");
        d.downgrade(SITE, NEW_OWNER).await.expect("second run");

        let state = state.lock().expect("lock");
        assert_eq!(logins(&state.owners), vec![NEW_OWNER]);
        assert!(state.members.users.is_empty());
    }

    #[tokio::test]
    async fn removal_flush_failure_skips_additions() {
        let mut s = site(Some("Private"));
        s.fail_flush = Some(2);
        let (d, state) = downgrader(s);

        let err = d.downgrade(SITE, NEW_OWNER).await.expect_err("should fail");
        assert_eq!(
            err.to_string(),
            "Remote service error: The operation has timed out"
        );

        let state = state.lock().expect("lock");
        assert!(state.log.is_empty(), "no flush completed: {:?}", state.log);
        assert_eq!(state.flushes, 2);
    }

    #[tokio::test]
    async fn addition_flush_failure_leaves_groups_emptied() {
        let mut s = site(None);
        s.fail_flush = Some(3);
        let (d, state) = downgrader(s);

        assert!(d.downgrade(SITE, NEW_OWNER).await.is_err());

        let state = state.lock().expect("lock");
        assert!(state.visitors.users.is_empty());
        assert!(state.members.users.is_empty());
        assert!(state.owners.users.is_empty());
    }

    #[tokio::test]
    async fn connection_failure_is_reported() {
        let state = Arc::new(Mutex::new(site(None)));
        let d = SiteAccessDowngrader::new(FakeProvider {
            state,
            connects: AtomicUsize::new(0),
            refuse: true,
        });

        assert!(matches!(
            d.downgrade(SITE, NEW_OWNER).await,
            Err(CoreError::ConnectionFailed { .. })
        ));
    }

    #[test]
    fn retained_members_replay_newest_first() {
        let mut retained = RetainedMembers::default();
        retained.push(user(1, "A"));
        retained.push(user(2, "B"));

        let order: Vec<&str> = retained.replay_order().map(|u| u.login_name.as_str()).collect();
        assert_eq!(order, vec!["B", "A"]);
        assert_eq!(retained.len(), 2);
    }

    #[test]
    fn outcome_serializes_with_wire_name() {
        let json = serde_json::to_value(SetReadOnlyOutcome::read_only()).expect("serialize");
        assert_eq!(json, serde_json::json!({ "SetReadOnly": true }));
    }
}
