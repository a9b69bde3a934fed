//! Account entity and its outward-facing view.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsgate_auth::{Permission, PermissionManifest, Role, StoredCredential, evaluate};
use opsgate_core::AccountId;

/// Usernames created by the bootstrap routine that can never be deleted.
pub const PROTECTED_USERNAMES: [&str; 2] = ["admin", "system"];

/// A managed account.
///
/// # Invariants (enforced by the lifecycle service, not by storage)
/// - `username` is globally unique and immutable after creation.
/// - `role` is always a role known to the manifest.
/// - `extra_permissions` only ever contains identifiers known to the manifest.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    /// Permissions granted on top of the role baseline.
    pub extra_permissions: Vec<Permission>,
    /// Opaque stored credential; never serialized, redacted from Debug.
    pub credential: StoredCredential,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub enabled: bool,
    pub failed_login_count: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped by the repository on update.
    pub version: u64,
}

impl Account {
    pub fn is_protected(&self) -> bool {
        PROTECTED_USERNAMES.contains(&self.username.as_str())
    }

    /// Union of the role baseline and extra grants, recomputed on every call.
    pub fn effective_permissions(&self, manifest: &PermissionManifest) -> BTreeSet<Permission> {
        evaluate::effective_permissions(manifest, &self.role, &self.extra_permissions)
    }

    /// Clear lockout bookkeeping. Invoked whenever the account is (re-)enabled.
    pub(crate) fn reset_lockout(&mut self) {
        self.failed_login_count = 0;
        self.locked_until = None;
    }
}

/// Enabled/disabled state as exposed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled { Self::Active } else { Self::Inactive }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Outward shape of an account.
///
/// The stored credential is structurally absent from this type, so no caller
/// can ever receive it.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub username: String,
    pub display_name: String,
    pub role: Role,
    /// The effective permission set (role baseline plus extra grants).
    pub permissions: Vec<Permission>,
    pub email: String,
    pub phone: String,
    pub status: AccountStatus,
    pub is_protected: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountView {
    pub fn from_account(account: &Account, manifest: &PermissionManifest) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            display_name: account.display_name.clone(),
            role: account.role.clone(),
            permissions: account.effective_permissions(manifest).into_iter().collect(),
            email: account.email.clone().unwrap_or_default(),
            phone: account.phone.clone().unwrap_or_default(),
            status: AccountStatus::from_enabled(account.enabled),
            is_protected: account.is_protected(),
            last_login_at: account.last_login_at,
            created_at: account.created_at,
        }
    }
}

/// Optional filter for account listings. All criteria are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub enabled: Option<bool>,
    pub role: Option<Role>,
    /// Case-insensitive substring over username, display name, email, phone.
    pub search: Option<String>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        if let Some(enabled) = self.enabled {
            if account.enabled != enabled {
                return false;
            }
        }

        if let Some(role) = &self.role {
            if &account.role != role {
                return false;
            }
        }

        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if needle.is_empty() {
                return true;
            }
            let mut haystacks = vec![
                account.username.to_lowercase(),
                account.display_name.to_lowercase(),
            ];
            if let Some(email) = &account.email {
                haystacks.push(email.to_lowercase());
            }
            if let Some(phone) = &account.phone {
                haystacks.push(phone.to_lowercase());
            }
            if !haystacks.iter().any(|h| h.contains(&needle)) {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsgate_auth::StoredCredential;

    fn manifest() -> PermissionManifest {
        PermissionManifest::from_json(
            r#"{
                "permissions": {
                    "user.manage": "Manage accounts",
                    "report.view": "View reports",
                    "task.review": "Review submitted tasks"
                },
                "roles": {
                    "admin": ["user.manage", "report.view", "task.review"],
                    "viewer": ["report.view"]
                }
            }"#,
        )
        .unwrap()
    }

    fn account(username: &str, role: &str) -> Account {
        Account {
            id: AccountId::new(),
            username: username.to_string(),
            display_name: "Dana Operator".to_string(),
            role: Role::new(role.to_string()),
            extra_permissions: vec![],
            credential: StoredCredential::from_stored("$2b$04$stub"),
            email: Some("dana@example.com".to_string()),
            phone: Some("13800000000".to_string()),
            enabled: true,
            failed_login_count: 0,
            locked_until: None,
            last_login_at: None,
            created_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn protected_usernames_are_detected() {
        assert!(account("admin", "admin").is_protected());
        assert!(account("system", "admin").is_protected());
        assert!(!account("admin2", "admin").is_protected());
    }

    #[test]
    fn view_never_contains_the_credential() {
        let manifest = manifest();
        let view = AccountView::from_account(&account("dana", "viewer"), &manifest);

        let json = serde_json::to_value(&view).unwrap();
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("credential"));
        assert!(!serde_json::to_string(&view).unwrap().contains("$2b$"));
    }

    #[test]
    fn view_reports_effective_permissions_and_status() {
        let manifest = manifest();
        let mut acct = account("dana", "viewer");
        acct.extra_permissions = vec![Permission::new("user.manage")];
        acct.enabled = false;

        let view = AccountView::from_account(&acct, &manifest);
        assert_eq!(view.status, AccountStatus::Inactive);
        assert!(view.permissions.contains(&Permission::new("report.view")));
        assert!(view.permissions.contains(&Permission::new("user.manage")));
        assert_eq!(view.email, "dana@example.com");
    }

    #[test]
    fn view_uses_empty_strings_for_missing_contacts() {
        let manifest = manifest();
        let mut acct = account("dana", "viewer");
        acct.email = None;
        acct.phone = None;

        let view = AccountView::from_account(&acct, &manifest);
        assert_eq!(view.email, "");
        assert_eq!(view.phone, "");
    }

    #[test]
    fn filter_matches_on_enabled_and_role() {
        let mut acct = account("dana", "viewer");
        acct.enabled = false;

        let filter = AccountFilter {
            enabled: Some(false),
            role: Some(Role::new("viewer")),
            search: None,
        };
        assert!(filter.matches(&acct));

        let filter = AccountFilter {
            enabled: Some(true),
            ..Default::default()
        };
        assert!(!filter.matches(&acct));

        let filter = AccountFilter {
            role: Some(Role::new("admin")),
            ..Default::default()
        };
        assert!(!filter.matches(&acct));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let acct = account("dana", "viewer");

        for needle in ["DANA", "operator", "EXAMPLE.COM", "1380"] {
            let filter = AccountFilter {
                search: Some(needle.to_string()),
                ..Default::default()
            };
            assert!(filter.matches(&acct), "expected match on {needle:?}");
        }

        let filter = AccountFilter {
            search: Some("nobody".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&acct));
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(AccountFilter::default().matches(&account("dana", "viewer")));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Effective permissions always cover the role baseline and never
            /// stray outside the manifest's known set.
            #[test]
            fn effective_set_covers_baseline_and_stays_known(
                picks in proptest::collection::vec(0usize..3, 0..8)
            ) {
                let manifest = manifest();
                let known: Vec<Permission> = manifest.permissions().cloned().collect();

                let mut acct = account("dana", "viewer");
                acct.extra_permissions =
                    picks.iter().map(|i| known[*i].clone()).collect();

                let effective = acct.effective_permissions(&manifest);

                for baseline in manifest.role_permissions(&acct.role) {
                    prop_assert!(effective.contains(baseline));
                }
                for permission in &effective {
                    prop_assert!(manifest.is_known_permission(permission));
                }
            }
        }
    }
}
