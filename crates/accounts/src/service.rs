//! Account lifecycle service.
//!
//! All mutations funnel through a single write lane so invariant checks
//! (username uniqueness, the administrator floor) always run against a
//! consistent snapshot. Credential hashing is CPU-bound and always happens
//! before the lane is taken.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;

use opsgate_auth::{
    ADMIN_ROLE, CredentialError, CredentialHasher, DEFAULT_ROLE, Permission, PermissionManifest,
    Role, evaluate,
};
use opsgate_core::AccountId;

use crate::account::{Account, AccountFilter, AccountView};
use crate::repository::{AccountRepository, RepositoryError};

/// Expected, recoverable-by-caller outcomes of lifecycle operations.
///
/// None of these are transient: the service never retries and never drops a
/// requested mutation.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("username '{0}' already exists")]
    DuplicateUsername(String),

    #[error("role '{0}' is not supported")]
    UnknownRole(String),

    #[error("invalid permissions: {}", .0.join(", "))]
    InvalidPermission(Vec<String>),

    #[error("account not found")]
    NotFound,

    #[error("update request contains no fields")]
    EmptyUpdate,

    #[error("seed accounts cannot be deleted")]
    ProtectedAccount,

    #[error("at least one administrator account must remain")]
    LastAdminViolation,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Input for `create_account`.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub username: String,
    pub display_name: String,
    pub password: String,
    /// Defaults to the operator role when omitted.
    pub role: Option<Role>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub extra_permissions: Vec<Permission>,
}

/// Partial update for `update_account`.
///
/// `None` means "field absent from the request"; omitted fields retain their
/// prior values. Every provided field is validated before any is applied.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub extra_permissions: Option<Vec<Permission>>,
    pub password: Option<String>,
}

impl AccountPatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.role.is_none()
            && self.extra_permissions.is_none()
            && self.password.is_none()
    }
}

/// The core service: create, update, enable/disable, delete, list, and the
/// authorization entry points.
pub struct AccountService {
    manifest: Arc<PermissionManifest>,
    repository: Arc<dyn AccountRepository>,
    hasher: Arc<dyn CredentialHasher>,
    write_lane: Mutex<()>,
}

impl AccountService {
    pub fn new(
        manifest: Arc<PermissionManifest>,
        repository: Arc<dyn AccountRepository>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Self {
        Self {
            manifest,
            repository,
            hasher,
            write_lane: Mutex::new(()),
        }
    }

    pub fn manifest(&self) -> &PermissionManifest {
        &self.manifest
    }

    /// True iff `required` is in the account's effective permission set.
    /// Pure; an unknown role yields an empty baseline and fails closed.
    pub fn authorize(&self, account: &Account, required: &Permission) -> bool {
        evaluate::authorize(
            &self.manifest,
            &account.role,
            &account.extra_permissions,
            required,
        )
    }

    /// Union of the role baseline and extra grants, recomputed on every call.
    pub fn effective_permissions(&self, account: &Account) -> BTreeSet<Permission> {
        account.effective_permissions(&self.manifest)
    }

    /// Accounts matching `filter`, newest first. No side effects; the stored
    /// credential never appears in the output.
    pub async fn list_accounts(
        &self,
        filter: &AccountFilter,
    ) -> Result<Vec<AccountView>, AccountError> {
        let accounts = self.repository.list(filter).await?;
        Ok(accounts.iter().map(|a| self.view(a)).collect())
    }

    pub async fn create_account(&self, input: CreateAccount) -> Result<AccountView, AccountError> {
        let role = input
            .role
            .unwrap_or_else(|| Role::new(DEFAULT_ROLE));
        if !self.manifest.is_known_role(&role) {
            return Err(AccountError::UnknownRole(role.as_str().to_string()));
        }
        self.check_permissions_known(&input.extra_permissions)?;

        // Pre-check before hashing; the authoritative check runs again under
        // the write lane.
        if self
            .repository
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AccountError::DuplicateUsername(input.username));
        }

        let credential = self.hasher.hash(&input.password)?;

        let _guard = self.write_lane.lock().await;

        if self
            .repository
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AccountError::DuplicateUsername(input.username));
        }

        let account = Account {
            id: AccountId::new(),
            username: input.username,
            display_name: input.display_name,
            role,
            extra_permissions: input.extra_permissions,
            credential,
            email: input.email,
            phone: input.phone,
            enabled: true,
            failed_login_count: 0,
            locked_until: None,
            last_login_at: None,
            created_at: Utc::now(),
            version: 0,
        };

        self.repository.insert(account.clone()).await?;

        tracing::info!(
            account_id = %account.id,
            role = %account.role,
            "account created"
        );

        Ok(self.view(&account))
    }

    pub async fn update_account(
        &self,
        id: AccountId,
        patch: AccountPatch,
    ) -> Result<AccountView, AccountError> {
        if patch.is_empty() {
            return Err(AccountError::EmptyUpdate);
        }

        if let Some(role) = &patch.role {
            if !self.manifest.is_known_role(role) {
                return Err(AccountError::UnknownRole(role.as_str().to_string()));
            }
        }
        if let Some(extras) = &patch.extra_permissions {
            self.check_permissions_known(extras)?;
        }

        // Pre-check existence before hashing; the record is re-read under the
        // write lane before anything is applied.
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(AccountError::NotFound);
        }

        let credential = match &patch.password {
            Some(password) => Some(self.hasher.hash(password)?),
            None => None,
        };

        let _guard = self.write_lane.lock().await;

        let mut account = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)?;

        if let Some(display_name) = patch.display_name {
            account.display_name = display_name;
        }
        if let Some(email) = patch.email {
            account.email = Some(email);
        }
        if let Some(phone) = patch.phone {
            account.phone = Some(phone);
        }
        if let Some(role) = patch.role {
            account.role = role;
        }
        if let Some(extras) = patch.extra_permissions {
            account.extra_permissions = extras;
        }
        if let Some(credential) = credential {
            // Replaces the stored credential; lockout state is untouched.
            account.credential = credential;
        }

        self.repository.update(account.clone()).await?;

        tracing::info!(
            account_id = %account.id,
            role = %account.role,
            "account updated"
        );

        Ok(self.view(&account))
    }

    pub async fn set_account_enabled(
        &self,
        id: AccountId,
        enabled: bool,
    ) -> Result<AccountView, AccountError> {
        let _guard = self.write_lane.lock().await;

        let mut account = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)?;

        // Disabling must leave at least one enabled administrator.
        if !enabled && account.enabled && account.role.as_str() == ADMIN_ROLE {
            let enabled_admins = self
                .repository
                .count_enabled_by_role(&Role::new(ADMIN_ROLE))
                .await?;
            if enabled_admins <= 1 {
                return Err(AccountError::LastAdminViolation);
            }
        }

        account.enabled = enabled;
        if enabled {
            account.reset_lockout();
        }

        self.repository.update(account.clone()).await?;

        tracing::info!(
            account_id = %account.id,
            enabled = account.enabled,
            "account status updated"
        );

        Ok(self.view(&account))
    }

    pub async fn delete_account(&self, id: AccountId) -> Result<AccountId, AccountError> {
        let _guard = self.write_lane.lock().await;

        let account = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or(AccountError::NotFound)?;

        if account.is_protected() {
            return Err(AccountError::ProtectedAccount);
        }

        // The delete floor counts all admin accounts, enabled or not.
        if account.role.as_str() == ADMIN_ROLE {
            let admins = self
                .repository
                .count_by_role(&Role::new(ADMIN_ROLE))
                .await?;
            if admins <= 1 {
                return Err(AccountError::LastAdminViolation);
            }
        }

        self.repository.delete(id).await?;

        tracing::info!(
            account_id = %account.id,
            role = %account.role,
            "account deleted"
        );

        Ok(id)
    }

    fn view(&self, account: &Account) -> AccountView {
        AccountView::from_account(account, &self.manifest)
    }

    fn check_permissions_known(&self, requested: &[Permission]) -> Result<(), AccountError> {
        let unknown = self.manifest.unknown_permissions(requested);
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AccountError::InvalidPermission(
                unknown.iter().map(|p| p.as_str().to_string()).collect(),
            ))
        }
    }
}
