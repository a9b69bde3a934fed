//! Abstract storage boundary for accounts.

use async_trait::async_trait;
use thiserror::Error;

use opsgate_auth::Role;
use opsgate_core::AccountId;

use crate::account::{Account, AccountFilter};

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage-level failure.
///
/// Policy violations (duplicate usernames, the administrator floor, ...) are
/// the lifecycle service's concern; the repository only reports mechanical
/// faults.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Optimistic version check failed, or a uniqueness race was lost.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend fault (IO, connection, serialization).
    #[error("storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Abstract account storage.
///
/// `update` compares the record's `version` against the stored one and fails
/// with `Conflict` on mismatch; the stored version is bumped on success, so a
/// concurrent mutation of the same account surfaces as a conflict rather than
/// a lost update.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_id(&self, id: AccountId) -> RepositoryResult<Option<Account>>;

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Account>>;

    /// Matching accounts, newest first.
    async fn list(&self, filter: &AccountFilter) -> RepositoryResult<Vec<Account>>;

    /// Insert a new record. Fails with `Conflict` if the id or username is
    /// already present.
    async fn insert(&self, account: Account) -> RepositoryResult<()>;

    /// Persist a mutated record under an optimistic version check.
    async fn update(&self, account: Account) -> RepositoryResult<()>;

    /// Remove a record. Removing an absent record is a no-op.
    async fn delete(&self, id: AccountId) -> RepositoryResult<()>;

    /// Number of accounts with the given role, enabled or not.
    async fn count_by_role(&self, role: &Role) -> RepositoryResult<u64>;

    /// Number of enabled accounts with the given role.
    async fn count_enabled_by_role(&self, role: &Role) -> RepositoryResult<u64>;
}
