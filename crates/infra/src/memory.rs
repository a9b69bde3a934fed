//! In-memory account repository for dev and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use opsgate_accounts::{
    Account, AccountFilter, AccountRepository, RepositoryError, RepositoryResult,
};
use opsgate_auth::Role;
use opsgate_core::AccountId;

/// `RwLock<HashMap>`-backed repository. Every operation runs against a
/// consistent snapshot of the map; version checks mirror the persistent
/// implementation so tests exercise the same conflict paths.
#[derive(Debug, Default)]
pub struct InMemoryAccountRepository {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> RepositoryError {
    RepositoryError::storage("account store lock poisoned")
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> RepositoryResult<Option<Account>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Account>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().find(|a| a.username == username).cloned())
    }

    async fn list(&self, filter: &AccountFilter) -> RepositoryResult<Vec<Account>> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        let mut accounts: Vec<Account> = map.values().filter(|a| filter.matches(a)).cloned().collect();
        accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(accounts)
    }

    async fn insert(&self, account: Account) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        if map.contains_key(&account.id) {
            return Err(RepositoryError::conflict(format!(
                "account id {} already exists",
                account.id
            )));
        }
        if map.values().any(|a| a.username == account.username) {
            return Err(RepositoryError::conflict(format!(
                "username '{}' already exists",
                account.username
            )));
        }
        map.insert(account.id, account);
        Ok(())
    }

    async fn update(&self, mut account: Account) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        let stored = map.get(&account.id).ok_or_else(|| {
            RepositoryError::conflict(format!("account id {} no longer exists", account.id))
        })?;
        if stored.version != account.version {
            return Err(RepositoryError::conflict(format!(
                "stale version for account {} (expected {}, stored {})",
                account.id, account.version, stored.version
            )));
        }
        account.version += 1;
        map.insert(account.id, account);
        Ok(())
    }

    async fn delete(&self, id: AccountId) -> RepositoryResult<()> {
        let mut map = self.inner.write().map_err(|_| poisoned())?;
        map.remove(&id);
        Ok(())
    }

    async fn count_by_role(&self, role: &Role) -> RepositoryResult<u64> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map.values().filter(|a| &a.role == role).count() as u64)
    }

    async fn count_enabled_by_role(&self, role: &Role) -> RepositoryResult<u64> {
        let map = self.inner.read().map_err(|_| poisoned())?;
        Ok(map
            .values()
            .filter(|a| &a.role == role && a.enabled)
            .count() as u64)
    }
}
