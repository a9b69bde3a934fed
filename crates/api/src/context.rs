use opsgate_auth::{Permission, Role};
use opsgate_core::AccountId;

/// Actor context for a request (authenticated identity + grants).
///
/// This is immutable and must be present for all account routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    account_id: AccountId,
    username: String,
    role: Role,
    permissions: Vec<Permission>,
}

impl ActorContext {
    pub fn new(
        account_id: AccountId,
        username: String,
        role: Role,
        permissions: Vec<Permission>,
    ) -> Self {
        Self {
            account_id,
            username,
            role,
            permissions,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Extra permission grants on top of the role baseline.
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }
}
