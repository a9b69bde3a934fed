//! One-time bootstrap of default role accounts.
//!
//! For every role the manifest defines, ensures a default account exists:
//! `admin` for the administrator role, `<role>1` otherwise. Existing accounts
//! are left untouched, so the routine is idempotent and safe to run on every
//! start. Development passwords follow the `<role>123` convention and must be
//! rotated in real deployments.

use opsgate_accounts::{AccountError, AccountService, CreateAccount};
use opsgate_auth::{ADMIN_ROLE, Role};

fn default_username(role: &Role) -> String {
    if role.as_str() == ADMIN_ROLE {
        ADMIN_ROLE.to_string()
    } else {
        format!("{}1", role.as_str())
    }
}

fn default_display_name(role: &Role) -> String {
    match role.as_str() {
        "admin" => "System Administrator".to_string(),
        "reviewer" => "Review Specialist".to_string(),
        "operator" => "Operations Specialist".to_string(),
        "viewer" => "Guest Account".to_string(),
        other => format!("{other} default account"),
    }
}

/// Ensure one account per manifest role, skipping any that already exist.
///
/// Guarantees the administrator-floor invariant holds before the service
/// starts answering requests: after a successful run there is always at least
/// one enabled `admin` account.
pub async fn seed_default_accounts(service: &AccountService) -> Result<(), AccountError> {
    let roles: Vec<Role> = service.manifest().roles().map(|(r, _)| r.clone()).collect();

    for role in roles {
        let username = default_username(&role);

        let input = CreateAccount {
            username: username.clone(),
            display_name: default_display_name(&role),
            password: format!("{}123", role.as_str()),
            role: Some(role.clone()),
            email: Some(format!("{username}@example.com")),
            phone: None,
            extra_permissions: vec![],
        };

        match service.create_account(input).await {
            Ok(view) => {
                tracing::info!(account_id = %view.id, role = %role, "seeded default account");
            }
            Err(AccountError::DuplicateUsername(_)) => {
                tracing::debug!(username = %username, "seed account already present");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(())
}
