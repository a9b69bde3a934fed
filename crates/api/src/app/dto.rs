//! Request shapes for the HTTP surface.
//!
//! Update fields are `Option` so "absent from the request" is distinguishable
//! from any provided value; the service treats only present fields as
//! mutations.

use serde::Deserialize;

use opsgate_accounts::{AccountPatch, AccountStatus, CreateAccount};
use opsgate_auth::{Permission, Role};

#[derive(Debug, Deserialize)]
pub struct ListAccountsQuery {
    pub status: Option<AccountStatus>,
    pub role: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub display_name: String,
    pub password: String,
    pub role: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl CreateAccountRequest {
    pub fn into_input(self) -> CreateAccount {
        CreateAccount {
            username: self.username,
            display_name: self.display_name,
            password: self.password,
            role: self.role.map(Role::new),
            email: self.email,
            phone: self.phone,
            extra_permissions: self.permissions.into_iter().map(Permission::new).collect(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateAccountRequest {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub password: Option<String>,
}

impl UpdateAccountRequest {
    pub fn into_patch(self) -> AccountPatch {
        AccountPatch {
            display_name: self.display_name,
            email: self.email,
            phone: self.phone,
            role: self.role.map(Role::new),
            extra_permissions: self
                .permissions
                .map(|ids| ids.into_iter().map(Permission::new).collect()),
            password: self.password,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub enabled: bool,
}
