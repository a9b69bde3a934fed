//! `opsgate-accounts` — account entity, repository boundary, and the
//! lifecycle service enforcing the system's safety invariants.

pub mod account;
pub mod repository;
pub mod service;

pub use account::{Account, AccountFilter, AccountStatus, AccountView, PROTECTED_USERNAMES};
pub use repository::{AccountRepository, RepositoryError, RepositoryResult};
pub use service::{AccountError, AccountPatch, AccountService, CreateAccount};
