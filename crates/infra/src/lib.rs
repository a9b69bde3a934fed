//! `opsgate-infra` — storage adapters and bootstrap wiring for the account
//! lifecycle core.

pub mod memory;
pub mod postgres;
pub mod seed;


pub use memory::InMemoryAccountRepository;
pub use postgres::PostgresAccountRepository;
pub use seed::seed_default_accounts;
