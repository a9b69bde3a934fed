//! `opsgate-api` — HTTP surface over the account lifecycle core.
//!
//! The routing layer owns transport concerns only: resolving the acting
//! identity from a bearer token, translating requests into service calls, and
//! mapping typed outcomes to statuses. Policy lives in `opsgate-accounts`.

pub mod app;
pub mod authz;
pub mod context;
pub mod jwt;
pub mod middleware;
