//! Credential hashing boundary.
//!
//! `hash(plaintext)` produces an opaque stored form via a deliberately slow,
//! salted one-way function; `verify(plaintext, stored)` checks a candidate
//! against it. Plaintext never crosses this seam in the other direction and
//! is never logged.

use thiserror::Error;

/// Opaque stored form of a password.
///
/// Not serde-serializable, and `Debug` output is redacted, so the stored hash
/// cannot leak through API payloads or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredCredential(String);

impl StoredCredential {
    /// Wrap a stored form read back from persistence.
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw stored form, for persistence only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for StoredCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("StoredCredential(<redacted>)")
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Boundary trait for password hashing and verification.
///
/// `hash` is invoked only when a password is being set or changed, never on
/// unrelated updates. Both operations are CPU-bound; callers must not hold
/// record locks across them.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<StoredCredential, CredentialError>;
    fn verify(&self, plaintext: &str, stored: &StoredCredential) -> bool;
}

/// bcrypt-backed hasher with a configurable work factor.
#[derive(Debug, Clone)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Baseline work factor for production deployments.
    pub const BASELINE_COST: u32 = bcrypt::DEFAULT_COST;

    pub fn new() -> Self {
        Self::with_cost(Self::BASELINE_COST)
    }

    /// Lower costs are for tests only; bcrypt rejects costs below 4.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<StoredCredential, CredentialError> {
        let phc = bcrypt::hash(plaintext, self.cost)
            .map_err(|e| CredentialError::Hash(e.to_string()))?;
        Ok(StoredCredential::from_stored(phc))
    }

    fn verify(&self, plaintext: &str, stored: &StoredCredential) -> bool {
        bcrypt::verify(plaintext, stored.expose()).unwrap_or(false)
    }
}
