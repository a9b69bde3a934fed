//! Postgres-backed account repository.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `RepositoryError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | RepositoryError | Scenario |
//! |------------|----------------------|-----------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Username/id uniqueness race lost |
//! | Database (other) | Any other | `Storage` | Other database errors |
//! | Everything else | N/A | `Storage` | Connection failures, pool closed, ... |
//!
//! An `UPDATE` that matches zero rows (stale optimistic version, or a record
//! deleted underneath the caller) is reported as `Conflict`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use opsgate_accounts::{
    Account, AccountFilter, AccountRepository, RepositoryError, RepositoryResult,
};
use opsgate_auth::{Permission, Role, StoredCredential};
use opsgate_core::AccountId;

/// Postgres adapter over the `accounts` table.
///
/// Uses the SQLx connection pool, which is thread-safe (`Arc + Send + Sync`).
/// Uniqueness is additionally enforced by the schema, so races the service
/// cannot observe still surface as conflicts rather than corrupt state.
pub struct PostgresAccountRepository {
    pool: Arc<PgPool>,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the `accounts` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                role TEXT NOT NULL,
                extra_permissions TEXT[] NOT NULL DEFAULT '{}',
                credential TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                enabled BOOLEAN NOT NULL DEFAULT TRUE,
                failed_login_count INTEGER NOT NULL DEFAULT 0,
                locked_until TIMESTAMPTZ,
                last_login_at TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL,
                version BIGINT NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            RepositoryError::conflict(db.message().to_string())
        }
        _ => RepositoryError::storage(err.to_string()),
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, sqlx::Error> {
    let extra_permissions: Vec<String> = row.try_get("extra_permissions")?;
    let failed_login_count: i32 = row.try_get("failed_login_count")?;
    let version: i64 = row.try_get("version")?;

    Ok(Account {
        id: AccountId::from_uuid(row.try_get::<Uuid, _>("id")?),
        username: row.try_get("username")?,
        display_name: row.try_get("display_name")?,
        role: Role::new(row.try_get::<String, _>("role")?),
        extra_permissions: extra_permissions.into_iter().map(Permission::new).collect(),
        credential: StoredCredential::from_stored(row.try_get::<String, _>("credential")?),
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        enabled: row.try_get("enabled")?,
        failed_login_count: failed_login_count as u32,
        locked_until: row.try_get::<Option<DateTime<Utc>>, _>("locked_until")?,
        last_login_at: row.try_get::<Option<DateTime<Utc>>, _>("last_login_at")?,
        created_at: row.try_get("created_at")?,
        version: version as u64,
    })
}

const SELECT_COLUMNS: &str = "id, username, display_name, role, extra_permissions, credential, \
     email, phone, enabled, failed_login_count, locked_until, last_login_at, created_at, version";

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: AccountId) -> RepositoryResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(map_sqlx_err)
    }

    async fn find_by_username(&self, username: &str) -> RepositoryResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        row.as_ref()
            .map(account_from_row)
            .transpose()
            .map_err(map_sqlx_err)
    }

    async fn list(&self, filter: &AccountFilter) -> RepositoryResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {SELECT_COLUMNS} FROM accounts \
             WHERE ($1::boolean IS NULL OR enabled = $1) \
               AND ($2::text IS NULL OR role = $2) \
               AND ($3::text IS NULL OR $3 = '' \
                    OR username ILIKE '%' || $3 || '%' \
                    OR display_name ILIKE '%' || $3 || '%' \
                    OR email ILIKE '%' || $3 || '%' \
                    OR phone ILIKE '%' || $3 || '%') \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.enabled)
        .bind(filter.role.as_ref().map(|r| r.as_str().to_string()))
        .bind(filter.search.clone())
        .fetch_all(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        rows.iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlx_err)
    }

    async fn insert(&self, account: Account) -> RepositoryResult<()> {
        let extras: Vec<String> = account
            .extra_permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        sqlx::query(
            "INSERT INTO accounts \
             (id, username, display_name, role, extra_permissions, credential, \
              email, phone, enabled, failed_login_count, locked_until, last_login_at, \
              created_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(account.id.as_uuid())
        .bind(&account.username)
        .bind(&account.display_name)
        .bind(account.role.as_str())
        .bind(&extras)
        .bind(account.credential.expose())
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.enabled)
        .bind(account.failed_login_count as i32)
        .bind(account.locked_until)
        .bind(account.last_login_at)
        .bind(account.created_at)
        .bind(account.version as i64)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn update(&self, account: Account) -> RepositoryResult<()> {
        let extras: Vec<String> = account
            .extra_permissions
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();

        let result = sqlx::query(
            "UPDATE accounts SET \
               display_name = $2, role = $3, extra_permissions = $4, credential = $5, \
               email = $6, phone = $7, enabled = $8, failed_login_count = $9, \
               locked_until = $10, last_login_at = $11, version = version + 1 \
             WHERE id = $1 AND version = $12",
        )
        .bind(account.id.as_uuid())
        .bind(&account.display_name)
        .bind(account.role.as_str())
        .bind(&extras)
        .bind(account.credential.expose())
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.enabled)
        .bind(account.failed_login_count as i32)
        .bind(account.locked_until)
        .bind(account.last_login_at)
        .bind(account.version as i64)
        .execute(&*self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::conflict(format!(
                "stale version for account {}",
                account.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: AccountId) -> RepositoryResult<()> {
        sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn count_by_role(&self, role: &Role) -> RepositoryResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&*self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }

    async fn count_enabled_by_role(&self, role: &Role) -> RepositoryResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE role = $1 AND enabled")
                .bind(role.as_str())
                .fetch_one(&*self.pool)
                .await
                .map_err(map_sqlx_err)?;
        Ok(count as u64)
    }
}
