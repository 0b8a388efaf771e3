//! Renewal-credential store.

use async_trait::async_trait;
use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use mockall::automock;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, Row, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::{
    auth::{
        errors::TokenStoreError,
        models::{NewRefreshToken, RefreshToken, RevokeOutcome},
        token::generate_refresh_value,
    },
    principals::PrincipalUuid,
};

const CREATE_REFRESH_TOKEN_SQL: &str = include_str!("sql/create_refresh_token.sql");
const FIND_BY_TOKEN_SQL: &str = include_str!("sql/find_by_token.sql");
const FIND_ACTIVE_BY_PRINCIPAL_SQL: &str = include_str!("sql/find_active_by_principal.sql");
const REVOKE_IF_ACTIVE_SQL: &str = include_str!("sql/revoke_if_active.sql");
const DELETE_ALL_FOR_PRINCIPAL_SQL: &str = include_str!("sql/delete_all_for_principal.sql");
const PURGE_EXPIRED_SQL: &str = include_str!("sql/purge_expired.sql");

/// Collision retries before an insert gives up. A collision requires two
/// identical 256-bit values, so a second attempt is already unreachable in
/// practice.
const INSERT_ATTEMPTS: u32 = 3;

/// Persistence operations for renewal credentials.
#[automock]
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new credential. On a token-value collision the store
    /// retries with a freshly generated value, so the returned record may
    /// carry a different `token` than the payload.
    async fn create(&self, new: NewRefreshToken) -> Result<RefreshToken, TokenStoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, TokenStoreError>;

    /// Unrevoked, unexpired credentials owned by a principal, newest first.
    async fn find_active_by_principal(
        &self,
        principal: PrincipalUuid,
    ) -> Result<Vec<RefreshToken>, TokenStoreError>;

    /// Compare-and-swap revocation: sets the revocation metadata only if
    /// the record was not already revoked, creating `replacement` in the
    /// same transaction when supplied. Exactly one of any number of
    /// concurrent callers observes [`RevokeOutcome::Revoked`].
    async fn revoke_if_active(
        &self,
        token: &str,
        revoked_by_ip: &str,
        replacement: Option<NewRefreshToken>,
    ) -> Result<RevokeOutcome, TokenStoreError>;

    /// Delete every credential owned by a principal, revoked or not.
    /// Returns the number deleted.
    async fn delete_all_for_principal(
        &self,
        principal: PrincipalUuid,
    ) -> Result<u64, TokenStoreError>;

    /// Delete credentials already past `expires_at`. Returns the number
    /// deleted.
    async fn purge_expired(&self, now: Timestamp) -> Result<u64, TokenStoreError>;
}

/// PostgreSQL-backed renewal-credential store.
#[derive(Debug, Clone)]
pub struct PgRefreshTokenRepository {
    pool: PgPool,
}

impl PgRefreshTokenRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert a credential row, regenerating the token value on a unique-key
/// collision instead of surfacing it.
async fn insert_with_retry(
    conn: &mut PgConnection,
    mut new: NewRefreshToken,
) -> Result<RefreshToken, TokenStoreError> {
    for _ in 0..INSERT_ATTEMPTS {
        let inserted = query_as::<Postgres, RefreshToken>(CREATE_REFRESH_TOKEN_SQL)
            .bind(&new.token)
            .bind(new.principal_uuid.into_uuid())
            .bind(SqlxTimestamp::from(new.issued_at))
            .bind(SqlxTimestamp::from(new.expires_at))
            .bind(&new.created_by_ip)
            .fetch_optional(&mut *conn)
            .await
            .map_err(TokenStoreError::Sql)?;

        match inserted {
            Some(record) => return Ok(record),
            None => new.token = generate_refresh_value(),
        }
    }

    Err(TokenStoreError::Collision {
        attempts: INSERT_ATTEMPTS,
    })
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenRepository {
    async fn create(&self, new: NewRefreshToken) -> Result<RefreshToken, TokenStoreError> {
        let mut conn = self.pool.acquire().await.map_err(TokenStoreError::Sql)?;

        insert_with_retry(&mut conn, new).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, TokenStoreError> {
        query_as::<Postgres, RefreshToken>(FIND_BY_TOKEN_SQL)
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(TokenStoreError::Sql)
    }

    async fn find_active_by_principal(
        &self,
        principal: PrincipalUuid,
    ) -> Result<Vec<RefreshToken>, TokenStoreError> {
        query_as::<Postgres, RefreshToken>(FIND_ACTIVE_BY_PRINCIPAL_SQL)
            .bind(principal.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(TokenStoreError::Sql)
    }

    async fn revoke_if_active(
        &self,
        token: &str,
        revoked_by_ip: &str,
        replacement: Option<NewRefreshToken>,
    ) -> Result<RevokeOutcome, TokenStoreError> {
        let mut tx = self.pool.begin().await.map_err(TokenStoreError::Sql)?;

        // Successor first: the replaced_by_token self-reference must point
        // at an existing row. A lost swap below rolls the insert back.
        let successor = match replacement {
            Some(new) => Some(insert_with_retry(&mut tx, new).await?),
            None => None,
        };

        let revoked = query_as::<Postgres, RefreshToken>(REVOKE_IF_ACTIVE_SQL)
            .bind(token)
            .bind(revoked_by_ip)
            .bind(successor.as_ref().map(|record| record.token.as_str()))
            .fetch_optional(&mut *tx)
            .await
            .map_err(TokenStoreError::Sql)?;

        if revoked.is_none() {
            tx.rollback().await.map_err(TokenStoreError::Sql)?;

            return Ok(RevokeOutcome::AlreadyRevoked);
        }

        tx.commit().await.map_err(TokenStoreError::Sql)?;

        Ok(RevokeOutcome::Revoked { successor })
    }

    async fn delete_all_for_principal(
        &self,
        principal: PrincipalUuid,
    ) -> Result<u64, TokenStoreError> {
        query(DELETE_ALL_FOR_PRINCIPAL_SQL)
            .bind(principal.into_uuid())
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(TokenStoreError::Sql)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, TokenStoreError> {
        query(PURGE_EXPIRED_SQL)
            .bind(SqlxTimestamp::from(now))
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(TokenStoreError::Sql)
    }
}

impl<'r> FromRow<'r, PgRow> for RefreshToken {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            token: row.try_get("token")?,
            principal_uuid: PrincipalUuid::from_uuid(row.try_get::<Uuid, _>("principal_uuid")?),
            issued_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            created_by_ip: row.try_get("created_by_ip")?,
            revoked: row.try_get("revoked")?,
            revoked_at: row
                .try_get::<Option<SqlxTimestamp>, _>("revoked_at")?
                .map(SqlxTimestamp::to_jiff),
            revoked_by_ip: row.try_get("revoked_by_ip")?,
            replaced_by_token: row.try_get("replaced_by_token")?,
        })
    }
}
