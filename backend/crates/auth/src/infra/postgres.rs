//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::id::{IdentityId, SessionId, TenantId};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::domain::entity::{
    challenge::Challenge, credential::Credential, identity::Identity,
    refresh_token::RefreshToken, session::Session, tenant::Tenant,
};
use crate::domain::repository::{
    ChallengeRepository, CredentialRepository, IdentityRepository, RefreshTokenRepository,
    RegistrationRepository, RepoResult, RepositoryError, SessionRepository, TenantRepository,
};
use crate::domain::value_object::{
    email::Email, password::StoredPassword, role::Role, token_digest::TokenDigest,
    totp_secret::TotpSecret,
};

/// PostgreSQL-backed auth store
#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../database/migrations").run(&self.pool).await
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                RepositoryError::Conflict
            }
            _ => RepositoryError::Backend(err.to_string()),
        }
    }
}

// ============================================================================
// Identity Repository Implementation
// ============================================================================

const IDENTITY_COLUMNS: &str = r#"
    id,
    tenant_id,
    email,
    first_name,
    last_name,
    role,
    active,
    two_factor_enabled,
    last_login_at,
    created_at,
    updated_at
"#;

impl IdentityRepository for PgAuthStore {
    async fn get(&self, id: &IdentityId) -> RepoResult<Identity> {
        let row = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_identity())
    }

    async fn find_by_email(&self, email: &Email) -> RepoResult<Vec<Identity>> {
        let rows = sqlx::query_as::<_, IdentityRow>(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(IdentityRow::into_identity).collect())
    }

    async fn create(&self, identity: &Identity) -> RepoResult<()> {
        insert_identity(&self.pool, identity).await?;
        Ok(())
    }

    async fn update(&self, identity: &Identity) -> RepoResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE identities SET
                email = $2,
                first_name = $3,
                last_name = $4,
                role = $5,
                active = $6,
                two_factor_enabled = $7,
                last_login_at = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(identity.id.as_uuid())
        .bind(identity.email.as_str())
        .bind(&identity.first_name)
        .bind(&identity.last_name)
        .bind(identity.role.id())
        .bind(identity.active)
        .bind(identity.two_factor_enabled)
        .bind(identity.last_login_at)
        .bind(identity.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Tenant Repository Implementation
// ============================================================================

impl TenantRepository for PgAuthStore {
    async fn get(&self, id: &TenantId) -> RepoResult<Tenant> {
        let row = sqlx::query_as::<_, TenantRow>(
            "SELECT id, name, created_at, updated_at FROM tenants WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn create(&self, tenant: &Tenant) -> RepoResult<()> {
        insert_tenant(&self.pool, tenant).await?;
        Ok(())
    }
}

// ============================================================================
// Credential Repository Implementation
// ============================================================================

impl CredentialRepository for PgAuthStore {
    async fn get(&self, identity_id: &IdentityId) -> RepoResult<Credential> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT identity_id, password_hash, totp_secret, created_at, updated_at
            FROM credentials
            WHERE identity_id = $1
            "#,
        )
        .bind(identity_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        row.into_credential()
    }

    async fn create(&self, credential: &Credential) -> RepoResult<()> {
        insert_credential(&self.pool, credential).await?;
        Ok(())
    }

    async fn replace(&self, credential: &Credential) -> RepoResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE credentials SET
                password_hash = $2,
                totp_secret = $3,
                created_at = $4,
                updated_at = $5
            WHERE identity_id = $1
            "#,
        )
        .bind(credential.identity_id.as_uuid())
        .bind(credential.password.as_phc_string())
        .bind(credential.totp_secret.as_ref().map(TotpSecret::as_base32))
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

// ============================================================================
// Registration Repository Implementation
// ============================================================================

impl RegistrationRepository for PgAuthStore {
    async fn register(
        &self,
        tenant: &Tenant,
        identity: &Identity,
        credential: &Credential,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        insert_tenant(&mut *tx, tenant).await?;
        insert_identity(&mut *tx, identity).await?;
        insert_credential(&mut *tx, credential).await?;

        tx.commit().await?;
        Ok(())
    }
}

async fn insert_tenant<'e>(executor: impl PgExecutor<'e>, tenant: &Tenant) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO tenants (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(executor)
        .await?;
    Ok(())
}

async fn insert_identity<'e>(executor: impl PgExecutor<'e>, identity: &Identity) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO identities (
            id,
            tenant_id,
            email,
            first_name,
            last_name,
            role,
            active,
            two_factor_enabled,
            last_login_at,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(identity.id.as_uuid())
    .bind(identity.tenant_id.as_uuid())
    .bind(identity.email.as_str())
    .bind(&identity.first_name)
    .bind(&identity.last_name)
    .bind(identity.role.id())
    .bind(identity.active)
    .bind(identity.two_factor_enabled)
    .bind(identity.last_login_at)
    .bind(identity.created_at)
    .bind(identity.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn insert_credential<'e>(
    executor: impl PgExecutor<'e>,
    credential: &Credential,
) -> sqlx::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO credentials (identity_id, password_hash, totp_secret, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(credential.identity_id.as_uuid())
    .bind(credential.password.as_phc_string())
    .bind(credential.totp_secret.as_ref().map(TotpSecret::as_base32))
    .bind(credential.created_at)
    .bind(credential.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for PgAuthStore {
    async fn create(&self, session: &Session) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (
                id,
                identity_id,
                ip_address,
                user_agent,
                created_at,
                last_active_at,
                expires_at,
                revoked
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.identity_id.as_uuid())
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.created_at)
        .bind(session.last_active_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: &SessionId) -> RepoResult<Session> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, identity_id, ip_address, user_agent, created_at, last_active_at, expires_at, revoked
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_session())
    }

    async fn list_active(&self, identity_id: &IdentityId, limit: usize) -> RepoResult<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, identity_id, ip_address, user_agent, created_at, last_active_at, expires_at, revoked
            FROM sessions
            WHERE identity_id = $1 AND NOT revoked AND expires_at > now()
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SessionRow::into_session).collect())
    }

    async fn update(&self, session: &Session) -> RepoResult<()> {
        let updated = sqlx::query(
            r#"
            UPDATE sessions SET
                last_active_at = $2,
                expires_at = $3,
                revoked = $4
            WHERE id = $1
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.last_active_at)
        .bind(session.expires_at)
        .bind(session.revoked)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn revoke_all_except(
        &self,
        identity_id: &IdentityId,
        keep: Option<&SessionId>,
    ) -> RepoResult<u64> {
        let revoked = sqlx::query(
            r#"
            UPDATE sessions SET revoked = TRUE
            WHERE identity_id = $1
              AND NOT revoked
              AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(keep.map(|id| *id.as_uuid()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for PgAuthStore {
    async fn create(&self, token: &RefreshToken) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, identity_id, session_id, issued_at, expires_at, revoked)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.token_hash.as_bytes().as_slice())
        .bind(token.identity_id.as_uuid())
        .bind(token.session_id.map(SessionId::into_uuid))
        .bind(token.issued_at)
        .bind(token.expires_at)
        .bind(token.revoked)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, token_hash: &TokenDigest) -> RepoResult<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT token_hash, identity_id, session_id, issued_at, expires_at, revoked
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash.as_bytes().as_slice())
        .fetch_one(&self.pool)
        .await?;

        row.into_refresh_token()
    }

    async fn revoke(&self, token_hash: &TokenDigest) -> RepoResult<bool> {
        // The row lock decides which of two concurrent rotations wins.
        let row: Option<(bool,)> = sqlx::query_as(
            r#"
            WITH target AS (
                SELECT token_hash, revoked FROM refresh_tokens
                WHERE token_hash = $1
                FOR UPDATE
            )
            UPDATE refresh_tokens r SET revoked = TRUE
            FROM target
            WHERE r.token_hash = target.token_hash
            RETURNING NOT target.revoked
            "#,
        )
        .bind(token_hash.as_bytes().as_slice())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((changed,)) => Ok(changed),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn revoke_for_session(&self, session_id: &SessionId) -> RepoResult<u64> {
        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE session_id = $1 AND NOT revoked",
        )
        .bind(session_id.as_uuid())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn revoke_for_identity(
        &self,
        identity_id: &IdentityId,
        keep_session: Option<&SessionId>,
    ) -> RepoResult<u64> {
        let revoked = sqlx::query(
            r#"
            UPDATE refresh_tokens SET revoked = TRUE
            WHERE identity_id = $1
              AND NOT revoked
              AND ($2::uuid IS NULL OR session_id IS DISTINCT FROM $2)
            "#,
        )
        .bind(identity_id.as_uuid())
        .bind(keep_session.map(|id| *id.as_uuid()))
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(revoked)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Challenge Repository Implementation
// ============================================================================

impl ChallengeRepository for PgAuthStore {
    async fn create(&self, challenge: &Challenge) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO mfa_challenges (token_hash, identity_id, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(challenge.token_hash.as_bytes().as_slice())
        .bind(challenge.identity_id.as_uuid())
        .bind(challenge.created_at)
        .bind(challenge.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn consume(&self, token_hash: &TokenDigest) -> RepoResult<Challenge> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            r#"
            DELETE FROM mfa_challenges
            WHERE token_hash = $1
            RETURNING token_hash, identity_id, created_at, expires_at
            "#,
        )
        .bind(token_hash.as_bytes().as_slice())
        .fetch_one(&self.pool)
        .await?;

        row.into_challenge()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> RepoResult<u64> {
        let deleted = sqlx::query("DELETE FROM mfa_challenges WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted)
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

fn digest_from_row(bytes: &[u8]) -> RepoResult<TokenDigest> {
    TokenDigest::from_bytes(bytes)
        .ok_or_else(|| RepositoryError::Backend(format!("token hash has {} bytes", bytes.len())))
}

#[derive(sqlx::FromRow)]
struct IdentityRow {
    id: Uuid,
    tenant_id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    role: i16,
    active: bool,
    two_factor_enabled: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl IdentityRow {
    fn into_identity(self) -> Identity {
        Identity {
            id: IdentityId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            email: Email::from_db(self.email),
            first_name: self.first_name,
            last_name: self.last_name,
            role: Role::from_id(self.role).unwrap_or_default(),
            active: self.active,
            two_factor_enabled: self.two_factor_enabled,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    identity_id: Uuid,
    password_hash: String,
    totp_secret: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CredentialRow {
    fn into_credential(self) -> RepoResult<Credential> {
        let password = StoredPassword::from_phc_string(self.password_hash)
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        let totp_secret = self
            .totp_secret
            .map(TotpSecret::from_base32)
            .transpose()
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        Ok(Credential {
            identity_id: IdentityId::from_uuid(self.identity_id),
            password,
            totp_secret,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    identity_id: Uuid,
    ip_address: Option<String>,
    user_agent: Option<String>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl SessionRow {
    fn into_session(self) -> Session {
        Session {
            id: SessionId::from_uuid(self.id),
            identity_id: IdentityId::from_uuid(self.identity_id),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
            last_active_at: self.last_active_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    token_hash: Vec<u8>,
    identity_id: Uuid,
    session_id: Option<Uuid>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked: bool,
}

impl RefreshTokenRow {
    fn into_refresh_token(self) -> RepoResult<RefreshToken> {
        Ok(RefreshToken {
            token_hash: digest_from_row(&self.token_hash)?,
            identity_id: IdentityId::from_uuid(self.identity_id),
            session_id: self.session_id.map(SessionId::from_uuid),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            revoked: self.revoked,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChallengeRow {
    token_hash: Vec<u8>,
    identity_id: Uuid,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl ChallengeRow {
    fn into_challenge(self) -> RepoResult<Challenge> {
        Ok(Challenge {
            token_hash: digest_from_row(&self.token_hash)?,
            identity_id: IdentityId::from_uuid(self.identity_id),
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}
