use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgExecutor, PgPool};
use std::fmt;
use uuid::Uuid;

/// Challenge - one outstanding phone verification attempt
///
/// Binds an owner, the phone number they claim, and the Argon2 digest of
/// the code we sent. The plaintext code is never stored.
#[derive(Clone, sqlx::FromRow)]
pub struct Challenge {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub claimed_phone: String,
    pub code_digest: String,
    pub expires_at: DateTime<Utc>,
    pub attempt_count: i32,
    pub created_at: DateTime<Utc>,
}

// Digest stays out of logs
impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Challenge")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("claimed_phone", &self.claimed_phone)
            .field("code_digest", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("attempt_count", &self.attempt_count)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Challenge {
    /// Build a fresh challenge that expires `ttl` after `now`
    pub fn new(
        owner_id: Uuid,
        claimed_phone: impl Into<String>,
        code_digest: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner_id,
            claimed_phone: claimed_phone.into(),
            code_digest,
            expires_at: now + ttl,
            attempt_count: 0,
            created_at: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn attempts_exhausted(&self, max_attempts: i32) -> bool {
        self.attempt_count >= max_attempts
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl Challenge {
    /// Delete every challenge for an owner
    pub async fn delete_for_owner<'e, E>(owner_id: Uuid, executor: E) -> Result<u64>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM phone_verifications WHERE owner_id = $1")
            .bind(owner_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Insert this challenge
    pub async fn insert<'e, E>(&self, executor: E) -> Result<()>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query(
            r#"
            INSERT INTO phone_verifications
                (id, owner_id, claimed_phone, code_digest, expires_at, attempt_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(self.id)
        .bind(self.owner_id)
        .bind(&self.claimed_phone)
        .bind(&self.code_digest)
        .bind(self.expires_at)
        .bind(self.attempt_count)
        .bind(self.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Find the most recently created challenge for an owner
    pub async fn find_latest_for_owner(owner_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let challenge = sqlx::query_as::<_, Challenge>(
            r#"
            SELECT * FROM phone_verifications
            WHERE owner_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(pool)
        .await?;
        Ok(challenge)
    }

    /// Overwrite the attempt counter
    pub async fn update_attempt_count(id: Uuid, attempt_count: i32, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE phone_verifications SET attempt_count = $2 WHERE id = $1")
            .bind(id)
            .bind(attempt_count)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete a challenge by ID
    pub async fn delete(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM phone_verifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete every challenge that expired before `now`
    pub async fn delete_expired(now: DateTime<Utc>, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query("DELETE FROM phone_verifications WHERE expires_at < $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
