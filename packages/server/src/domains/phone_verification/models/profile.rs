use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Profile - the owner's marketplace profile row
///
/// Owned by the profile service; this crate only writes the phone fields.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub phone: Option<String>,
    pub phone_verified: bool,
    pub phone_verified_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Find profile phone fields by owner ID
    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT id, phone, phone_verified, phone_verified_at FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Set the verified phone number for an owner
    ///
    /// Fails when no profile row exists, so a verification is never reported
    /// as complete without the write landing.
    pub async fn mark_phone_verified(
        id: Uuid,
        phone: &str,
        verified_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET phone = $2, phone_verified = true, phone_verified_at = $3
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(phone)
        .bind(verified_at)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            bail!("no profile row for owner {}", id);
        }
        Ok(())
    }
}
