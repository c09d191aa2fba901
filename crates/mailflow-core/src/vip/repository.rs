//! VIP contact storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{VipContact, VipTier};
use crate::{Error, Result};

/// Repository for the persisted VIP contact set.
pub struct VipRepository {
    pool: SqlitePool,
}

impl VipRepository {
    /// Create a new repository with the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Create an in-memory repository for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let repo = Self { pool };
        repo.initialize().await?;
        Ok(repo)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS vip_contacts (
                email_or_pattern TEXT PRIMARY KEY,
                display_name TEXT,
                tier INTEGER NOT NULL DEFAULT 3,
                auto_draft INTEGER NOT NULL DEFAULT 0,
                sla_hours REAL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or update a VIP contact, keyed by address/pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn upsert(&self, contact: &VipContact) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO vip_contacts (email_or_pattern, display_name, tier, auto_draft, sla_hours)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email_or_pattern) DO UPDATE SET
                display_name = excluded.display_name,
                tier = excluded.tier,
                auto_draft = excluded.auto_draft,
                sla_hours = excluded.sla_hours,
                updated_at = CURRENT_TIMESTAMP
            ",
        )
        .bind(contact.email_or_pattern.to_lowercase())
        .bind(&contact.display_name)
        .bind(i32::from(contact.tier.get()))
        .bind(i32::from(contact.auto_draft))
        .bind(contact.sla_hours.map(f64::from))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a contact by exact address/pattern key.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, email_or_pattern: &str) -> Result<Option<VipContact>> {
        let row = sqlx::query(
            r"
            SELECT email_or_pattern, display_name, tier, auto_draft, sla_hours
            FROM vip_contacts
            WHERE email_or_pattern = ?
            ",
        )
        .bind(email_or_pattern.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| row_to_contact(&r)))
    }

    /// List every VIP contact, highest tier (lowest number) first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<VipContact>> {
        let rows = sqlx::query(
            r"
            SELECT email_or_pattern, display_name, tier, auto_draft, sla_hours
            FROM vip_contacts
            ORDER BY tier ASC, email_or_pattern ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_contact).collect())
    }

    /// Remove a VIP contact.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no contact has that key, or an error if
    /// the database operation fails.
    pub async fn delete(&self, email_or_pattern: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM vip_contacts WHERE email_or_pattern = ?")
            .bind(email_or_pattern.to_lowercase())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("VIP contact", email_or_pattern));
        }
        Ok(())
    }
}

/// Convert a database row to a `VipContact`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_contact(row: &sqlx::sqlite::SqliteRow) -> VipContact {
    VipContact {
        email_or_pattern: row.get("email_or_pattern"),
        display_name: row.get("display_name"),
        tier: VipTier::new(row.get::<i64, _>("tier") as u8),
        auto_draft: row.get::<i64, _>("auto_draft") != 0,
        sla_hours: row.get::<Option<f64>, _>("sla_hours").map(|h| h as f32),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_and_get() {
        let repo = VipRepository::in_memory().await.unwrap();

        let contact = VipContact::new("Boss@Corp.com", VipTier::ONE)
            .with_display_name("The Boss")
            .with_sla_hours(2.0);
        repo.upsert(&contact).await.unwrap();

        let found = repo.get("boss@corp.com").await.unwrap().unwrap();
        assert_eq!(found.tier, VipTier::ONE);
        assert_eq!(found.sla_hours, Some(2.0));
        assert_eq!(found.display_name, Some("The Boss".to_string()));
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let repo = VipRepository::in_memory().await.unwrap();

        repo.upsert(&VipContact::new("a@b.com", VipTier::THREE))
            .await
            .unwrap();
        repo.upsert(&VipContact::new("a@b.com", VipTier::ONE))
            .await
            .unwrap();

        let found = repo.get("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.tier, VipTier::ONE);
    }

    #[tokio::test]
    async fn test_list_ordered_by_tier() {
        let repo = VipRepository::in_memory().await.unwrap();

        repo.upsert(&VipContact::new("low@x.com", VipTier::THREE))
            .await
            .unwrap();
        repo.upsert(&VipContact::new("top@x.com", VipTier::ONE))
            .await
            .unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email_or_pattern, "top@x.com");
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let repo = VipRepository::in_memory().await.unwrap();
        assert!(matches!(
            repo.delete("ghost@x.com").await.unwrap_err(),
            Error::NotFound { .. }
        ));
    }
}
