//! Follow-up item storage repository.
//!
//! Every mutation is an independent single-record write; there are no
//! multi-row transactions, so a crash mid-batch leaves a valid,
//! partially updated queue rather than a torn one.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

use super::model::{FollowUpItem, FollowUpReason, ItemStatus, QueueFilter};
use crate::classify::Priority;
use crate::sla::SlaStatus;
use crate::{Error, Result};

/// Repository for follow-up queue storage.
pub struct QueueRepository {
    pool: SqlitePool,
}

impl QueueRepository {
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
            CREATE TABLE IF NOT EXISTS follow_up_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id TEXT NOT NULL,
                thread_id TEXT NOT NULL DEFAULT '',
                subject TEXT NOT NULL DEFAULT '',
                from_address TEXT NOT NULL DEFAULT '',
                to_addresses TEXT NOT NULL DEFAULT '[]',
                received_date TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'medium',
                category TEXT NOT NULL DEFAULT '',
                labels TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'pending',
                reason TEXT NOT NULL DEFAULT 'requires_action',
                sla_deadline TEXT,
                sla_status TEXT,
                snoozed_until TEXT,
                snooze_count INTEGER NOT NULL DEFAULT 0,
                action_count INTEGER NOT NULL DEFAULT 0,
                last_action_date TEXT,
                ai_reasoning TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_items_status
            ON follow_up_items(status)
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_items_snoozed_until
            ON follow_up_items(snoozed_until) WHERE status = 'snoozed'
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_items_email_id
            ON follow_up_items(email_id)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert an item and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert(&self, item: &FollowUpItem) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO follow_up_items
                (email_id, thread_id, subject, from_address, to_addresses, received_date,
                 priority, category, labels, status, reason, sla_deadline, sla_status,
                 snoozed_until, snooze_count, action_count, last_action_date, ai_reasoning)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&item.email_id)
        .bind(&item.thread_id)
        .bind(&item.subject)
        .bind(&item.from)
        .bind(serde_json::to_string(&item.to)?)
        .bind(item.received_date.to_rfc3339())
        .bind(item.priority.as_str())
        .bind(&item.category)
        .bind(serde_json::to_string(&item.labels)?)
        .bind(item.status.as_str())
        .bind(item.reason.as_str())
        .bind(item.sla_deadline.map(|t| t.to_rfc3339()))
        .bind(item.sla_status.map(|s| s.as_str()))
        .bind(item.snoozed_until.map(|t| t.to_rfc3339()))
        .bind(item.snooze_count)
        .bind(item.action_count)
        .bind(item.last_action_date.map(|t| t.to_rfc3339()))
        .bind(&item.ai_reasoning)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get an item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: i64) -> Result<Option<FollowUpItem>> {
        let row = sqlx::query("SELECT * FROM follow_up_items WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_item))
    }

    /// Get the most recent item for a message id, if any. Lets callers
    /// de-duplicate admissions by message.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email_id(&self, email_id: &str) -> Result<Option<FollowUpItem>> {
        let row = sqlx::query(
            r"
            SELECT * FROM follow_up_items
            WHERE email_id = ?
            ORDER BY id DESC
            LIMIT 1
            ",
        )
        .bind(email_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_item))
    }

    /// Write an item back in full, keyed by its id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is absent or unknown, or an error
    /// if the database operation fails.
    pub async fn update(&self, item: &FollowUpItem) -> Result<()> {
        let id = item.id.ok_or_else(|| Error::not_found("item", "unsaved"))?;

        let result = sqlx::query(
            r"
            UPDATE follow_up_items
            SET thread_id = ?, subject = ?, from_address = ?, to_addresses = ?,
                received_date = ?, priority = ?, category = ?, labels = ?, status = ?,
                reason = ?, sla_deadline = ?, sla_status = ?, snoozed_until = ?,
                snooze_count = ?, action_count = ?, last_action_date = ?, ai_reasoning = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            ",
        )
        .bind(&item.thread_id)
        .bind(&item.subject)
        .bind(&item.from)
        .bind(serde_json::to_string(&item.to)?)
        .bind(item.received_date.to_rfc3339())
        .bind(item.priority.as_str())
        .bind(&item.category)
        .bind(serde_json::to_string(&item.labels)?)
        .bind(item.status.as_str())
        .bind(item.reason.as_str())
        .bind(item.sla_deadline.map(|t| t.to_rfc3339()))
        .bind(item.sla_status.map(|s| s.as_str()))
        .bind(item.snoozed_until.map(|t| t.to_rfc3339()))
        .bind(item.snooze_count)
        .bind(item.action_count)
        .bind(item.last_action_date.map(|t| t.to_rfc3339()))
        .bind(&item.ai_reasoning)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("item", id));
        }
        Ok(())
    }

    /// Update only the stored SLA status of an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown, or an error if the
    /// database operation fails.
    pub async fn set_sla_status(&self, id: i64, status: SlaStatus) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE follow_up_items
            SET sla_status = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            ",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("item", id));
        }
        Ok(())
    }

    /// List non-terminal items matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active(&self, filter: &QueueFilter) -> Result<Vec<FollowUpItem>> {
        let mut sql = String::from(
            "SELECT * FROM follow_up_items WHERE status NOT IN ('completed', 'archived')",
        );
        if filter.status.is_some() {
            sql.push_str(" AND status = ?");
        }
        if filter.priority.is_some() {
            sql.push_str(" AND priority = ?");
        }
        sql.push_str(" ORDER BY received_date DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            query = query.bind(priority.as_str());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Pending/processing items that carry an SLA deadline, for the
    /// overdue sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_active_with_deadline(&self) -> Result<Vec<FollowUpItem>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM follow_up_items
            WHERE status IN ('pending', 'processing') AND sla_deadline IS NOT NULL
            ORDER BY sla_deadline ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Snoozed items whose resurface time has passed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn due_snoozed(&self, now: DateTime<Utc>) -> Result<Vec<FollowUpItem>> {
        let rows = sqlx::query(
            r"
            SELECT * FROM follow_up_items
            WHERE status = 'snoozed' AND snoozed_until IS NOT NULL AND snoozed_until <= ?
            ORDER BY snoozed_until ASC
            ",
        )
        .bind(now.to_rfc3339())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Every item, for statistics folding.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> Result<Vec<FollowUpItem>> {
        let rows = sqlx::query("SELECT * FROM follow_up_items ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(row_to_item).collect())
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id is unknown, or an error if the
    /// database operation fails.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM follow_up_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("item", id));
        }
        Ok(())
    }
}

/// Parse an optional RFC 3339 column, logging and dropping bad values.
fn parse_ts(value: Option<String>) -> Option<DateTime<Utc>> {
    let raw = value?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            warn!("undecodable timestamp {raw:?}: {e}");
            None
        }
    }
}

/// Convert a database row to a `FollowUpItem`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> FollowUpItem {
    let to: Vec<String> =
        serde_json::from_str(&row.get::<String, _>("to_addresses")).unwrap_or_default();
    let labels: BTreeSet<String> =
        serde_json::from_str(&row.get::<String, _>("labels")).unwrap_or_default();

    FollowUpItem {
        id: Some(row.get("id")),
        email_id: row.get("email_id"),
        thread_id: row.get("thread_id"),
        subject: row.get("subject"),
        from: row.get("from_address"),
        to,
        received_date: parse_ts(Some(row.get("received_date"))).unwrap_or_else(Utc::now),
        priority: Priority::parse(row.get("priority")),
        category: row.get("category"),
        labels,
        status: ItemStatus::parse(row.get("status")),
        reason: FollowUpReason::parse(row.get("reason")),
        sla_deadline: parse_ts(row.get("sla_deadline")),
        sla_status: row
            .get::<Option<String>, _>("sla_status")
            .as_deref()
            .and_then(SlaStatus::parse),
        snoozed_until: parse_ts(row.get("snoozed_until")),
        snooze_count: row.get::<i64, _>("snooze_count") as u32,
        action_count: row.get::<i64, _>("action_count") as u32,
        last_action_date: parse_ts(row.get("last_action_date")),
        ai_reasoning: row.get("ai_reasoning"),
    }
}
