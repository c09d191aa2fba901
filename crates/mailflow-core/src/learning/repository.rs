//! Learning storage: confirmed examples, append-only feedback log, and
//! rolling per-category accuracy counters.

use std::collections::BTreeMap;

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::model::{ClassificationFeedback, LearningExample, LearningStatistics};
use crate::Result;

/// Repository for learning data.
///
/// The feedback log is append-only; statistics are folded from it and
/// the counters on read, keeping the write path a single insert.
pub struct LearningRepository {
    pool: SqlitePool,
}

impl LearningRepository {
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
            CREATE TABLE IF NOT EXISTS learning_examples (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                subject TEXT NOT NULL,
                from_address TEXT NOT NULL,
                category TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS feedback_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email_id TEXT NOT NULL,
                feedback_type TEXT NOT NULL,
                correct_value TEXT,
                user_action TEXT,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS category_stats (
                category TEXT PRIMARY KEY,
                total INTEGER NOT NULL DEFAULT 0,
                correct INTEGER NOT NULL DEFAULT 0
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a confirmed example for similarity lookups.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn add_example(&self, subject: &str, from: &str, category: &str) -> Result<i64> {
        let result = sqlx::query(
            r"
            INSERT INTO learning_examples (subject, from_address, category)
            VALUES (?, ?, ?)
            ",
        )
        .bind(subject)
        .bind(from.to_lowercase())
        .bind(category)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// The most recently stored examples, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recent_examples(&self, limit: u32) -> Result<Vec<LearningExample>> {
        let rows = sqlx::query(
            r"
            SELECT id, subject, from_address, category
            FROM learning_examples
            ORDER BY id DESC
            LIMIT ?
            ",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LearningExample {
                id: Some(row.get("id")),
                subject: row.get("subject"),
                from: row.get("from_address"),
                category: row.get("category"),
            })
            .collect())
    }

    /// Append a feedback event. The log is never updated in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn append_feedback(&self, feedback: &ClassificationFeedback) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO feedback_log (email_id, feedback_type, correct_value, user_action, created_at)
            VALUES (?, ?, ?, ?, ?)
            ",
        )
        .bind(&feedback.email_id)
        .bind(feedback.feedback_type.as_str())
        .bind(&feedback.correct_value)
        .bind(&feedback.user_action)
        .bind(feedback.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Bump the rolling accuracy counter for a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn bump_category(&self, category: &str, correct: bool) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO category_stats (category, total, correct)
            VALUES (?, 1, ?)
            ON CONFLICT(category) DO UPDATE SET
                total = total + 1,
                correct = correct + excluded.correct
            ",
        )
        .bind(category)
        .bind(i32::from(correct))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Accuracy for one category as (total, correct), if any feedback
    /// has been recorded for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn accuracy_for_category(&self, category: &str) -> Result<Option<(u64, u64)>> {
        let row = sqlx::query(
            r"
            SELECT total, correct FROM category_stats WHERE category = ?
            ",
        )
        .bind(category)
        .fetch_optional(&self.pool)
        .await?;

        #[allow(clippy::cast_sign_loss)]
        Ok(row.map(|r| (r.get::<i64, _>("total") as u64, r.get::<i64, _>("correct") as u64)))
    }

    /// Fold the ledger into aggregate statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    #[allow(clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub async fn statistics(&self) -> Result<LearningStatistics> {
        let row = sqlx::query(
            r"
            SELECT
                (SELECT COUNT(*) FROM learning_examples) as total_examples,
                (SELECT COUNT(DISTINCT category) FROM learning_examples) as category_count,
                (SELECT COALESCE(SUM(total), 0) FROM category_stats) as feedback_total,
                (SELECT COALESCE(SUM(correct), 0) FROM category_stats) as feedback_correct
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        let feedback_total: i64 = row.get("feedback_total");
        let feedback_correct: i64 = row.get("feedback_correct");
        let overall_accuracy_pct = if feedback_total > 0 {
            (feedback_correct as f32 / feedback_total as f32) * 100.0
        } else {
            0.0
        };

        let histogram_rows = sqlx::query(
            r"
            SELECT feedback_type, COUNT(*) as n
            FROM feedback_log
            GROUP BY feedback_type
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut feedback_histogram = BTreeMap::new();
        for r in &histogram_rows {
            feedback_histogram.insert(r.get::<String, _>("feedback_type"), r.get::<i64, _>("n") as u64);
        }

        Ok(LearningStatistics {
            total_examples: row.get::<i64, _>("total_examples") as u64,
            overall_accuracy_pct,
            category_count: row.get::<i64, _>("category_count") as u64,
            feedback_histogram,
        })
    }
}
