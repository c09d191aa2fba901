//! Rule storage repository.

use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::warn;

use super::model::{Rule, RuleAction, RuleCondition};
use crate::{Error, Result};

/// Repository for user-defined rule storage.
pub struct RuleRepository {
    pool: SqlitePool,
}

impl RuleRepository {
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
            CREATE TABLE IF NOT EXISTS rules (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                precedence INTEGER NOT NULL DEFAULT 0,
                conditions TEXT NOT NULL,
                actions TEXT NOT NULL,
                enabled INTEGER NOT NULL DEFAULT 1,
                confidence REAL NOT NULL DEFAULT 0.5,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE INDEX IF NOT EXISTS idx_rules_enabled
            ON rules(enabled, precedence)
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a rule and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed rule, or an error if
    /// the database operation fails.
    pub async fn insert(&self, rule: &Rule) -> Result<i64> {
        if !rule.is_well_formed() {
            return Err(Error::Validation(format!(
                "rule '{}' must have at least one condition with a non-empty value",
                rule.name
            )));
        }

        let result = sqlx::query(
            r"
            INSERT INTO rules (name, precedence, conditions, actions, enabled, confidence)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&rule.name)
        .bind(rule.precedence)
        .bind(serde_json::to_string(&rule.conditions)?)
        .bind(serde_json::to_string(&rule.actions)?)
        .bind(i32::from(rule.enabled))
        .bind(f64::from(rule.confidence.clamp(0.0, 1.0)))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a rule by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: i64) -> Result<Option<Rule>> {
        let row = sqlx::query(
            r"
            SELECT id, name, precedence, conditions, actions, enabled, confidence
            FROM rules
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().and_then(row_to_rule))
    }

    /// List all enabled rules, highest precedence first.
    ///
    /// A stored rule whose conditions or actions fail to deserialize is
    /// skipped with a log entry rather than failing the whole listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_enabled(&self) -> Result<Vec<Rule>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, precedence, conditions, actions, enabled, confidence
            FROM rules
            WHERE enabled = 1
            ORDER BY precedence DESC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_rule).collect())
    }

    /// List every rule, enabled or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_all(&self) -> Result<Vec<Rule>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, precedence, conditions, actions, enabled, confidence
            FROM rules
            ORDER BY precedence DESC, id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(row_to_rule).collect())
    }

    /// Update an existing rule in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the rule id is absent or unknown, or an
    /// error if the database operation fails.
    pub async fn update(&self, rule: &Rule) -> Result<()> {
        let id = rule
            .id
            .ok_or_else(|| Error::not_found("rule", "unsaved"))?;

        let result = sqlx::query(
            r"
            UPDATE rules
            SET name = ?, precedence = ?, conditions = ?, actions = ?,
                enabled = ?, confidence = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            ",
        )
        .bind(&rule.name)
        .bind(rule.precedence)
        .bind(serde_json::to_string(&rule.conditions)?)
        .bind(serde_json::to_string(&rule.actions)?)
        .bind(i32::from(rule.enabled))
        .bind(f64::from(rule.confidence.clamp(0.0, 1.0)))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("rule", id));
        }
        Ok(())
    }

    /// Enable or disable a rule.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the rule id is unknown, or an error if the
    /// database operation fails.
    pub async fn set_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE rules
            SET enabled = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            ",
        )
        .bind(i32::from(enabled))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("rule", id));
        }
        Ok(())
    }

    /// Delete a rule.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the rule id is unknown, or an error if the
    /// database operation fails.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM rules WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("rule", id));
        }
        Ok(())
    }
}

/// Convert a database row to a `Rule`, skipping rows with undecodable
/// condition/action payloads.
fn row_to_rule(row: &sqlx::sqlite::SqliteRow) -> Option<Rule> {
    let conditions_json: String = row.get("conditions");
    let actions_json: String = row.get("actions");

    let conditions: Vec<RuleCondition> = match serde_json::from_str(&conditions_json) {
        Ok(c) => c,
        Err(e) => {
            warn!(rule_id = row.get::<i64, _>("id"), "undecodable rule conditions: {e}");
            return None;
        }
    };
    let actions: Vec<RuleAction> = match serde_json::from_str(&actions_json) {
        Ok(a) => a,
        Err(e) => {
            warn!(rule_id = row.get::<i64, _>("id"), "undecodable rule actions: {e}");
            return None;
        }
    };

    #[allow(clippy::cast_possible_truncation)]
    Some(Rule {
        id: Some(row.get("id")),
        name: row.get("name"),
        precedence: row.get("precedence"),
        conditions,
        actions,
        enabled: row.get::<i64, _>("enabled") != 0,
        confidence: (row.get::<f64, _>("confidence") as f32).clamp(0.0, 1.0),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rules::model::{ConditionField, ConditionOperator};

    fn sample_rule(name: &str, precedence: i32) -> Rule {
        Rule::new(name, precedence, 0.8)
            .with_condition(RuleCondition::new(
                ConditionField::Subject,
                ConditionOperator::Contains,
                "invoice",
            ))
            .with_action(RuleAction::Label("finance".to_string()))
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = RuleRepository::in_memory().await.unwrap();

        let id = repo.insert(&sample_rule("finance", 10)).await.unwrap();
        let rule = repo.get(id).await.unwrap().unwrap();

        assert_eq!(rule.name, "finance");
        assert_eq!(rule.precedence, 10);
        assert_eq!(rule.conditions.len(), 1);
        assert_eq!(rule.actions, vec![RuleAction::Label("finance".to_string())]);
        assert!(rule.enabled);
    }

    #[tokio::test]
    async fn test_insert_rejects_malformed() {
        let repo = RuleRepository::in_memory().await.unwrap();

        let err = repo.insert(&Rule::new("empty", 0, 0.5)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_enabled_ordering() {
        let repo = RuleRepository::in_memory().await.unwrap();

        repo.insert(&sample_rule("low", 1)).await.unwrap();
        repo.insert(&sample_rule("high", 100)).await.unwrap();
        let disabled_id = repo.insert(&sample_rule("off", 50)).await.unwrap();
        repo.set_enabled(disabled_id, false).await.unwrap();

        let rules = repo.list_enabled().await.unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "high");
        assert_eq!(rules[1].name, "low");
    }

    #[tokio::test]
    async fn test_update_unknown_is_not_found() {
        let repo = RuleRepository::in_memory().await.unwrap();

        let mut rule = sample_rule("ghost", 1);
        rule.id = Some(999);
        let err = repo.update(&rule).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let repo = RuleRepository::in_memory().await.unwrap();

        let id = repo.insert(&sample_rule("gone", 1)).await.unwrap();
        repo.delete(id).await.unwrap();
        assert!(repo.get(id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(id).await.unwrap_err(),
            Error::NotFound { .. }
        ));
    }
}
