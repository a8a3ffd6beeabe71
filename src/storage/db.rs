use anyhow::Result;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

// The database URL for the production database
const DATABASE_URL: &str = "sqlite:chore_tracker.db";

/// DbConnection manages the SQLite pool and owns schema bootstrap.
///
/// Schema setup happens exactly once, explicitly, when the connection is
/// constructed at process start. There is no lazy "already initialized" flag;
/// a `DbConnection` in hand means the schema exists.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection and bootstrap the schema.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePool::connect_with(options).await?;

        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize the standard database
    pub async fn init() -> Result<Self> {
        Self::new(DATABASE_URL).await
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Unique shared-cache in-memory database per test
        let test_id = uuid::Uuid::new_v4().simple().to_string();
        let db_url = format!("sqlite:file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Set up the required database schema.
    ///
    /// All ownership hangs off `children`: deleting a child cascades to its
    /// assignments, transactions, claims, cash-out requests, proposals and
    /// savings goals.
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS children (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                avatar TEXT NOT NULL DEFAULT '',
                balance REAL NOT NULL DEFAULT 0,
                allowance_amount REAL NOT NULL DEFAULT 0,
                allowance_frequency TEXT NOT NULL DEFAULT 'none',
                allowance_start_date TEXT,
                last_allowance_date TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chores (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                value REAL NOT NULL DEFAULT 0,
                frequency TEXT NOT NULL DEFAULT 'one-off',
                day_of_week INTEGER,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chore_assignments (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                chore_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                due_date TEXT,
                end_date TEXT,
                recurrence_source_id TEXT,
                completed_at TEXT,
                approved_at TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (child_id) REFERENCES children(id) ON DELETE CASCADE,
                FOREIGN KEY (chore_id) REFERENCES chores(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                amount REAL NOT NULL,
                type TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (child_id) REFERENCES children(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rewards (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                cost REAL NOT NULL,
                icon TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reward_claims (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                reward_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (child_id) REFERENCES children(id) ON DELETE CASCADE,
                FOREIGN KEY (reward_id) REFERENCES rewards(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cash_out_requests (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                amount REAL NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                resolved_at TEXT,
                FOREIGN KEY (child_id) REFERENCES children(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chore_proposals (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                requested_value REAL NOT NULL,
                admin_value REAL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (child_id) REFERENCES children(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS savings_goals (
                id TEXT PRIMARY KEY,
                child_id TEXT NOT NULL,
                title TEXT NOT NULL,
                target_amount REAL NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (child_id) REFERENCES children(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Hot paths: per-child transaction history and per-child streak grouping
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_child_created
            ON transactions(child_id, created_at DESC);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_assignments_child_due
            ON chore_assignments(child_id, due_date);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_bootstrap_is_idempotent() {
        let db = DbConnection::init_test().await.expect("init test db");

        // Running setup again against the same pool must not fail
        DbConnection::setup_schema(db.pool())
            .await
            .expect("second bootstrap");
    }

    #[tokio::test]
    async fn test_foreign_keys_cascade_from_children() {
        let db = DbConnection::init_test().await.expect("init test db");

        sqlx::query("INSERT INTO children (id, name) VALUES ('c1', 'Emma')")
            .execute(db.pool())
            .await
            .expect("insert child");
        sqlx::query(
            "INSERT INTO transactions (id, child_id, amount, type) VALUES ('t1', 'c1', 5.0, 'earn')",
        )
        .execute(db.pool())
        .await
        .expect("insert transaction");

        sqlx::query("DELETE FROM children WHERE id = 'c1'")
            .execute(db.pool())
            .await
            .expect("delete child");

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(db.pool())
            .await
            .expect("count transactions");
        assert_eq!(remaining, 0, "transactions should cascade with the child");
    }
}
