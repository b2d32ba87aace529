//! Recommendation history log using SQLite

use crate::error::Result;
use crate::types::{HistoryId, HistoryRecord, NewHistoryRecord};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;

/// Append-only store of saved recommendations, one row per saved recipe
#[derive(Clone)]
pub struct HistoryStore {
    pool: SqlitePool,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("pool", &"<SqlitePool>")
            .finish()
    }
}

impl HistoryStore {
    /// Wrap an existing pool. Migrations are not run.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database file at `path` and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create an in-memory store for testing
    pub async fn connect_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .create_if_missing(true);

        // A single connection, otherwise every connection gets its own empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Get a reference to the SQLite pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert a new history row and return its id
    pub async fn append(&self, record: &NewHistoryRecord) -> Result<HistoryId> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_history (
                user_id, title, summary, created_at, cuisine, ingredients, ready_in_minutes
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.user_id)
        .bind(&record.title)
        .bind(&record.summary)
        .bind(record.created_at)
        .bind(&record.cuisine)
        .bind(&record.ingredients)
        .bind(record.ready_in_minutes)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All rows for `user_id`, in insertion order
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, summary, created_at, cuisine, ingredients, ready_in_minutes
            FROM user_history
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Every row, in insertion order
    pub async fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, title, summary, created_at, cuisine, ingredients, ready_in_minutes
            FROM user_history
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Close the pool; later calls fail with a database error.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_record(row: &SqliteRow) -> Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        created_at: row.try_get("created_at")?,
        cuisine: row.try_get("cuisine")?,
        ingredients: row.try_get("ingredients")?,
        ready_in_minutes: row.try_get("ready_in_minutes")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(user: &str, title: &str) -> NewHistoryRecord {
        NewHistoryRecord {
            user_id: user.to_string(),
            title: title.to_string(),
            summary: format!("{title} summary"),
            created_at: Utc::now(),
            cuisine: "Korean".to_string(),
            ingredients: "egg, rice".to_string(),
            ready_in_minutes: 20,
        }
    }

    #[tokio::test]
    async fn append_assigns_increasing_ids() {
        let store = HistoryStore::connect_in_memory().await.unwrap();
        let a = store.append(&record("demo", "Bibimbap")).await.unwrap();
        let b = store.append(&record("demo", "Japchae")).await.unwrap();
        assert!(b > a);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn list_by_user_filters_and_keeps_insertion_order() {
        let store = HistoryStore::connect_in_memory().await.unwrap();
        store.append(&record("demo", "First")).await.unwrap();
        store.append(&record("alice", "Other")).await.unwrap();
        store.append(&record("demo", "Second")).await.unwrap();

        let rows = store.list_by_user("demo").await.unwrap();
        let titles: Vec<_> = rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second"]);
        assert_eq!(rows[0].ingredients, "egg, rice");
        assert_eq!(rows[0].ready_in_minutes, 20);

        assert!(store.list_by_user("nobody").await.unwrap().is_empty());
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn rows_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cook_history.db");
        {
            let store = HistoryStore::open(&path).await.unwrap();
            store.append(&record("demo", "Kimchi Jjigae")).await.unwrap();
            store.close().await;
        }

        let store = HistoryStore::open(&path).await.unwrap();
        let rows = store.list_by_user("demo").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Kimchi Jjigae");
    }

    #[tokio::test]
    async fn closed_store_reports_storage_error() {
        let store = HistoryStore::connect_in_memory().await.unwrap();
        store.close().await;
        let err = store.append(&record("demo", "Late")).await.unwrap_err();
        assert!(err.is_storage());
    }
}
