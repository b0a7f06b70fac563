use divvy_core::Money;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use uuid::Uuid;

pub type DbPool = Pool<Sqlite>;

/// A stored receipt: created once on upload-and-confirm, immutable afterwards
/// except for `update_receipt_split`, which rewrites the split and its total
/// together so they can never disagree.
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptRecord {
    pub id: String,
    pub title: String,
    pub total_amount_cents: i64,
    pub raw_text: String,
    /// JSON object: person → share.
    pub split_between_people: String,
    pub created_at: String,
}

impl ReceiptRecord {
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS receipts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            total_amount_cents INTEGER NOT NULL CHECK (total_amount_cents >= 0),
            raw_text TEXT NOT NULL,
            split_between_people TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_receipt(
    pool: &DbPool,
    title: &str,
    total_amount_cents: i64,
    raw_text: &str,
    split_between_people: &str,
) -> Result<ReceiptRecord, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    let row = sqlx::query_as::<_, (String, String, i64, String, String, String)>(
        "INSERT INTO receipts (id, title, total_amount_cents, raw_text, split_between_people) \
         VALUES (?, ?, ?, ?, ?) \
         RETURNING id, title, total_amount_cents, raw_text, split_between_people, created_at",
    )
    .bind(&id)
    .bind(title)
    .bind(total_amount_cents)
    .bind(raw_text)
    .bind(split_between_people)
    .fetch_one(pool)
    .await?;

    Ok(record_from_row(row))
}

pub async fn get_receipt_by_id(
    pool: &DbPool,
    id: &str,
) -> Result<Option<ReceiptRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, String, i64, String, String, String)>(
        "SELECT id, title, total_amount_cents, raw_text, split_between_people, created_at \
         FROM receipts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(record_from_row))
}

/// All receipts, newest first.
pub async fn get_all_receipts(pool: &DbPool) -> Result<Vec<ReceiptRecord>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (String, String, i64, String, String, String)>(
        "SELECT id, title, total_amount_cents, raw_text, split_between_people, created_at \
         FROM receipts ORDER BY created_at DESC, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(record_from_row).collect())
}

/// Recompute-and-store: the split and the total it was computed from are
/// written in one statement.
pub async fn update_receipt_split(
    pool: &DbPool,
    id: &str,
    total_amount_cents: i64,
    split_between_people: &str,
) -> Result<Option<ReceiptRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, (String, String, i64, String, String, String)>(
        "UPDATE receipts SET total_amount_cents = ?, split_between_people = ? WHERE id = ? \
         RETURNING id, title, total_amount_cents, raw_text, split_between_people, created_at",
    )
    .bind(total_amount_cents)
    .bind(split_between_people)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(record_from_row))
}

fn record_from_row(row: (String, String, i64, String, String, String)) -> ReceiptRecord {
    ReceiptRecord {
        id: row.0,
        title: row.1,
        total_amount_cents: row.2,
        raw_text: row.3,
        split_between_people: row.4,
        created_at: row.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("divvy.db")).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn insert_and_fetch_roundtrip() {
        let (_dir, pool) = test_db().await;

        let inserted = insert_receipt(
            &pool,
            "Groceries",
            2857,
            "WALMART\nTOTAL 28.57",
            r#"{"alice":"14.29","bob":"14.28"}"#,
        )
        .await
        .unwrap();

        assert_eq!(inserted.title, "Groceries");
        assert_eq!(inserted.total_amount(), Money::from_cents(2857));
        assert!(!inserted.created_at.is_empty());

        let fetched = get_receipt_by_id(&pool, &inserted.id).await.unwrap().unwrap();
        assert_eq!(fetched.raw_text, "WALMART\nTOTAL 28.57");
        assert_eq!(fetched.split_between_people, inserted.split_between_people);
    }

    #[tokio::test]
    async fn missing_receipt_is_none() {
        let (_dir, pool) = test_db().await;
        assert!(get_receipt_by_id(&pool, "no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_all_rows() {
        let (_dir, pool) = test_db().await;

        insert_receipt(&pool, "First", 100, "a", "{}").await.unwrap();
        insert_receipt(&pool, "Second", 200, "b", "{}").await.unwrap();

        let all = get_all_receipts(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn update_split_rewrites_total_and_split_together() {
        let (_dir, pool) = test_db().await;

        let receipt = insert_receipt(&pool, "Dinner", 1000, "text", r#"{"a":"10.00"}"#)
            .await
            .unwrap();

        let updated = update_receipt_split(&pool, &receipt.id, 1000, r#"{"a":"5.00","b":"5.00"}"#)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.id, receipt.id);
        assert!(updated.split_between_people.contains("\"b\""));
        // Everything else untouched.
        assert_eq!(updated.title, "Dinner");
        assert_eq!(updated.raw_text, "text");
    }

    #[tokio::test]
    async fn update_split_on_missing_receipt_is_none() {
        let (_dir, pool) = test_db().await;
        let result = update_receipt_split(&pool, "ghost", 0, "{}").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn negative_total_is_rejected_by_schema() {
        let (_dir, pool) = test_db().await;
        let result = insert_receipt(&pool, "Bad", -1, "text", "{}").await;
        assert!(result.is_err());
    }
}
