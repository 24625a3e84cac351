//! Builders for throwaway event log and broadcast index databases

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

const EVENT_LOG_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pmd_inputs (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    input TEXT NOT NULL DEFAULT ''
);
"#;

const BROADCAST_INDEX_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS vods (
    id INTEGER PRIMARY KEY,
    recorded_at TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT '',
    length INTEGER NOT NULL
);
"#;

async fn create(path: &Path, schema: &str) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    sqlx::query(schema).execute(&pool).await.unwrap();
    pool
}

pub async fn create_event_log(path: &Path, rows: &[(i64, &str)]) {
    let pool = create(path, EVENT_LOG_SQL).await;
    for (id, date) in rows {
        sqlx::query("INSERT INTO pmd_inputs (id, date) VALUES (?, ?)")
            .bind(*id)
            .bind(*date)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;
}

pub async fn create_broadcast_index(path: &Path, rows: &[(i64, &str, i64)]) {
    let pool = create(path, BROADCAST_INDEX_SQL).await;
    for (id, recorded_at, length) in rows {
        sqlx::query("INSERT INTO vods (id, recorded_at, created_at, length) VALUES (?, ?, ?, ?)")
            .bind(*id)
            .bind(*recorded_at)
            .bind(*recorded_at)
            .bind(*length)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;
}
