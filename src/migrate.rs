use anyhow::Result;
use sqlx::SqlitePool;

/// Create the project schema. Safe to run on every open.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // File rows; ids are never reused
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file TEXT NOT NULL,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One vector per file row, little-endian f32 blob
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS context_vectors (
            file_id INTEGER PRIMARY KEY,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Index dimension, fixed by each rebuild
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vector_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            dims INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            alias TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            client TEXT NOT NULL,
            model TEXT NOT NULL,
            extensions TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_created_at ON files(created_at, id)")
        .execute(pool)
        .await?;

    Ok(())
}
