//! SQLite-backed [`Store`] implementation.
//!
//! Vectors live in `context_vectors`, keyed by the file row id, and are
//! searched by brute-force cosine distance. The dimension recorded in
//! `vector_meta` by [`Store::reset`] is enforced on every write and query.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use codesearch_core::embedding::{cosine_distance, decode_vector, encode_vector};
use codesearch_core::models::{IndexedFile, Project, SearchResult};
use codesearch_core::store::Store;
use codesearch_core::CodesearchError;

/// SQLite implementation of the [`Store`] trait.
///
/// One instance wraps the pool of a single project database.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn dims(&self) -> Result<Option<usize>> {
        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM vector_meta WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(dims.map(|d| d as usize))
    }
}

fn check_dims(dims: Option<i64>, actual: usize) -> Result<()> {
    match dims {
        Some(expected) if expected as usize == actual => Ok(()),
        Some(expected) => Err(CodesearchError::DimensionMismatch {
            expected: expected as usize,
            actual,
        }
        .into()),
        None => anyhow::bail!("vector index is not initialised; run a build first"),
    }
}

fn join_extensions(extensions: &[String]) -> String {
    extensions.join(",")
}

fn split_extensions(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .collect()
}

async fn delete_pair(tx: &mut Transaction<'_, Sqlite>, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM context_vectors WHERE file_id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projects (alias, path, client, model, extensions)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(alias) DO UPDATE SET
                path = excluded.path,
                client = excluded.client,
                model = excluded.model,
                extensions = excluded.extensions
            "#,
        )
        .bind(&project.alias)
        .bind(&project.root_path)
        .bind(&project.provider)
        .bind(&project.model)
        .bind(join_extensions(&project.extensions))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_project(&self, alias: &str) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT alias, path, client, model, extensions FROM projects WHERE alias = ?",
        )
        .bind(alias)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let extensions: String = row.get("extensions");
            Project {
                alias: row.get("alias"),
                root_path: row.get("path"),
                provider: row.get("client"),
                model: row.get("model"),
                extensions: split_extensions(&extensions),
            }
        }))
    }

    async fn reset(&self, dims: usize) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM context_vectors")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files").execute(&mut *tx).await?;
        sqlx::query(
            r#"
            INSERT INTO vector_meta (id, dims) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET dims = excluded.dims
            "#,
        )
        .bind(dims as i64)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_files(&self) -> Result<Vec<IndexedFile>> {
        let rows = sqlx::query("SELECT id, file, created_at FROM files ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| IndexedFile {
                id: row.get("id"),
                path: row.get("file"),
                created_at: row.get("created_at"),
            })
            .collect())
    }

    async fn file_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn replace_file(&self, old_id: Option<i64>, path: &str, vector: &[f32]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let dims: Option<i64> = sqlx::query_scalar("SELECT dims FROM vector_meta WHERE id = 1")
            .fetch_optional(&mut *tx)
            .await?;
        check_dims(dims, vector.len())?;

        if let Some(old) = old_id {
            delete_pair(&mut tx, old).await?;
        }

        let created_at = chrono::Utc::now().timestamp_millis();
        let id = sqlx::query("INSERT INTO files (file, created_at) VALUES (?, ?)")
            .bind(path)
            .bind(created_at)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        sqlx::query("INSERT INTO context_vectors (file_id, embedding) VALUES (?, ?)")
            .bind(id)
            .bind(encode_vector(vector))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn delete_file(&self, id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        delete_pair(&mut tx, id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn knn(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let dims = match self.dims().await? {
            Some(dims) => dims,
            None => return Ok(Vec::new()),
        };
        check_dims(Some(dims as i64), query.len())?;

        let rows = sqlx::query(
            r#"
            SELECT f.id, f.file, v.embedding
            FROM files f
            JOIN context_vectors v ON v.file_id = f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.get("id");
            let blob: Vec<u8> = row.get("embedding");
            let vector = decode_vector(&blob)?;
            if vector.len() != dims {
                anyhow::bail!(
                    "stored vector for file id {} has {} dimensions, index has {}",
                    id,
                    vector.len(),
                    dims
                );
            }
            hits.push(SearchResult {
                id,
                path: row.get("file"),
                distance: cosine_distance(query, &vector),
            });
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }
}
