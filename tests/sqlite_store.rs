//! Integration tests for the SQLite store against a temporary database.

use codesearch::config::Config;
use codesearch::db;
use codesearch::sqlite_store::SqliteStore;
use codesearch_core::search::{rank, RankOptions};
use codesearch_core::store::Store;
use codesearch_core::{CodesearchError, Project};
use tempfile::TempDir;

fn config_in(tmp: &TempDir) -> Config {
    let mut config = Config::default();
    config.db.dir = tmp.path().join("data");
    config
}

async fn open_store(config: &Config) -> SqliteStore {
    SqliteStore::new(db::connect(config, "demo").await.unwrap())
}

fn project(model: &str) -> Project {
    Project {
        alias: "demo".to_string(),
        root_path: "/work/demo".to_string(),
        provider: "ollama".to_string(),
        model: model.to_string(),
        extensions: vec!["go".to_string(), "yaml".to_string()],
    }
}

#[tokio::test]
async fn test_project_upsert_overwrites_all_fields() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;

    assert!(store.get_project("demo").await.unwrap().is_none());
    store.upsert_project(&project("first")).await.unwrap();

    let mut updated = project("second");
    updated.provider = "litellm".to_string();
    updated.extensions = vec![];
    store.upsert_project(&updated).await.unwrap();

    assert_eq!(store.get_project("demo").await.unwrap(), Some(updated));
}

#[tokio::test]
async fn test_replace_file_changes_id_and_keeps_one_pair() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(3).await.unwrap();

    let first = store
        .replace_file(None, "/main.go", &[1.0, 0.0, 0.0])
        .await
        .unwrap();
    let second = store
        .replace_file(Some(first), "/main.go", &[0.0, 1.0, 0.0])
        .await
        .unwrap();

    assert!(second > first);
    let files = store.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, second);
    assert_eq!(files[0].path, "/main.go");

    let vectors: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM context_vectors")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(vectors, 1);
}

#[tokio::test]
async fn test_dimension_mismatch_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(2).await.unwrap();
    let id = store.replace_file(None, "/a.go", &[1.0, 0.0]).await.unwrap();

    let err = store
        .replace_file(Some(id), "/a.go", &[1.0, 0.0, 0.0])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodesearchError>(),
        Some(CodesearchError::DimensionMismatch {
            expected: 2,
            actual: 3
        })
    ));

    let files = store.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, id);
}

#[tokio::test]
async fn test_knn_orders_by_cosine_distance() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(2).await.unwrap();
    store.replace_file(None, "/far.go", &[-1.0, 0.0]).await.unwrap();
    store.replace_file(None, "/exact.go", &[2.0, 0.0]).await.unwrap();
    store.replace_file(None, "/side.go", &[0.0, 1.0]).await.unwrap();

    let hits = store.knn(&[1.0, 0.0], 10).await.unwrap();
    let paths: Vec<&str> = hits.iter().map(|h| h.path.as_str()).collect();
    assert_eq!(paths, vec!["/exact.go", "/side.go", "/far.go"]);
    assert!(hits[0].distance.abs() < 1e-9);
    assert!((hits[1].distance - 1.0).abs() < 1e-9);
    assert!((hits[2].distance - 2.0).abs() < 1e-9);

    let ranked = rank(hits, &RankOptions::exact_code());
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].path, "/exact.go");
}

#[tokio::test]
async fn test_knn_before_first_reset_is_empty() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    assert!(store.knn(&[1.0, 2.0], 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_knn_rejects_wrong_query_dimension() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(2).await.unwrap();
    store.replace_file(None, "/a.go", &[1.0, 0.0]).await.unwrap();

    let err = store.knn(&[1.0], 5).await.unwrap_err();
    assert!(err.to_string().contains("dimension mismatch"));
}

#[tokio::test]
async fn test_reset_clears_rows_and_never_reuses_ids() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(2).await.unwrap();
    let old = store.replace_file(None, "/a.go", &[1.0, 0.0]).await.unwrap();

    store.reset(4).await.unwrap();
    assert_eq!(store.file_count().await.unwrap(), 0);

    let new = store
        .replace_file(None, "/a.go", &[1.0, 0.0, 0.0, 0.0])
        .await
        .unwrap();
    assert!(new > old);
}

#[tokio::test]
async fn test_delete_file_removes_pair() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(2).await.unwrap();
    let keep = store.replace_file(None, "/keep.go", &[1.0, 0.0]).await.unwrap();
    let gone = store.replace_file(None, "/gone.go", &[0.0, 1.0]).await.unwrap();

    store.delete_file(gone).await.unwrap();

    let files = store.list_files().await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, keep);
    let orphan: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM context_vectors WHERE file_id = ?")
        .bind(gone)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(orphan, 0);
}

#[tokio::test]
async fn test_list_files_oldest_first() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&config_in(&tmp)).await;
    store.reset(1).await.unwrap();
    let a = store.replace_file(None, "/a.go", &[1.0]).await.unwrap();
    store.replace_file(None, "/b.go", &[1.0]).await.unwrap();
    store.replace_file(Some(a), "/a.go", &[1.0]).await.unwrap();

    let paths: Vec<String> = store
        .list_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(paths, vec!["/b.go", "/a.go"]);
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let tmp = TempDir::new().unwrap();
    let config = config_in(&tmp);
    {
        let store = open_store(&config).await;
        store.upsert_project(&project("m")).await.unwrap();
        store.reset(2).await.unwrap();
        store.replace_file(None, "/a.go", &[1.0, 0.0]).await.unwrap();
        store.pool().close().await;
    }

    let store = SqliteStore::new(db::connect_existing(&config, "demo").await.unwrap());
    assert_eq!(store.file_count().await.unwrap(), 1);
    assert_eq!(store.get_project("demo").await.unwrap(), Some(project("m")));
}

#[tokio::test]
async fn test_connect_existing_reports_missing_project() {
    let tmp = TempDir::new().unwrap();
    let err = db::connect_existing(&config_in(&tmp), "nope")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CodesearchError>(),
        Some(CodesearchError::ProjectNotFound(alias)) if alias == "nope"
    ));
}
