use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;
use std::str::FromStr;

use codesearch_core::CodesearchError;

use crate::config::Config;
use crate::migrate;

/// Reject aliases that cannot name a database file.
pub fn validate_alias(alias: &str) -> Result<()> {
    if alias.trim().is_empty() {
        return Err(CodesearchError::InvalidArgs("project alias must not be empty".into()).into());
    }
    if alias.contains('/') || alias.contains('\\') || alias == "." || alias == ".." {
        return Err(CodesearchError::InvalidArgs(format!(
            "project alias '{}' must not contain path separators",
            alias
        ))
        .into());
    }
    Ok(())
}

/// Database file for a project: `<db.dir>/<alias>.db`.
pub fn db_path(config: &Config, alias: &str) -> Result<PathBuf> {
    validate_alias(alias)?;
    Ok(config.db.dir.join(format!("{}.db", alias)))
}

/// Open the project database, creating the file and schema if missing.
pub async fn connect(config: &Config, alias: &str) -> Result<SqlitePool> {
    let db_path = db_path(config, alias)?;

    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    open(&db_path, true).await
}

/// Open the database of a project that has already been built.
///
/// Fails with [`CodesearchError::ProjectNotFound`] if there is no database file.
pub async fn connect_existing(config: &Config, alias: &str) -> Result<SqlitePool> {
    let db_path = db_path(config, alias)?;
    if !db_path.is_file() {
        return Err(CodesearchError::ProjectNotFound(alias.to_string()).into());
    }
    open(&db_path, false).await
}

async fn open(db_path: &std::path::Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(create)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate::run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_validation() {
        assert!(validate_alias("backend").is_ok());
        assert!(validate_alias("my-app_2").is_ok());
        for bad in ["", "  ", "a/b", "a\\b", ".."] {
            let err = validate_alias(bad).unwrap_err();
            assert!(
                err.downcast_ref::<CodesearchError>()
                    .is_some_and(|e| e.is_configuration()),
                "alias {:?}",
                bad
            );
        }
    }

    #[test]
    fn db_path_joins_dir() {
        let mut config = Config::default();
        config.db.dir = PathBuf::from("/var/lib/codesearch");
        assert_eq!(
            db_path(&config, "web").unwrap(),
            PathBuf::from("/var/lib/codesearch/web.db")
        );
    }
}
