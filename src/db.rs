use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;

use crate::constants::EXPECTED_DB_VERSION;
use crate::queries::{ddl, metadata};
use crate::store::StoreError;

/// Open a file-based database pool for production use, creating the file if needed
/// Enables WAL mode and foreign keys
pub async fn open_database(db_path: impl AsRef<Path>) -> Result<SqlitePool, StoreError> {
    let db_path = db_path.as_ref();
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    info!("SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Open a database and make sure its schema is current
pub async fn open_and_init_database(db_path: impl AsRef<Path>) -> Result<SqlitePool, StoreError> {
    let pool = open_database(db_path).await?;
    init_database_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes, then stamp or verify the schema version
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    for sql in [
        ddl::create_metadata_table(),
        ddl::create_videos_table(),
        ddl::create_timestamp_notes_table(),
        ddl::create_quizzes_table(),
        ddl::create_videos_blob_url_index(),
        ddl::create_timestamp_notes_video_id_index(),
        ddl::create_quizzes_video_id_index(),
    ] {
        sqlx::query(&sql).execute(pool).await?;
    }

    let version = sqlx::query(&metadata::select_by_key("version"))
        .fetch_optional(pool)
        .await?
        .map(|row| row.get::<String, _>(0));

    match version {
        None => {
            sqlx::query(&metadata::upsert("version", EXPECTED_DB_VERSION))
                .execute(pool)
                .await?;
        }
        Some(found) if found != EXPECTED_DB_VERSION => {
            return Err(StoreError::VersionMismatch {
                found,
                expected: EXPECTED_DB_VERSION,
            });
        }
        Some(_) => {}
    }

    Ok(())
}

/// Create a database in a temporary directory for testing
/// The returned guard removes the directory when dropped
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), StoreError> {
    let guard = tempfile::tempdir()?;
    let pool = open_and_init_database(guard.path().join("test.sqlite")).await?;
    Ok((pool, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_init_is_idempotent() {
        let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
        init_database_schema(&pool).await.unwrap();

        let version: String = sqlx::query(&metadata::select_by_key("version"))
            .fetch_one(&pool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(version, EXPECTED_DB_VERSION);
    }

    #[tokio::test]
    async fn test_rejects_unknown_schema_version() {
        let (pool, _guard) = create_test_connection_in_temporary_file().await.unwrap();
        sqlx::query(&metadata::upsert("version", "999"))
            .execute(&pool)
            .await
            .unwrap();

        let err = init_database_schema(&pool).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { ref found, .. } if found == "999"));
    }
}
