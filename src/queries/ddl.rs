use sea_query::{ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table};

use crate::schema::{Metadata, Quizzes, TimestampNotes, Videos};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS videos (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     title TEXT NOT NULL,
///     description TEXT,
///     blob_url TEXT NOT NULL,
///     duration REAL,
///     created_at TEXT NOT NULL
/// )
pub fn create_videos_table() -> String {
    Table::create()
        .table(Videos::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Videos::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Videos::Title).text().not_null())
        .col(ColumnDef::new(Videos::Description).text())
        .col(ColumnDef::new(Videos::BlobUrl).text().not_null())
        .col(ColumnDef::new(Videos::Duration).double())
        .col(ColumnDef::new(Videos::CreatedAt).text().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS timestamp_notes (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     video_id INTEGER NOT NULL REFERENCES videos(id),
///     timestamp REAL NOT NULL,
///     note TEXT NOT NULL,
///     created_at TEXT NOT NULL
/// )
pub fn create_timestamp_notes_table() -> String {
    Table::create()
        .table(TimestampNotes::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(TimestampNotes::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(TimestampNotes::VideoId)
                .big_integer()
                .not_null(),
        )
        .col(ColumnDef::new(TimestampNotes::Timestamp).double().not_null())
        .col(ColumnDef::new(TimestampNotes::Note).text().not_null())
        .col(ColumnDef::new(TimestampNotes::CreatedAt).text().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(TimestampNotes::Table, TimestampNotes::VideoId)
                .to(Videos::Table, Videos::Id)
                .on_delete(ForeignKeyAction::NoAction),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS quizzes (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     video_id INTEGER NOT NULL REFERENCES videos(id),
///     timestamp REAL NOT NULL,
///     question TEXT NOT NULL,
///     options TEXT NOT NULL,  -- JSON array of strings
///     correct_answer INTEGER NOT NULL,
///     created_at TEXT NOT NULL
/// )
pub fn create_quizzes_table() -> String {
    Table::create()
        .table(Quizzes::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Quizzes::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Quizzes::VideoId).big_integer().not_null())
        .col(ColumnDef::new(Quizzes::Timestamp).double().not_null())
        .col(ColumnDef::new(Quizzes::Question).text().not_null())
        .col(ColumnDef::new(Quizzes::Options).text().not_null())
        .col(
            ColumnDef::new(Quizzes::CorrectAnswer)
                .integer()
                .not_null(),
        )
        .col(ColumnDef::new(Quizzes::CreatedAt).text().not_null())
        .foreign_key(
            ForeignKey::create()
                .from(Quizzes::Table, Quizzes::VideoId)
                .to(Videos::Table, Videos::Id)
                .on_delete(ForeignKeyAction::NoAction),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_videos_blob_url ON videos(blob_url)
pub fn create_videos_blob_url_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_videos_blob_url")
        .table(Videos::Table)
        .col(Videos::BlobUrl)
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_timestamp_notes_video_id ON timestamp_notes(video_id)
pub fn create_timestamp_notes_video_id_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_timestamp_notes_video_id")
        .table(TimestampNotes::Table)
        .col(TimestampNotes::VideoId)
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_quizzes_video_id ON quizzes(video_id)
pub fn create_quizzes_video_id_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_quizzes_video_id")
        .table(Quizzes::Table)
        .col(Quizzes::VideoId)
        .to_string(SqliteQueryBuilder)
}
