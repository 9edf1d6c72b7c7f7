use sea_query::{ConditionalStatement, Expr, Order, Query, SqliteQueryBuilder};
use sea_query_binder::{SqlxBinder, SqlxValues};

use crate::schema::TimestampNotes;

const COLUMNS: [TimestampNotes; 5] = [
    TimestampNotes::Id,
    TimestampNotes::VideoId,
    TimestampNotes::Timestamp,
    TimestampNotes::Note,
    TimestampNotes::CreatedAt,
];

/// INSERT INTO timestamp_notes (video_id, timestamp, note, created_at) VALUES (?, ?, ?, ?) RETURNING *
pub fn insert(video_id: i64, timestamp: f64, note: &str, created_at: &str) -> (String, SqlxValues) {
    Query::insert()
        .into_table(TimestampNotes::Table)
        .columns([
            TimestampNotes::VideoId,
            TimestampNotes::Timestamp,
            TimestampNotes::Note,
            TimestampNotes::CreatedAt,
        ])
        .values_panic([
            video_id.into(),
            timestamp.into(),
            note.into(),
            created_at.into(),
        ])
        .returning(Query::returning().columns(COLUMNS))
        .build_sqlx(SqliteQueryBuilder)
}

/// SELECT ... FROM timestamp_notes WHERE video_id = ? ORDER BY timestamp ASC, id ASC
pub fn select_for_video(video_id: i64) -> (String, SqlxValues) {
    Query::select()
        .columns(COLUMNS)
        .from(TimestampNotes::Table)
        .and_where(Expr::col(TimestampNotes::VideoId).eq(video_id))
        .order_by(TimestampNotes::Timestamp, Order::Asc)
        .order_by(TimestampNotes::Id, Order::Asc)
        .build_sqlx(SqliteQueryBuilder)
}

/// DELETE FROM timestamp_notes WHERE id = ?
pub fn delete(id: i64) -> (String, SqlxValues) {
    Query::delete()
        .from_table(TimestampNotes::Table)
        .and_where(Expr::col(TimestampNotes::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder)
}
