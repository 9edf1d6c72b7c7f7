use sea_query::{ConditionalStatement, Expr, Order, Query, SqliteQueryBuilder};
use sea_query_binder::{SqlxBinder, SqlxValues};

use crate::schema::Quizzes;

const COLUMNS: [Quizzes; 7] = [
    Quizzes::Id,
    Quizzes::VideoId,
    Quizzes::Timestamp,
    Quizzes::Question,
    Quizzes::Options,
    Quizzes::CorrectAnswer,
    Quizzes::CreatedAt,
];

/// INSERT INTO quizzes (video_id, timestamp, question, options, correct_answer, created_at)
/// VALUES (?, ?, ?, ?, ?, ?) RETURNING *
///
/// `options_json` is the JSON-encoded array of option strings.
pub fn insert(
    video_id: i64,
    timestamp: f64,
    question: &str,
    options_json: &str,
    correct_answer: i64,
    created_at: &str,
) -> (String, SqlxValues) {
    Query::insert()
        .into_table(Quizzes::Table)
        .columns([
            Quizzes::VideoId,
            Quizzes::Timestamp,
            Quizzes::Question,
            Quizzes::Options,
            Quizzes::CorrectAnswer,
            Quizzes::CreatedAt,
        ])
        .values_panic([
            video_id.into(),
            timestamp.into(),
            question.into(),
            options_json.into(),
            correct_answer.into(),
            created_at.into(),
        ])
        .returning(Query::returning().columns(COLUMNS))
        .build_sqlx(SqliteQueryBuilder)
}

/// SELECT ... FROM quizzes WHERE video_id = ? ORDER BY timestamp ASC, id ASC
pub fn select_for_video(video_id: i64) -> (String, SqlxValues) {
    Query::select()
        .columns(COLUMNS)
        .from(Quizzes::Table)
        .and_where(Expr::col(Quizzes::VideoId).eq(video_id))
        .order_by(Quizzes::Timestamp, Order::Asc)
        .order_by(Quizzes::Id, Order::Asc)
        .build_sqlx(SqliteQueryBuilder)
}

/// DELETE FROM quizzes WHERE id = ?
pub fn delete(id: i64) -> (String, SqlxValues) {
    Query::delete()
        .from_table(Quizzes::Table)
        .and_where(Expr::col(Quizzes::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder)
}
