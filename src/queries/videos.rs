use sea_query::{ConditionalStatement, Expr, Order, Query, SqliteQueryBuilder};
use sea_query_binder::{SqlxBinder, SqlxValues};

use crate::schema::Videos;

const COLUMNS: [Videos; 6] = [
    Videos::Id,
    Videos::Title,
    Videos::Description,
    Videos::BlobUrl,
    Videos::Duration,
    Videos::CreatedAt,
];

/// INSERT INTO videos (title, description, blob_url, created_at) VALUES (?, ?, ?, ?) RETURNING *
pub fn insert(
    title: &str,
    description: Option<&str>,
    blob_url: &str,
    created_at: &str,
) -> (String, SqlxValues) {
    Query::insert()
        .into_table(Videos::Table)
        .columns([
            Videos::Title,
            Videos::Description,
            Videos::BlobUrl,
            Videos::CreatedAt,
        ])
        .values_panic([
            title.into(),
            description.map(str::to_owned).into(),
            blob_url.into(),
            created_at.into(),
        ])
        .returning(Query::returning().columns(COLUMNS))
        .build_sqlx(SqliteQueryBuilder)
}

/// SELECT id, title, description, blob_url, duration, created_at FROM videos WHERE id = ?
pub fn select_by_id(id: i64) -> (String, SqlxValues) {
    Query::select()
        .columns(COLUMNS)
        .from(Videos::Table)
        .and_where(Expr::col(Videos::Id).eq(id))
        .build_sqlx(SqliteQueryBuilder)
}

/// SELECT ... FROM videos [WHERE blob_url = ?] ORDER BY created_at DESC, id DESC
pub fn select_all(blob_url: Option<&str>) -> (String, SqlxValues) {
    Query::select()
        .columns(COLUMNS)
        .from(Videos::Table)
        .and_where_option(blob_url.map(|url| Expr::col(Videos::BlobUrl).eq(url)))
        .order_by(Videos::CreatedAt, Order::Desc)
        .order_by(Videos::Id, Order::Desc)
        .build_sqlx(SqliteQueryBuilder)
}
