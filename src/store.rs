//! Video and annotation persistence over a shared SQLite pool.
//!
//! Every statement binds its values as parameters. Each operation runs
//! independent statements with no in-process caching, so
//! handlers can call these concurrently against the same pool.

use chrono::{SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::models::{Note, Quiz, Video, VideoDetails};
use crate::queries::{notes, quizzes, videos};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to encode quiz options: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Unsupported database version: '{found}'. This application only supports version '{expected}'")]
    VersionMismatch {
        found: String,
        expected: &'static str,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn require_text<'a>(field: &str, value: &'a str) -> Result<&'a str, StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{} is required", field)));
    }
    Ok(value)
}

/// Timestamps are seconds from the start of the video
pub fn validate_timestamp(timestamp: f64) -> Result<f64, StoreError> {
    if !timestamp.is_finite() || timestamp < 0.0 {
        return Err(StoreError::Validation(format!(
            "timestamp must be a non-negative number of seconds, got {}",
            timestamp
        )));
    }
    Ok(timestamp)
}

/// Record a new video; a blank description is stored as NULL
pub async fn create_video(
    pool: &SqlitePool,
    title: &str,
    description: Option<&str>,
    blob_url: &str,
) -> Result<Video, StoreError> {
    let title = require_text("title", title)?;
    let blob_url = require_text("blob URL", blob_url)?;
    let description = description.filter(|d| !d.trim().is_empty());

    let (sql, values) = videos::insert(title, description, blob_url, &now_rfc3339());
    let video = sqlx::query_as_with::<_, Video, _>(&sql, values)
        .fetch_one(pool)
        .await?;
    Ok(video)
}

/// Fetch a video with its notes and quizzes, or `None` if no row matches
pub async fn get_video_by_id(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<VideoDetails>, StoreError> {
    let (sql, values) = videos::select_by_id(id);
    let video = match sqlx::query_as_with::<_, Video, _>(&sql, values)
        .fetch_optional(pool)
        .await?
    {
        Some(video) => video,
        None => return Ok(None),
    };

    let (sql, values) = notes::select_for_video(id);
    let notes = sqlx::query_as_with::<_, Note, _>(&sql, values)
        .fetch_all(pool)
        .await?;
    let (sql, values) = quizzes::select_for_video(id);
    let quizzes = sqlx::query_as_with::<_, Quiz, _>(&sql, values)
        .fetch_all(pool)
        .await?;

    Ok(Some(VideoDetails {
        video,
        notes,
        quizzes,
    }))
}

/// All videos, newest first, optionally only those stored at `blob_url`
pub async fn list_videos(
    pool: &SqlitePool,
    blob_url: Option<&str>,
) -> Result<Vec<Video>, StoreError> {
    let (sql, values) = videos::select_all(blob_url);
    let videos = sqlx::query_as_with::<_, Video, _>(&sql, values)
        .fetch_all(pool)
        .await?;
    Ok(videos)
}

pub async fn create_note(
    pool: &SqlitePool,
    video_id: i64,
    timestamp: f64,
    text: &str,
) -> Result<Note, StoreError> {
    let timestamp = validate_timestamp(timestamp)?;
    let text = require_text("note", text)?;

    let (sql, values) = notes::insert(video_id, timestamp, text, &now_rfc3339());
    let note = sqlx::query_as_with::<_, Note, _>(&sql, values)
        .fetch_one(pool)
        .await?;
    Ok(note)
}

/// Returns the number of rows removed; zero is not an error
pub async fn delete_note(pool: &SqlitePool, id: i64) -> Result<u64, StoreError> {
    let (sql, values) = notes::delete(id);
    let result = sqlx::query_with(&sql, values).execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn create_quiz(
    pool: &SqlitePool,
    video_id: i64,
    timestamp: f64,
    question: &str,
    options: &[String],
    correct_answer: i64,
) -> Result<Quiz, StoreError> {
    let timestamp = validate_timestamp(timestamp)?;
    let question = require_text("question", question)?;
    if options.is_empty() {
        return Err(StoreError::Validation(
            "at least one option is required".to_string(),
        ));
    }
    let in_range = usize::try_from(correct_answer).map_or(false, |index| index < options.len());
    if !in_range {
        return Err(StoreError::Validation(format!(
            "correct answer index {} is outside the {} options",
            correct_answer,
            options.len()
        )));
    }

    let options_json = serde_json::to_string(options)?;
    let (sql, values) = quizzes::insert(
        video_id,
        timestamp,
        question,
        &options_json,
        correct_answer,
        &now_rfc3339(),
    );
    let quiz = sqlx::query_as_with::<_, Quiz, _>(&sql, values)
        .fetch_one(pool)
        .await?;
    Ok(quiz)
}

/// Returns the number of rows removed; zero is not an error
pub async fn delete_quiz(pool: &SqlitePool, id: i64) -> Result<u64, StoreError> {
    let (sql, values) = quizzes::delete(id);
    let result = sqlx::query_with(&sql, values).execute(pool).await?;
    Ok(result.rows_affected())
}
