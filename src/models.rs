//! Records persisted by the store and exchanged over the JSON API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// A stored media asset plus metadata. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub blob_url: String,
    /// Seconds; filled in by the player once the media is loaded
    pub duration: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// A timestamped free-text annotation on a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Note {
    pub id: i64,
    pub video_id: i64,
    /// Seconds from the start of the video
    pub timestamp: f64,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

/// A timestamped multiple-choice question with one correct option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub video_id: i64,
    pub timestamp: f64,
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`
    pub correct_answer: i64,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    /// Whether `index` names the correct option
    pub fn is_correct(&self, index: usize) -> bool {
        usize::try_from(self.correct_answer).map_or(false, |correct| correct == index)
    }
}

// `options` is stored as a JSON array in a TEXT column.
impl<'r> FromRow<'r, SqliteRow> for Quiz {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let options_json: String = row.try_get("options")?;
        let options: Vec<String> =
            serde_json::from_str(&options_json).map_err(|e| sqlx::Error::ColumnDecode {
                index: "options".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            video_id: row.try_get("video_id")?,
            timestamp: row.try_get("timestamp")?,
            question: row.try_get("question")?,
            options,
            correct_answer: row.try_get("correct_answer")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A video together with its annotations, each list ascending by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDetails {
    pub video: Video,
    pub notes: Vec<Note>,
    pub quizzes: Vec<Quiz>,
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    // Route parameters reach the player as strings, so ids arrive either way.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Int(i64),
        Text(String),
    }

    match Option::<IdRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IdRepr::Int(id)) => Ok(Some(id)),
        Some(IdRepr::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(IdRepr::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid video id '{}'", text))),
    }
}

/// Body of `POST /api/videos/save-metadata`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveMetadataRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub blob_url: Option<String>,
}

/// Body of `POST /api/notes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub video_id: Option<i64>,
    pub timestamp: Option<f64>,
    pub note: Option<String>,
}

/// Body of `POST /api/quizzes`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuizRequest {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub video_id: Option<i64>,
    pub timestamp: Option<f64>,
    pub question: Option<String>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoList {
    pub videos: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoEnvelope {
    pub video: Video,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteEnvelope {
    pub note: Note,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizEnvelope {
    pub quiz: Quiz,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
}
