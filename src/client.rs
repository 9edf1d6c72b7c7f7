//! Async JSON client for the video API, used by the CLI and the player session.

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::models::{
    CreateNoteRequest, CreateQuizRequest, DeleteResponse, Note, NoteEnvelope, Quiz, QuizEnvelope,
    SaveMetadataRequest, Video, VideoDetails, VideoEnvelope, VideoList,
};
use crate::upload::{TokenRequest, UploadEvent};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0} not found")]
    NotFound(String),

    /// Non-2xx response carrying the server's error envelope
    #[error("Server returned {status}: {message}")]
    Api { status: StatusCode, message: String },
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClientTokenResponse {
    client_token: String,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

impl ApiClient {
    /// `server` is the origin the API is mounted on, e.g. `http://localhost:3000`
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let mut base = Url::parse(server)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base.join(path)?)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|envelope| envelope.error)
            .unwrap_or(text);
        Err(ClientError::Api { status, message })
    }

    pub async fn list_videos(&self) -> Result<Vec<Video>, ClientError> {
        let response = self.http.get(self.endpoint("api/videos")?).send().await?;
        let list: VideoList = Self::decode(response).await?;
        Ok(list.videos)
    }

    /// Videos stored at exactly `blob_url`
    pub async fn find_videos_by_url(&self, blob_url: &str) -> Result<Vec<Video>, ClientError> {
        let mut url = self.endpoint("api/videos")?;
        url.query_pairs_mut().append_pair("url", blob_url);
        let response = self.http.get(url).send().await?;
        Self::decode(response).await
    }

    pub async fn get_video(&self, id: i64) -> Result<VideoDetails, ClientError> {
        let url = self.endpoint(&format!("api/videos/{}", id))?;
        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound(format!("Video {}", id)));
        }
        Self::decode(response).await
    }

    pub async fn save_metadata(
        &self,
        title: &str,
        description: Option<&str>,
        blob_url: &str,
    ) -> Result<Video, ClientError> {
        let body = SaveMetadataRequest {
            title: Some(title.to_string()),
            description: description.map(str::to_string),
            blob_url: Some(blob_url.to_string()),
        };
        let response = self
            .http
            .post(self.endpoint("api/videos/save-metadata")?)
            .json(&body)
            .send()
            .await?;
        let envelope: VideoEnvelope = Self::decode(response).await?;
        Ok(envelope.video)
    }

    pub async fn create_note(
        &self,
        video_id: i64,
        timestamp: f64,
        note: &str,
    ) -> Result<Note, ClientError> {
        let body = CreateNoteRequest {
            video_id: Some(video_id),
            timestamp: Some(timestamp),
            note: Some(note.to_string()),
        };
        let response = self
            .http
            .post(self.endpoint("api/notes")?)
            .json(&body)
            .send()
            .await?;
        let envelope: NoteEnvelope = Self::decode(response).await?;
        Ok(envelope.note)
    }

    pub async fn delete_note(&self, id: i64) -> Result<(), ClientError> {
        let mut url = self.endpoint("api/notes")?;
        url.query_pairs_mut().append_pair("id", &id.to_string());
        let response = self.http.delete(url).send().await?;
        let _: DeleteResponse = Self::decode(response).await?;
        Ok(())
    }

    pub async fn create_quiz(
        &self,
        video_id: i64,
        timestamp: f64,
        question: &str,
        options: &[String],
        correct_answer: i64,
    ) -> Result<Quiz, ClientError> {
        let body = CreateQuizRequest {
            video_id: Some(video_id),
            timestamp: Some(timestamp),
            question: Some(question.to_string()),
            options: Some(options.to_vec()),
            correct_answer: Some(correct_answer),
        };
        let response = self
            .http
            .post(self.endpoint("api/quizzes")?)
            .json(&body)
            .send()
            .await?;
        let envelope: QuizEnvelope = Self::decode(response).await?;
        Ok(envelope.quiz)
    }

    pub async fn delete_quiz(&self, id: i64) -> Result<(), ClientError> {
        let mut url = self.endpoint("api/quizzes")?;
        url.query_pairs_mut().append_pair("id", &id.to_string());
        let response = self.http.delete(url).send().await?;
        let _: DeleteResponse = Self::decode(response).await?;
        Ok(())
    }

    /// Ask the server for a direct-to-storage upload token
    pub async fn request_client_token(&self, request: TokenRequest) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.endpoint("api/upload-video")?)
            .json(&UploadEvent::GenerateClientToken(request))
            .send()
            .await?;
        let token: ClientTokenResponse = Self::decode(response).await?;
        Ok(token.client_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_join_under_base_path() {
        let client = ApiClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.endpoint("api/videos").unwrap().as_str(),
            "http://localhost:3000/api/videos"
        );

        let client = ApiClient::new("http://example.com/learn").unwrap();
        assert_eq!(
            client.endpoint("api/notes").unwrap().as_str(),
            "http://example.com/learn/api/notes"
        );
    }

    #[test]
    fn test_rejects_bad_server_url() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
