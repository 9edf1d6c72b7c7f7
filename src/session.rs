use log::{error, info};

use crate::client::{ApiClient, ClientError};
use crate::models::{Note, Quiz};
use crate::player::PlaybackEngine;

#[derive(Debug, thiserror::Error)]
pub enum PlayerSessionError {
    /// The annotation form is incomplete; nothing was sent
    #[error("{0}")]
    Form(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// A player bound to one video on the server.
///
/// Annotations are added at the engine's current position and the video is
/// refetched after every change so the timeline reflects the server.
pub struct PlayerSession {
    client: ApiClient,
    video_id: i64,
    engine: PlaybackEngine,
}

impl PlayerSession {
    pub async fn open(client: ApiClient, video_id: i64) -> Result<Self, ClientError> {
        let details = client.get_video(video_id).await?;
        let mut engine = PlaybackEngine::new();
        engine.load(details);
        info!("Loaded video {} with {} timeline entries", video_id, engine.timeline().len());

        Ok(Self {
            client,
            video_id,
            engine,
        })
    }

    pub fn video_id(&self) -> i64 {
        self.video_id
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    pub async fn refetch(&mut self) -> Result<(), ClientError> {
        let details = self.client.get_video(self.video_id).await?;
        self.engine.refresh(details);
        Ok(())
    }

    /// Attach a note at the current playback position
    pub async fn add_note(&mut self, text: &str) -> Result<Note, PlayerSessionError> {
        if text.trim().is_empty() {
            return Err(PlayerSessionError::Form("Note text is required".to_string()));
        }

        let note = self
            .client
            .create_note(self.video_id, self.engine.position(), text)
            .await?;
        self.refetch().await?;
        Ok(note)
    }

    /// Attach a quiz at the current playback position
    pub async fn add_quiz(
        &mut self,
        question: &str,
        options: &[String],
        correct_answer: i64,
    ) -> Result<Quiz, PlayerSessionError> {
        if question.trim().is_empty() {
            return Err(PlayerSessionError::Form("Question is required".to_string()));
        }
        if options.is_empty() || options.iter().any(|option| option.trim().is_empty()) {
            return Err(PlayerSessionError::Form(
                "Every answer option must be filled in".to_string(),
            ));
        }

        let quiz = self
            .client
            .create_quiz(
                self.video_id,
                self.engine.position(),
                question,
                options,
                correct_answer,
            )
            .await?;
        self.refetch().await?;
        Ok(quiz)
    }

    /// Failures are logged, never surfaced
    pub async fn delete_note(&mut self, id: i64) {
        if let Err(e) = self.client.delete_note(id).await {
            error!("Error deleting note {}: {}", id, e);
        }
        if let Err(e) = self.refetch().await {
            error!("Error fetching video {}: {}", self.video_id, e);
        }
    }

    pub async fn delete_quiz(&mut self, id: i64) {
        if let Err(e) = self.client.delete_quiz(id).await {
            error!("Error deleting quiz {}: {}", id, e);
        }
        if let Err(e) = self.refetch().await {
            error!("Error fetching video {}: {}", self.video_id, e);
        }
    }
}
