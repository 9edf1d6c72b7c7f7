//! Client side of a direct-to-storage upload.
//!
//! `UploadSession` tracks one attempt from the token request to the moment
//! the player can be opened. The storage provider writes the video row on its
//! own schedule, so the client confirms by polling the listing for the final
//! blob URL a bounded number of times.

use log::{info, warn};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::constants::{CONFIRM_ATTEMPTS, CONFIRM_BACKOFF, MAX_UPLOAD_BYTES};
use crate::models::Video;
use crate::upload::{TokenRequest, VideoPayload};

const GENERIC_FAILURE: &str = "Failed to upload video. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Invalid(String),

    #[error("Cannot {event} while upload is {phase}")]
    OutOfOrder {
        phase: &'static str,
        event: &'static str,
    },
}

/// What the upload form collected before anything is sent
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

impl UploadRequest {
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.title.trim().is_empty() || self.file_name.trim().is_empty() {
            return Err(SessionError::Invalid(
                "Please provide a video file and title".to_string(),
            ));
        }
        if !self.content_type.starts_with("video/") {
            return Err(SessionError::Invalid("Please select a video file".to_string()));
        }
        if self.size > MAX_UPLOAD_BYTES {
            return Err(SessionError::Invalid(
                "File size too large. Maximum size is 500MB".to_string(),
            ));
        }
        Ok(())
    }

    /// Token request carrying title and description as the opaque payload
    pub fn token_request(&self) -> TokenRequest {
        let payload = VideoPayload {
            title: Some(self.title.clone()),
            description: self.description.clone(),
        };
        TokenRequest {
            pathname: self.file_name.clone(),
            content_type: Some(self.content_type.clone()),
            size: Some(self.size),
            client_payload: serde_json::to_string(&payload).ok(),
            multipart: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadPhase {
    Requesting,
    Authorized { client_token: String },
    Transferring(u8),
    Completed(String),
    Confirmed(i64),
    /// Transfer finished but the video row never showed up
    Abandoned(String),
    Failed(String),
}

impl UploadPhase {
    fn name(&self) -> &'static str {
        match self {
            UploadPhase::Requesting => "requesting",
            UploadPhase::Authorized { .. } => "authorized",
            UploadPhase::Transferring(_) => "transferring",
            UploadPhase::Completed(_) => "completed",
            UploadPhase::Confirmed(_) => "confirmed",
            UploadPhase::Abandoned(_) => "abandoned",
            UploadPhase::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadPhase::Confirmed(_) | UploadPhase::Abandoned(_) | UploadPhase::Failed(_)
        )
    }
}

/// Where the client goes once the upload settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Player(i64),
    Listing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: CONFIRM_ATTEMPTS,
            backoff: CONFIRM_BACKOFF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    request: UploadRequest,
    phase: UploadPhase,
}

impl UploadSession {
    pub fn new(request: UploadRequest) -> Result<Self, SessionError> {
        request.validate()?;
        Ok(Self {
            request,
            phase: UploadPhase::Requesting,
        })
    }

    pub fn request(&self) -> &UploadRequest {
        &self.request
    }

    pub fn phase(&self) -> &UploadPhase {
        &self.phase
    }

    fn out_of_order(&self, event: &'static str) -> SessionError {
        SessionError::OutOfOrder {
            phase: self.phase.name(),
            event,
        }
    }

    pub fn authorized(&mut self, client_token: String) -> Result<(), SessionError> {
        match self.phase {
            UploadPhase::Requesting => {
                self.phase = UploadPhase::Authorized { client_token };
                Ok(())
            }
            _ => Err(self.out_of_order("authorize")),
        }
    }

    /// Record transfer progress; values are clamped and never go backwards
    pub fn progress(&mut self, percent: f64) -> Result<u8, SessionError> {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0).round() as u8
        } else {
            0
        };
        let next = match self.phase {
            UploadPhase::Authorized { .. } => percent,
            UploadPhase::Transferring(current) => current.max(percent),
            _ => return Err(self.out_of_order("report progress")),
        };
        self.phase = UploadPhase::Transferring(next);
        Ok(next)
    }

    pub fn completed(&mut self, blob_url: String) -> Result<(), SessionError> {
        match self.phase {
            UploadPhase::Authorized { .. } | UploadPhase::Transferring(_) => {
                info!("Upload successful: {}", blob_url);
                self.phase = UploadPhase::Completed(blob_url);
                Ok(())
            }
            _ => Err(self.out_of_order("complete")),
        }
    }

    /// Settle a completed upload with the outcome of `confirm_upload`
    pub fn settle(&mut self, destination: Destination) -> Result<(), SessionError> {
        let blob_url = match &self.phase {
            UploadPhase::Completed(url) => url.clone(),
            _ => return Err(self.out_of_order("confirm")),
        };
        self.phase = match destination {
            Destination::Player(id) => UploadPhase::Confirmed(id),
            Destination::Listing => UploadPhase::Abandoned(blob_url),
        };
        Ok(())
    }

    /// Fail from any non-terminal phase with a user-facing message
    pub fn fail(&mut self, error: &str) -> Result<(), SessionError> {
        if self.phase.is_terminal() {
            return Err(self.out_of_order("fail"));
        }
        warn!("Upload failed: {}", error);
        self.phase = UploadPhase::Failed(describe_upload_failure(error).to_string());
        Ok(())
    }
}

/// Poll `lookup` for the video stored at `blob_url`.
///
/// Lookup errors are retried like empty results, except on the last attempt
/// where the error is returned.
pub async fn confirm_upload<F, Fut, E>(
    mut lookup: F,
    blob_url: &str,
    policy: RetryPolicy,
) -> Result<Destination, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Vec<Video>, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        let last = attempt == attempts;
        match lookup(blob_url.to_string()).await {
            Ok(videos) => {
                if let Some(video) = videos.first() {
                    info!("Upload confirmed as video {}", video.id);
                    return Ok(Destination::Player(video.id));
                }
            }
            Err(e) if last => return Err(e),
            Err(e) => warn!("Video lookup failed (attempt {}): {}", attempt, e),
        }

        if !last {
            info!("Video not found yet, retrying...");
            tokio::time::sleep(policy.backoff).await;
        }
    }

    info!("Video uploaded but not found in database, returning to listing");
    Ok(Destination::Listing)
}

/// Map raw failure text to one of the fixed user-facing messages
pub fn describe_upload_failure(error: &str) -> &'static str {
    let text = error.to_ascii_lowercase();
    if text.contains("token") || text.contains("authentication") {
        "Upload authentication failed. Please refresh the page and try again."
    } else if text.contains("network") || text.contains("fetch") {
        "Network error. Please check your connection and try again."
    } else if text.contains("size") || text.contains("413") {
        "File is too large. Please try a smaller video file."
    } else if text.contains("type") || text.contains("content") {
        "Invalid file type. Please upload a video file."
    } else {
        GENERIC_FAILURE
    }
}
