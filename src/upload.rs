//! Upload authorization for direct client-to-storage transfers.
//!
//! The client asks `POST /api/upload-video` for a short-lived token scoped to
//! a pathname, a set of video content types and a size cap. It then sends the
//! file straight to blob storage, which calls the same endpoint back once the
//! transfer is done. That callback is where video metadata gets written.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sqlx::SqlitePool;
use std::time::Duration;

use crate::config::BlobConfig;
use crate::constants::{generate_random_suffix, DEFAULT_VIDEO_TITLE};
use crate::models::Video;
use crate::store;

type HmacSha256 = Hmac<Sha256>;
const TOKEN_VERSION_V1: &str = "v1";

pub const GENERATE_CLIENT_TOKEN: &str = "blob.generate-client-token";
pub const UPLOAD_COMPLETED: &str = "blob.upload-completed";

/// Upload failures, each tied to one HTTP status.
///
/// The messages keep the words "token", "content type" and "size" so callers
/// that only see the text can still tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    #[error("Invalid upload token: {0}")]
    InvalidToken(String),

    #[error("Upload token expired")]
    TokenExpired,

    #[error("File content type '{0}' is not allowed")]
    ContentTypeNotAllowed(String),

    #[error("File size {size} exceeds the maximum of {max} bytes")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),
}

/// Request bodies accepted by the upload endpoint, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum UploadEvent {
    #[serde(rename = "blob.generate-client-token")]
    GenerateClientToken(TokenRequest),
    #[serde(rename = "blob.upload-completed")]
    UploadCompleted(UploadCompletion),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub pathname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Opaque string echoed back in the completion callback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_payload: Option<String>,
    #[serde(default)]
    pub multipart: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletion {
    pub blob: BlobInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobInfo {
    pub url: String,
    pub pathname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Everything the storage provider needs to accept one transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadClaims {
    pub store_id: String,
    pub pathname: String,
    pub allowed_content_types: Vec<String>,
    pub maximum_size_in_bytes: u64,
    pub valid_until_ms: i64,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub token_payload: Option<String>,
}

impl UploadClaims {
    /// Check a transfer against the limits baked into the token
    pub fn check_upload(&self, content_type: &str, size: u64) -> Result<(), BlobError> {
        if !self
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
        {
            return Err(BlobError::ContentTypeNotAllowed(content_type.to_string()));
        }
        if size > self.maximum_size_in_bytes {
            return Err(BlobError::TooLarge {
                size,
                max: self.maximum_size_in_bytes,
            });
        }
        Ok(())
    }
}

/// Title and description carried through the upload as the client payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl VideoPayload {
    /// Parse the echoed payload, falling back to the placeholder title
    pub fn from_token_payload(token_payload: Option<&str>) -> Self {
        let parsed = match token_payload {
            Some(raw) => match serde_json::from_str::<VideoPayload>(raw) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Failed to parse upload payload, using defaults: {}", e);
                    VideoPayload::default()
                }
            },
            None => VideoPayload::default(),
        };

        let title = parsed
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VIDEO_TITLE.to_string());
        let description = parsed.description.filter(|d| !d.trim().is_empty());

        VideoPayload {
            title: Some(title),
            description,
        }
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(DEFAULT_VIDEO_TITLE)
    }
}

/// Guess a video MIME type from a file name
pub fn content_type_from_pathname(pathname: &str) -> Option<&'static str> {
    let (_, extension) = pathname.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "ogv" | "ogg" => Some("video/ogg"),
        "mov" => Some("video/quicktime"),
        "avi" => Some("video/x-msvideo"),
        "mkv" => Some("video/x-matroska"),
        _ => None,
    }
}

/// Insert a random suffix before the extension and drop path traversal
fn unique_pathname(pathname: &str) -> Result<String, BlobError> {
    let cleaned: Vec<&str> = pathname
        .split('/')
        .filter(|part| !part.is_empty() && *part != "." && *part != "..")
        .collect();
    if cleaned.is_empty() {
        return Err(BlobError::InvalidRequest("pathname is required".to_string()));
    }
    let cleaned = cleaned.join("/");
    let suffix = generate_random_suffix();

    let file_start = cleaned.rfind('/').map_or(0, |i| i + 1);
    Ok(match cleaned.rfind('.') {
        Some(dot) if dot > file_start => {
            format!("{}-{}{}", &cleaned[..dot], suffix, &cleaned[dot..])
        }
        _ => format!("{}-{}", cleaned, suffix),
    })
}

/// Issues and verifies upload tokens with the storage read-write secret
#[derive(Clone)]
pub struct UploadAuthority {
    secret: String,
    store_id: String,
    callback_url: Option<String>,
    allowed_content_types: Vec<String>,
    max_upload_bytes: u64,
    token_ttl: Duration,
}

impl std::fmt::Debug for UploadAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadAuthority")
            .field("store_id", &self.store_id)
            .field("callback_url", &self.callback_url)
            .field("allowed_content_types", &self.allowed_content_types)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

impl UploadAuthority {
    pub fn new(secret: impl Into<String>, config: &BlobConfig) -> Self {
        Self {
            secret: secret.into(),
            store_id: config.store_id.clone(),
            callback_url: config.callback_url.clone(),
            allowed_content_types: config.allowed_content_types.clone(),
            max_upload_bytes: config.max_upload_bytes,
            token_ttl: Duration::from_secs(config.token_ttl_secs),
        }
    }

    fn mac(&self) -> Result<HmacSha256, BlobError> {
        HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| BlobError::InvalidToken(e.to_string()))
    }

    /// Validate a token request and mint the client token
    pub fn authorize(&self, request: &TokenRequest, now_ms: i64) -> Result<String, BlobError> {
        let content_type = match request.content_type.as_deref() {
            Some(declared) if !declared.trim().is_empty() => declared.trim().to_ascii_lowercase(),
            _ => content_type_from_pathname(&request.pathname)
                .ok_or_else(|| {
                    BlobError::ContentTypeNotAllowed(format!(
                        "unknown content type for '{}'",
                        request.pathname
                    ))
                })?
                .to_string(),
        };

        let valid_until_ms = i64::try_from(self.token_ttl.as_millis())
            .ok()
            .and_then(|ttl_ms| now_ms.checked_add(ttl_ms))
            .ok_or_else(|| {
                BlobError::InvalidRequest("upload token lifetime is out of range".to_string())
            })?;

        let claims = UploadClaims {
            store_id: self.store_id.clone(),
            pathname: unique_pathname(&request.pathname)?,
            allowed_content_types: self.allowed_content_types.clone(),
            maximum_size_in_bytes: self.max_upload_bytes,
            valid_until_ms,
            callback_url: self.callback_url.clone(),
            token_payload: request.client_payload.clone(),
        };
        // A size of zero means the client did not declare one.
        claims.check_upload(&content_type, request.size.unwrap_or(0))?;

        let token = self.encode_token(&claims)?;
        info!(
            "Issued upload token for '{}' ({}), valid until {}",
            claims.pathname, content_type, claims.valid_until_ms
        );
        Ok(token)
    }

    pub fn encode_token(&self, claims: &UploadClaims) -> Result<String, BlobError> {
        let claims_bytes =
            serde_json::to_vec(claims).map_err(|e| BlobError::InvalidRequest(e.to_string()))?;
        let claims_part = URL_SAFE_NO_PAD.encode(claims_bytes);
        let mut mac = self.mac()?;
        mac.update(claims_part.as_bytes());
        let sig_part = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{}.{}.{}", TOKEN_VERSION_V1, claims_part, sig_part))
    }

    /// Storage-side check of a client token: signature first, then expiry
    pub fn verify_client_token(&self, token: &str, now_ms: i64) -> Result<UploadClaims, BlobError> {
        let (claims_part, sig_part) = match token.split('.').collect::<Vec<_>>().as_slice() {
            [version, claims, sig] if *version == TOKEN_VERSION_V1 => (*claims, *sig),
            [version, _, _] => {
                return Err(BlobError::InvalidToken(format!(
                    "unsupported token version: {}",
                    version
                )))
            }
            _ => return Err(BlobError::InvalidToken("malformed token".to_string())),
        };

        let expected = URL_SAFE_NO_PAD
            .decode(sig_part)
            .map_err(|e| BlobError::InvalidToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(claims_part.as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| BlobError::InvalidToken("token signature mismatch".to_string()))?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_part)
            .map_err(|e| BlobError::InvalidToken(e.to_string()))?;
        let claims: UploadClaims = serde_json::from_slice(&claims_bytes)
            .map_err(|e| BlobError::InvalidToken(e.to_string()))?;

        if claims.valid_until_ms < now_ms {
            return Err(BlobError::TokenExpired);
        }
        Ok(claims)
    }

    /// Signature the storage provider attaches to a completion callback body
    pub fn sign_callback(&self, body: &[u8]) -> Result<String, BlobError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    pub fn verify_callback(&self, body: &[u8], signature: Option<&str>) -> Result<(), BlobError> {
        let signature = signature.ok_or_else(|| {
            BlobError::InvalidToken("missing callback token signature".to_string())
        })?;
        let expected = URL_SAFE_NO_PAD
            .decode(signature.trim())
            .map_err(|e| BlobError::InvalidToken(e.to_string()))?;
        let mut mac = self.mac()?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| BlobError::InvalidToken("callback token signature mismatch".to_string()))
    }
}

/// Write the video row for a finished transfer.
///
/// The upload itself already succeeded, so a failed write is logged and
/// swallowed; the client notices through its metadata lookups.
pub async fn record_completed_upload(
    pool: &SqlitePool,
    completion: &UploadCompletion,
) -> Option<Video> {
    info!("Upload completed, saving metadata for {}", completion.blob.url);
    let payload = VideoPayload::from_token_payload(completion.token_payload.as_deref());

    match store::create_video(
        pool,
        payload.title(),
        payload.description.as_deref(),
        &completion.blob.url,
    )
    .await
    {
        Ok(video) => {
            info!("Video saved with ID: {}", video.id);
            Some(video)
        }
        Err(e) => {
            error!(
                "Failed to save video metadata for {}: {}",
                completion.blob.url, e
            );
            None
        }
    }
}
