use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc as StdArc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ServerConfig;
use crate::constants::BLOB_SIGNATURE_HEADER;
use crate::error::ApiError;
use crate::models::{
    CreateNoteRequest, CreateQuizRequest, DeleteResponse, NoteEnvelope, QuizEnvelope,
    SaveMetadataRequest, VideoEnvelope, VideoList,
};
use crate::store;
use crate::upload::{self, UploadAuthority, UploadEvent, GENERATE_CLIENT_TOKEN, UPLOAD_COMPLETED};

const BLOB_NOT_CONFIGURED: &str =
    "Blob storage is not configured. Please check your credentials.";

// State shared by all API handlers
pub struct AppState {
    pub pool: SqlitePool,
    /// None when no storage credentials were found; uploads then fail closed
    pub uploads: Option<UploadAuthority>,
}

/// Build the API router
pub fn build_router(state: StdArc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/videos", get(list_videos_handler))
        .route("/api/videos/save-metadata", post(save_metadata_handler))
        .route("/api/videos/{id}", get(get_video_handler))
        .route(
            "/api/notes",
            post(create_note_handler).delete(delete_note_handler),
        )
        .route(
            "/api/quizzes",
            post(create_quiz_handler).delete(delete_quiz_handler),
        )
        .route("/api/upload-video", post(upload_video_handler))
        .layer(cors)
        .with_state(state)
}

/// Resolve storage credentials; a miss is logged, not fatal
fn build_upload_authority(config: &ServerConfig) -> Option<UploadAuthority> {
    let credentials = match crate::credentials::load_credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("Failed to load credentials file: {}", e);
            None
        }
    };

    match crate::credentials::resolve_blob_token(&credentials, &config.blob.credential_profile) {
        Ok(secret) => Some(UploadAuthority::new(secret, &config.blob)),
        Err(e) => {
            warn!("Uploads disabled: {}", e);
            None
        }
    }
}

/// Run the API server until it is stopped
pub fn serve_api(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Database: {}", config.database_path.display());
    println!("Listening on: http://[::]:{} (IPv4 + IPv6)", config.api_port);
    println!("Endpoints:");
    println!("  GET    /health  - Health check");
    println!("  GET    /api/videos?url=<blob url>  - List videos");
    println!("  GET    /api/videos/:id  - Video with notes and quizzes");
    println!("  POST   /api/videos/save-metadata  - Record video metadata");
    println!("  POST   /api/notes  - Create note");
    println!("  DELETE /api/notes?id=<N>  - Delete note");
    println!("  POST   /api/quizzes  - Create quiz");
    println!("  DELETE /api/quizzes?id=<N>  - Delete quiz");
    println!("  POST   /api/upload-video  - Upload authorization and completion");

    let uploads = build_upload_authority(&config);
    if uploads.is_some() {
        println!("Blob uploads: ENABLED (store '{}')", config.blob.store_id);
    } else {
        println!("Blob uploads: DISABLED (no storage credentials)");
    }

    // Create tokio runtime and run server
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let pool = crate::db::open_and_init_database(&config.database_path).await?;
        let app = build_router(StdArc::new(AppState { pool, uploads }));

        let listener = tokio::net::TcpListener::bind(format!("[::]:{}", config.api_port))
            .await
            .map_err(|e| format!("Failed to bind to port {}: {}", config.api_port, e))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| format!("Server error: {}", e))?;

        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::Validation(format!("Invalid request body: {}", rejection.body_text()))
}

/// Parse a required `id` query parameter
fn require_id(id: Option<&str>, kind: &str) -> Result<i64, ApiError> {
    let id = id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("{} ID is required", kind)))?;
    id.parse()
        .map_err(|_| ApiError::Validation(format!("{} ID must be an integer", kind)))
}

// Health check endpoint - returns 200 OK if server is running
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Deserialize)]
struct ListVideosQuery {
    url: Option<String>,
}

// Unfiltered listings are wrapped in {videos}; URL lookups return a bare array
async fn list_videos_handler(
    State(state): State<StdArc<AppState>>,
    Query(query): Query<ListVideosQuery>,
) -> Result<Response, ApiError> {
    let blob_url = query.url.filter(|url| !url.is_empty());
    let videos = store::list_videos(&state.pool, blob_url.as_deref())
        .await
        .map_err(ApiError::from_store("Failed to fetch videos"))?;

    if blob_url.is_some() {
        Ok(Json(videos).into_response())
    } else {
        Ok(Json(VideoList { videos }).into_response())
    }
}

async fn get_video_handler(
    State(state): State<StdArc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound("Video not found".to_string());
    let id: i64 = id.parse().map_err(|_| not_found())?;

    let details = store::get_video_by_id(&state.pool, id)
        .await
        .map_err(ApiError::from_store("Failed to fetch video"))?
        .ok_or_else(not_found)?;

    Ok(Json(details).into_response())
}

async fn save_metadata_handler(
    State(state): State<StdArc<AppState>>,
    body: Result<Json<SaveMetadataRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;

    let (title, blob_url) = match (request.title, request.blob_url) {
        (Some(title), Some(blob_url)) if !title.is_empty() && !blob_url.is_empty() => {
            (title, blob_url)
        }
        _ => {
            return Err(ApiError::Validation(
                "Title and blob URL are required".to_string(),
            ))
        }
    };

    let video = store::create_video(
        &state.pool,
        &title,
        request.description.as_deref(),
        &blob_url,
    )
    .await
    .map_err(ApiError::from_store("Failed to save video metadata"))?;
    info!("Video saved to database: {}", video.id);

    Ok(Json(VideoEnvelope { video }).into_response())
}

async fn create_note_handler(
    State(state): State<StdArc<AppState>>,
    body: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;

    let (video_id, timestamp, text) = match (request.video_id, request.timestamp, request.note) {
        (Some(video_id), Some(timestamp), Some(text)) if !text.is_empty() => {
            (video_id, timestamp, text)
        }
        _ => return Err(ApiError::Validation("Missing required fields".to_string())),
    };

    let note = store::create_note(&state.pool, video_id, timestamp, &text)
        .await
        .map_err(ApiError::from_store("Failed to create note"))?;

    Ok(Json(NoteEnvelope { note }).into_response())
}

#[derive(Deserialize)]
struct DeleteQuery {
    id: Option<String>,
}

async fn delete_note_handler(
    State(state): State<StdArc<AppState>>,
    Query(query): Query<DeleteQuery>,
) -> Result<Response, ApiError> {
    let id = require_id(query.id.as_deref(), "Note")?;
    let removed = store::delete_note(&state.pool, id)
        .await
        .map_err(ApiError::from_store("Failed to delete note"))?;
    if removed == 0 {
        info!("Delete of note {} matched no rows", id);
    }

    Ok(Json(DeleteResponse { success: true }).into_response())
}

async fn create_quiz_handler(
    State(state): State<StdArc<AppState>>,
    body: Result<Json<CreateQuizRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = body.map_err(invalid_body)?;

    let (video_id, timestamp, question, options, correct_answer) = match (
        request.video_id,
        request.timestamp,
        request.question,
        request.options,
        request.correct_answer,
    ) {
        (Some(video_id), Some(timestamp), Some(question), Some(options), Some(correct_answer))
            if !question.is_empty() && !options.is_empty() =>
        {
            (video_id, timestamp, question, options, correct_answer)
        }
        _ => return Err(ApiError::Validation("Missing required fields".to_string())),
    };

    let quiz = store::create_quiz(
        &state.pool,
        video_id,
        timestamp,
        &question,
        &options,
        correct_answer,
    )
    .await
    .map_err(ApiError::from_store("Failed to create quiz"))?;

    Ok(Json(QuizEnvelope { quiz }).into_response())
}

async fn delete_quiz_handler(
    State(state): State<StdArc<AppState>>,
    Query(query): Query<DeleteQuery>,
) -> Result<Response, ApiError> {
    let id = require_id(query.id.as_deref(), "Quiz")?;
    let removed = store::delete_quiz(&state.pool, id)
        .await
        .map_err(ApiError::from_store("Failed to delete quiz"))?;
    if removed == 0 {
        info!("Delete of quiz {} matched no rows", id);
    }

    Ok(Json(DeleteResponse { success: true }).into_response())
}

// Token requests and storage completion callbacks share this endpoint
async fn upload_video_handler(
    State(state): State<StdArc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let authority = state
        .uploads
        .as_ref()
        .ok_or_else(|| ApiError::Configuration(BLOB_NOT_CONFIGURED.to_string()))?;

    let event: UploadEvent = serde_json::from_slice(&body)
        .map_err(|e| upload::BlobError::InvalidRequest(e.to_string()))?;

    match event {
        UploadEvent::GenerateClientToken(request) => {
            info!("Generating upload token for: {}", request.pathname);
            let client_token =
                authority.authorize(&request, chrono::Utc::now().timestamp_millis())?;
            Ok(Json(serde_json::json!({
                "type": GENERATE_CLIENT_TOKEN,
                "clientToken": client_token,
            }))
            .into_response())
        }
        UploadEvent::UploadCompleted(completion) => {
            let signature = headers
                .get(BLOB_SIGNATURE_HEADER)
                .and_then(|value| value.to_str().ok());
            authority.verify_callback(&body, signature)?;

            upload::record_completed_upload(&state.pool, &completion).await;
            Ok(Json(serde_json::json!({
                "type": UPLOAD_COMPLETED,
                "response": "ok",
            }))
            .into_response())
        }
    }
}
