//! # Upload Tests
//!
//! Drives `POST /api/upload-video` through both halves of a direct upload:
//! the client token request and the storage provider's completion callback.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test upload_test
//! ```

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use annotated_video::client::ApiClient;
use annotated_video::config::BlobConfig;
use annotated_video::constants::{BLOB_SIGNATURE_HEADER, DEFAULT_VIDEO_TITLE};
use annotated_video::serve::{build_router, AppState};
use annotated_video::upload::UploadAuthority;
use annotated_video::upload_session::{
    confirm_upload, Destination, RetryPolicy, UploadPhase, UploadRequest, UploadSession,
};

const SECRET: &str = "test-read-write-secret";

fn authority() -> UploadAuthority {
    UploadAuthority::new(SECRET, &BlobConfig::default())
}

async fn start_server(uploads: Option<UploadAuthority>) -> (String, tempfile::TempDir) {
    let (pool, guard) = annotated_video::db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    let app = build_router(Arc::new(AppState { pool, uploads }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), guard)
}

fn token_request(pathname: &str, content_type: &str) -> Value {
    json!({
        "type": "blob.generate-client-token",
        "payload": {
            "pathname": pathname,
            "contentType": content_type,
            "clientPayload": "{\"title\":\"Intro\",\"description\":\"Week 1\"}",
            "multipart": false
        }
    })
}

fn completion(url: &str, token_payload: Option<&str>) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "type": "blob.upload-completed",
        "payload": {
            "blob": {"url": url, "pathname": "intro.mp4", "contentType": "video/mp4"},
            "tokenPayload": token_payload
        }
    }))
    .unwrap()
}

/// Play the storage provider: sign the body and post it back
async fn send_completion(base: &str, body: Vec<u8>, signature: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/api/upload-video", base))
        .header("content-type", "application/json")
        .header(BLOB_SIGNATURE_HEADER, signature)
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_token_request_accepts_video() {
    let (base, _guard) = start_server(Some(authority())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-video", base))
        .json(&token_request("intro.mp4", "video/mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["type"], "blob.generate-client-token");

    let token = body["clientToken"].as_str().unwrap();
    let claims = authority()
        .verify_client_token(token, chrono::Utc::now().timestamp_millis())
        .unwrap();
    assert!(claims.pathname.starts_with("intro-"));
    assert_eq!(
        claims.token_payload.as_deref(),
        Some("{\"title\":\"Intro\",\"description\":\"Week 1\"}")
    );
}

#[tokio::test]
async fn test_token_request_rejects_pdf() {
    let (base, _guard) = start_server(Some(authority())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-video", base))
        .json(&token_request("notes.pdf", "application/pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("content type"));
}

#[tokio::test]
async fn test_token_request_rejects_oversized() {
    let (base, _guard) = start_server(Some(authority())).await;
    let mut request = token_request("huge.mp4", "video/mp4");
    request["payload"]["size"] = json!(BlobConfig::default().max_upload_bytes + 1);

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-video", base))
        .json(&request)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_missing_credentials_fail_closed() {
    let (base, _guard) = start_server(None).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-video", base))
        .json(&token_request("intro.mp4", "video/mp4"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Blob storage is not configured. Please check your credentials."
    );
}

#[tokio::test]
async fn test_malformed_upload_body() {
    let (base, _guard) = start_server(Some(authority())).await;

    let response = reqwest::Client::new()
        .post(format!("{}/api/upload-video", base))
        .json(&json!({"type": "blob.something-else"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_completion_requires_valid_signature() {
    let (base, _guard) = start_server(Some(authority())).await;
    let client = ApiClient::new(&base).unwrap();

    let body = completion("http://blob/intro.mp4", None);
    let forged = UploadAuthority::new("someone-else", &BlobConfig::default())
        .sign_callback(&body)
        .unwrap();
    let response = send_completion(&base, body, &forged).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let error: Value = response.json().await.unwrap();
    assert!(error["error"].as_str().unwrap().contains("token"));

    assert!(client
        .find_videos_by_url("http://blob/intro.mp4")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_completion_records_video_from_payload() {
    let (base, _guard) = start_server(Some(authority())).await;
    let client = ApiClient::new(&base).unwrap();

    let body = completion(
        "http://blob/intro.mp4",
        Some("{\"title\":\"Intro\",\"description\":\"\"}"),
    );
    let signature = authority().sign_callback(&body).unwrap();
    let response = send_completion(&base, body, &signature).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack, json!({"type": "blob.upload-completed", "response": "ok"}));

    let videos = client
        .find_videos_by_url("http://blob/intro.mp4")
        .await
        .unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].title, "Intro");
    assert_eq!(videos[0].description, None);
}

#[tokio::test]
async fn test_completion_with_unreadable_payload_uses_placeholder_title() {
    let (base, _guard) = start_server(Some(authority())).await;
    let client = ApiClient::new(&base).unwrap();

    let body = completion("http://blob/raw.mp4", Some("not json"));
    let signature = authority().sign_callback(&body).unwrap();
    assert_eq!(
        send_completion(&base, body, &signature).await.status(),
        StatusCode::OK
    );

    let videos = client.find_videos_by_url("http://blob/raw.mp4").await.unwrap();
    assert_eq!(videos[0].title, DEFAULT_VIDEO_TITLE);
}

#[tokio::test]
async fn test_completion_acknowledged_when_metadata_write_fails() {
    let (base, _guard) = start_server(Some(authority())).await;
    let client = ApiClient::new(&base).unwrap();

    // A blank blob URL fails store validation inside the callback
    let body = completion("  ", Some("{\"title\":\"Intro\"}"));
    let signature = authority().sign_callback(&body).unwrap();
    let response = send_completion(&base, body, &signature).await;
    assert_eq!(response.status(), StatusCode::OK);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack, json!({"type": "blob.upload-completed", "response": "ok"}));

    assert!(client.find_videos_by_url("  ").await.unwrap().is_empty());
    assert!(client.list_videos().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_full_upload_session() {
    let (base, _guard) = start_server(Some(authority())).await;
    let client = ApiClient::new(&base).unwrap();
    let policy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_millis(20),
    };

    let mut session = UploadSession::new(UploadRequest {
        title: "Lecture 2".to_string(),
        description: Some("Recursion".to_string()),
        file_name: "lecture2.webm".to_string(),
        content_type: "video/webm".to_string(),
        size: 4096,
    })
    .unwrap();

    let token = client
        .request_client_token(session.request().token_request())
        .await
        .unwrap();
    let claims = authority()
        .verify_client_token(&token, chrono::Utc::now().timestamp_millis())
        .unwrap();
    claims.check_upload("video/webm", 4096).unwrap();
    session.authorized(token).unwrap();
    session.progress(50.0).unwrap();
    session.progress(100.0).unwrap();

    let blob_url = format!("http://blob/{}", claims.pathname);
    let body = completion(&blob_url, claims.token_payload.as_deref());
    let signature = authority().sign_callback(&body).unwrap();
    send_completion(&base, body, &signature).await;
    session.completed(blob_url.clone()).unwrap();

    let destination = confirm_upload(
        |url| {
            let client = client.clone();
            async move { client.find_videos_by_url(&url).await }
        },
        &blob_url,
        policy,
    )
    .await
    .unwrap();
    session.settle(destination).unwrap();

    let id = match session.phase() {
        UploadPhase::Confirmed(id) => *id,
        other => panic!("unexpected phase {:?}", other),
    };
    let details = client.get_video(id).await.unwrap();
    assert_eq!(details.video.title, "Lecture 2");
    assert_eq!(details.video.description.as_deref(), Some("Recursion"));
}

#[tokio::test]
async fn test_confirm_falls_back_to_listing() {
    let (base, _guard) = start_server(Some(authority())).await;
    let client = ApiClient::new(&base).unwrap();

    let destination = confirm_upload(
        |url| {
            let client = client.clone();
            async move { client.find_videos_by_url(&url).await }
        },
        "http://blob/never-recorded.mp4",
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(5),
        },
    )
    .await
    .unwrap();
    assert_eq!(destination, Destination::Listing);
}
