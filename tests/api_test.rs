//! # API Tests
//!
//! End-to-end tests for the video, note and quiz endpoints. Each test opens a
//! temporary SQLite database, serves the router on an ephemeral port and talks
//! to it over HTTP.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test api_test
//! ```

use reqwest::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

use annotated_video::client::{ApiClient, ClientError};
use annotated_video::serve::{build_router, AppState};
use annotated_video::session::{PlayerSession, PlayerSessionError};

/// Start the API on 127.0.0.1 with a fresh database
async fn start_server() -> (String, tempfile::TempDir) {
    let (pool, guard) = annotated_video::db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    let app = build_router(Arc::new(AppState {
        pool,
        uploads: None,
    }));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), guard)
}

#[tokio::test]
async fn test_health() {
    let (base, _guard) = start_server().await;
    let response = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_save_metadata_then_filter_by_url() {
    let (base, _guard) = start_server().await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/api/videos/save-metadata", base))
        .json(&json!({"title": "T", "blobUrl": "http://x/y.mp4"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["video"]["title"], "T");
    assert_eq!(body["video"]["blob_url"], "http://x/y.mp4");
    assert!(body["video"]["description"].is_null());
    let id = body["video"]["id"].as_i64().unwrap();

    // A second video that must not match the filter
    http.post(format!("{}/api/videos/save-metadata", base))
        .json(&json!({"title": "Other", "blobUrl": "http://x/z.mp4"}))
        .send()
        .await
        .unwrap();

    let filtered: Value = http
        .get(format!("{}/api/videos", base))
        .query(&[("url", "http://x/y.mp4")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["id"].as_i64(), Some(id));

    let all: Value = http
        .get(format!("{}/api/videos", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let videos = all["videos"].as_array().unwrap();
    assert_eq!(videos.len(), 2);
    // Newest first
    assert_eq!(videos[0]["title"], "Other");
}

#[tokio::test]
async fn test_save_metadata_requires_title_and_url() {
    let (base, _guard) = start_server().await;
    let http = reqwest::Client::new();

    for body in [
        json!({"blobUrl": "http://x/y.mp4"}),
        json!({"title": "T"}),
        json!({"title": "", "blobUrl": "http://x/y.mp4"}),
    ] {
        let response = http
            .post(format!("{}/api/videos/save-metadata", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Title and blob URL are required");
    }

    let response = http
        .post(format!("{}/api/videos/save-metadata", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_video_without_annotations_has_empty_lists() {
    let (base, _guard) = start_server().await;
    let client = ApiClient::new(&base).unwrap();

    let video = client
        .save_metadata("Lecture", Some("Week 1"), "http://x/lecture.mp4")
        .await
        .unwrap();
    assert_eq!(video.description.as_deref(), Some("Week 1"));

    let details = client.get_video(video.id).await.unwrap();
    assert_eq!(details.video, video);
    assert!(details.notes.is_empty());
    assert!(details.quizzes.is_empty());

    let raw: Value = reqwest::get(format!("{}/api/videos/{}", base, video.id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(raw["notes"], json!([]));
    assert_eq!(raw["quizzes"], json!([]));
}

#[tokio::test]
async fn test_unknown_video_is_404() {
    let (base, _guard) = start_server().await;

    for path in ["999", "abc"] {
        let response = reqwest::get(format!("{}/api/videos/{}", base, path))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "Video not found");
    }

    let client = ApiClient::new(&base).unwrap();
    assert!(matches!(
        client.get_video(999).await,
        Err(ClientError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_note_lifecycle() {
    let (base, _guard) = start_server().await;
    let client = ApiClient::new(&base).unwrap();
    let http = reqwest::Client::new();
    let video = client
        .save_metadata("Lecture", None, "http://x/lecture.mp4")
        .await
        .unwrap();

    // videoId may arrive as a string
    let response = http
        .post(format!("{}/api/notes", base))
        .json(&json!({"videoId": video.id.to_string(), "timestamp": 12.5, "note": "later"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let later: Value = response.json().await.unwrap();
    assert_eq!(later["note"]["timestamp"], 12.5);

    let early = client.create_note(video.id, 0.0, "start").await.unwrap();
    assert_eq!(early.video_id, video.id);

    let details = client.get_video(video.id).await.unwrap();
    let texts: Vec<&str> = details.notes.iter().map(|n| n.note.as_str()).collect();
    assert_eq!(texts, vec!["start", "later"]);

    client.delete_note(early.id).await.unwrap();
    let details = client.get_video(video.id).await.unwrap();
    assert_eq!(details.notes.len(), 1);
    assert!(details.notes.iter().all(|n| n.id != early.id));

    // Deleting again is not an error
    client.delete_note(early.id).await.unwrap();
}

#[tokio::test]
async fn test_note_validation() {
    let (base, _guard) = start_server().await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/api/notes", base))
        .json(&json!({"videoId": 1, "note": "no timestamp"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");

    let response = http
        .delete(format!("{}/api/notes", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Note ID is required");

    let response = http
        .delete(format!("{}/api/notes?id=abc", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quiz_lifecycle() {
    let (base, _guard) = start_server().await;
    let client = ApiClient::new(&base).unwrap();
    let video = client
        .save_metadata("Lecture", None, "http://x/lecture.mp4")
        .await
        .unwrap();
    let options: Vec<String> = ["3", "4", "5", "22"].iter().map(|s| s.to_string()).collect();

    let quiz = client
        .create_quiz(video.id, 30.0, "2 + 2?", &options, 1)
        .await
        .unwrap();
    assert_eq!(quiz.options, options);
    assert_eq!(quiz.correct_answer, 1);
    client
        .create_quiz(video.id, 10.0, "First?", &options, 0)
        .await
        .unwrap();

    let details = client.get_video(video.id).await.unwrap();
    let times: Vec<f64> = details.quizzes.iter().map(|q| q.timestamp).collect();
    assert_eq!(times, vec![10.0, 30.0]);

    client.delete_quiz(quiz.id).await.unwrap();
    let details = client.get_video(video.id).await.unwrap();
    assert_eq!(details.quizzes.len(), 1);
    assert!(details.quizzes.iter().all(|q| q.id != quiz.id));

    // Deleting again is not an error
    client.delete_quiz(quiz.id).await.unwrap();
    let details = client.get_video(video.id).await.unwrap();
    assert_eq!(details.quizzes.len(), 1);
}

#[tokio::test]
async fn test_quiz_validation() {
    let (base, _guard) = start_server().await;
    let client = ApiClient::new(&base).unwrap();
    let http = reqwest::Client::new();
    let video = client
        .save_metadata("Lecture", None, "http://x/lecture.mp4")
        .await
        .unwrap();

    for body in [
        json!({"videoId": video.id, "timestamp": 1.0, "question": "Q", "options": [], "correctAnswer": 0}),
        json!({"videoId": video.id, "timestamp": 1.0, "question": "Q", "options": ["a"]}),
        json!({"videoId": video.id, "timestamp": 1.0, "options": ["a"], "correctAnswer": 0}),
    ] {
        let response = http
            .post(format!("{}/api/quizzes", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let err = client
        .create_quiz(video.id, 1.0, "Q", &["a".to_string()], 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Api { status, .. } if status == StatusCode::BAD_REQUEST));

    let response = http
        .delete(format!("{}/api/quizzes", base))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Quiz ID is required");
}

#[tokio::test]
async fn test_player_session_adds_at_position() {
    let (base, _guard) = start_server().await;
    let client = ApiClient::new(&base).unwrap();
    let video = client
        .save_metadata("Lecture", None, "http://x/lecture.mp4")
        .await
        .unwrap();

    let mut session = PlayerSession::open(client, video.id).await.unwrap();
    session.engine_mut().seek(42.0);
    let note = session.add_note("remember this").await.unwrap();
    assert_eq!(note.timestamp, 42.0);

    let options = vec!["yes".to_string(), " ".to_string()];
    assert!(matches!(
        session.add_quiz("Ready?", &options, 0).await,
        Err(PlayerSessionError::Form(_))
    ));

    let options = vec!["yes".to_string(), "no".to_string()];
    let quiz = session.add_quiz("Ready?", &options, 0).await.unwrap();
    assert_eq!(session.engine().timeline().len(), 2);

    session.delete_note(note.id).await;
    session.delete_quiz(quiz.id).await;
    assert!(session.engine().timeline().is_empty());
    assert_eq!(session.engine().position(), 42.0);
}
