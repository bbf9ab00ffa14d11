//! End-to-end tests through the HTTP router.
//!
//! These tests assemble real components with in-memory backends and a
//! scripted generation double, then drive the axum Router directly without
//! binding a socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use clipsight::config::{RateLimitSettings, Settings, WindowSettings};
use clipsight::gemini::{GeminiError, GenerateContent, Part};
use clipsight::history::{
    HistoryError, HistoryStore, MemoryHistoryStore, NewQuestionRecord, NewVideoRecord,
    QuestionRecord, VideoRecord,
};
use clipsight::server::{create_app, AppState};

const SOURCE: &str = "https://www.youtube.com/watch?v=abc123";
const JWT_SECRET: &str = "integration-test-secret";

/// Scripted generation double: transcript/summary/insights/action-item
/// prompts get canned answers, and every call is counted.
struct ScriptedGenerator {
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerateContent for ScriptedGenerator {
    async fn generate(
        &self,
        parts: &[Part],
        _api_key_override: Option<&str>,
    ) -> Result<String, GeminiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt = parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(text) => Some(text.as_str()),
                Part::VideoUri(_) => None,
            })
            .collect::<Vec<_>>()
            .join(" ");

        if prompt.contains("transcribe this video") {
            Ok("the transcript".to_string())
        } else if prompt.contains("summarizes meeting or video transcripts") {
            Ok("the summary".to_string())
        } else if prompt.contains("key insights") {
            Ok("the insights".to_string())
        } else if prompt.contains("actionable tasks") {
            Ok("the action items".to_string())
        } else {
            Ok("the answer".to_string())
        }
    }
}

/// History backend whose writes always fail; reads are empty.
struct FailingHistoryStore;

#[async_trait]
impl HistoryStore for FailingHistoryStore {
    async fn insert_video(&self, _record: NewVideoRecord) -> Result<VideoRecord, HistoryError> {
        Err(HistoryError::NotFound)
    }

    async fn list_videos(&self, _user_id: &str) -> Result<Vec<VideoRecord>, HistoryError> {
        Ok(vec![])
    }

    async fn delete_video(&self, _user_id: &str, _id: Uuid) -> Result<(), HistoryError> {
        Err(HistoryError::NotFound)
    }

    async fn insert_question(
        &self,
        _record: NewQuestionRecord,
    ) -> Result<QuestionRecord, HistoryError> {
        Err(HistoryError::NotFound)
    }

    async fn list_questions(&self, _user_id: &str) -> Result<Vec<QuestionRecord>, HistoryError> {
        Ok(vec![])
    }

    async fn delete_question(&self, _user_id: &str, _id: Uuid) -> Result<(), HistoryError> {
        Err(HistoryError::NotFound)
    }
}

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.jwt_secret = Some(JWT_SECRET.to_string());
    settings
}

fn create_test_app_with(
    settings: Settings,
    generator: Arc<dyn GenerateContent>,
    history: Arc<dyn HistoryStore>,
) -> Router {
    create_app(AppState::new(settings, generator, history))
}

fn create_test_app() -> (Router, Arc<ScriptedGenerator>, Arc<MemoryHistoryStore>) {
    let generator = Arc::new(ScriptedGenerator::new());
    let history = Arc::new(MemoryHistoryStore::new());
    let app = create_test_app_with(test_settings(), generator.clone(), history.clone());
    (app, generator, history)
}

fn bearer_token(user_id: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let claims = clipsight::auth::Claims {
        sub: user_id.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        iat: chrono::Utc::now().timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_authed(uri: &str, body: Value, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =============================================================================
// Video endpoints
// =============================================================================

#[tokio::test]
async fn test_analyze_happy_path() {
    let (app, generator, _) = create_test_app();

    let response = app
        .oneshot(post_json("/api/video/analyze", json!({ "videoSource": SOURCE })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-RateLimit-Limit").unwrap(),
        "10"
    );
    assert_eq!(
        response.headers().get("X-RateLimit-Remaining").unwrap(),
        "9"
    );
    assert!(response.headers().contains_key("X-RateLimit-Reset"));

    let body = body_json(response).await;
    assert_eq!(body["transcript"], "the transcript");
    assert_eq!(body["insights"], "the insights");
    assert_eq!(body["actionItems"], "the action items");
    assert_eq!(body["summary"], "the summary");
    assert_eq!(body["videoId"], Value::Null);

    // transcript + summary + insights + action items
    assert_eq!(generator.call_count(), 4);
}

#[tokio::test]
async fn test_analyze_without_summary_omits_field() {
    let (app, generator, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/video/analyze",
            json!({ "videoSource": SOURCE, "includeSummary": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body.get("summary").is_none());
    assert_eq!(generator.call_count(), 3);
}

#[tokio::test]
async fn test_analyze_missing_source_is_invalid_request() {
    let (app, generator, _) = create_test_app();

    let response = app
        .oneshot(post_json("/api/video/analyze", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errorCode"], "INVALID_REQUEST");
    assert_eq!(body["error"], "Invalid request body.");
    assert_eq!(body["context"], "/api/video/analyze");
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_unsupported_source() {
    let (app, generator, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/video/analyze",
            json!({ "videoSource": "https://example.com/x" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errorCode"], "UNSUPPORTED_VIDEO_SOURCE");
    // Validation rejected the source before any upstream call.
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_persists_for_authenticated_user() {
    let (app, _, history) = create_test_app();
    let token = bearer_token("user-42");

    let response = app
        .oneshot(post_json_authed(
            "/api/video/analyze",
            json!({ "videoSource": SOURCE }),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["videoId"].is_string());

    let records = history.list_videos("user-42").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].video_source, SOURCE);
    assert_eq!(records[0].transcript.as_deref(), Some("the transcript"));
}

#[tokio::test]
async fn test_persistence_failure_does_not_fail_request() {
    let generator = Arc::new(ScriptedGenerator::new());
    let app = create_test_app_with(
        test_settings(),
        generator.clone(),
        Arc::new(FailingHistoryStore),
    );
    let token = bearer_token("user-42");

    let response = app
        .oneshot(post_json_authed(
            "/api/video/analyze",
            json!({ "videoSource": SOURCE }),
            &token,
        ))
        .await
        .unwrap();

    // The store threw, the caller still gets the full 200.
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["transcript"], "the transcript");
    assert_eq!(body["videoId"], Value::Null);
}

#[tokio::test]
async fn test_question_from_transcript() {
    let (app, generator, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/video/question",
            json!({ "question": "what happened?", "transcript": "the transcript" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["answer"], "the answer");
    // Transcript path is a single generation call.
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_question_requires_transcript_or_source() {
    let (app, _, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/video/question",
            json!({ "question": "what happened?" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errorCode"], "INVALID_REQUEST");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .contains("Provide either a transcript or a videoSource"));
}

#[tokio::test]
async fn test_question_persists_for_authenticated_user() {
    let (app, _, history) = create_test_app();
    let token = bearer_token("user-7");

    let response = app
        .oneshot(post_json_authed(
            "/api/video/question",
            json!({ "question": "what happened?", "transcript": "the transcript" }),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let records = history.list_questions("user-7").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].question, "what happened?");
    assert_eq!(records[0].answer, "the answer");
}

#[tokio::test]
async fn test_transcript_endpoint() {
    let (app, generator, _) = create_test_app();

    let response = app
        .oneshot(post_json(
            "/api/video/transcript",
            json!({ "videoSource": SOURCE }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["transcript"], "the transcript");
    assert_eq!(generator.call_count(), 1);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_request() {
    let (app, _, _) = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/video/analyze")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["errorCode"], "INVALID_REQUEST");
}

// =============================================================================
// Rate limiting through the HTTP surface
// =============================================================================

#[tokio::test]
async fn test_rate_limit_denial_shape() {
    let mut settings = test_settings();
    settings.rate_limit = RateLimitSettings {
        analyze: WindowSettings {
            window_seconds: 3600,
            max_requests: 2,
        },
        ..RateLimitSettings::default()
    };
    let generator = Arc::new(ScriptedGenerator::new());
    let app = create_test_app_with(settings, generator.clone(), Arc::new(MemoryHistoryStore::new()));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json("/api/video/analyze", json!({ "videoSource": SOURCE })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    let calls_before_denial = generator.call_count();

    let response = app
        .oneshot(post_json("/api/video/analyze", json!({ "videoSource": SOURCE })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(
        response.headers().get("X-RateLimit-Remaining").unwrap(),
        "0"
    );
    assert!(response.headers().contains_key("Retry-After"));
    assert!(response.headers().contains_key("X-RateLimit-Reset"));

    let body = body_json(response).await;
    assert_eq!(body["error"], "Rate limit exceeded");
    assert_eq!(body["limit"], 2);
    assert!(body["retryAfter"].as_u64().unwrap() <= 3600);
    assert!(body["reset"].as_i64().unwrap() > 0);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("limit of 2 video analyses per hour"));

    // The denied request never reached the orchestrator.
    assert_eq!(generator.call_count(), calls_before_denial);
}

#[tokio::test]
async fn test_rate_limit_scopes_by_identifier() {
    let mut settings = test_settings();
    settings.rate_limit = RateLimitSettings {
        analyze: WindowSettings {
            window_seconds: 3600,
            max_requests: 1,
        },
        ..RateLimitSettings::default()
    };
    let app = create_test_app_with(
        settings,
        Arc::new(ScriptedGenerator::new()),
        Arc::new(MemoryHistoryStore::new()),
    );

    let from_ip = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/video/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip.to_string())
            .body(Body::from(json!({ "videoSource": SOURCE }).to_string()))
            .unwrap()
    };

    let first = app.clone().oneshot(from_ip("203.0.113.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let denied = app.clone().oneshot(from_ip("203.0.113.1")).await.unwrap();
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    // A different caller keeps its own budget.
    let other = app.oneshot(from_ip("203.0.113.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_requests_admit_exactly_limit() {
    let mut settings = test_settings();
    settings.rate_limit = RateLimitSettings {
        question: WindowSettings {
            window_seconds: 3600,
            max_requests: 5,
        },
        ..RateLimitSettings::default()
    };
    let app = create_test_app_with(
        settings,
        Arc::new(ScriptedGenerator::new()),
        Arc::new(MemoryHistoryStore::new()),
    );

    let requests = (0..10).map(|_| {
        let app = app.clone();
        async move {
            app.oneshot(post_json(
                "/api/video/question",
                json!({ "question": "q", "transcript": "t" }),
            ))
            .await
            .unwrap()
            .status()
        }
    });

    let statuses = futures::future::join_all(requests).await;
    let ok = statuses.iter().filter(|s| **s == StatusCode::OK).count();
    let denied = statuses
        .iter()
        .filter(|s| **s == StatusCode::TOO_MANY_REQUESTS)
        .count();

    assert_eq!(ok, 5);
    assert_eq!(denied, 5);
}

// =============================================================================
// History endpoints
// =============================================================================

#[tokio::test]
async fn test_history_requires_authentication() {
    let (app, _, _) = create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/api/history/videos")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["errorCode"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_history_list_and_delete() {
    let (app, _, history) = create_test_app();
    let token = bearer_token("user-9");

    let inserted = history
        .insert_video(NewVideoRecord {
            user_id: "user-9".to_string(),
            video_source: SOURCE.to_string(),
            transcript: Some("the transcript".to_string()),
            summary: None,
            insights: None,
            action_items: None,
        })
        .await
        .unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/history/videos")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["videos"].as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/history/videos/{}", inserted.id))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(history.list_videos("user-9").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_history_delete_is_owner_scoped() {
    let (app, _, history) = create_test_app();

    let inserted = history
        .insert_video(NewVideoRecord {
            user_id: "owner".to_string(),
            video_source: SOURCE.to_string(),
            transcript: None,
            summary: None,
            insights: None,
            action_items: None,
        })
        .await
        .unwrap();

    // A different user cannot delete the record.
    let token = bearer_token("intruder");
    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/history/videos/{}", inserted.id))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(history.list_videos("owner").await.unwrap().len(), 1);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _, _) = create_test_app();

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}
