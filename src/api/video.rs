//! Video analysis endpoints.
//!
//! Each handler follows the same sequence: admission check first (a denial
//! never reaches the orchestrator), then body validation, orchestration
//! inside a failure boundary, optional history persistence (never fatal),
//! and a success response carrying rate-limit headers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{classify, ApiError};
use crate::gemini::GeminiError;
use crate::history::{NewQuestionRecord, NewVideoRecord};
use crate::ratelimit::EndpointClass;
use crate::server::AppState;

use super::admission::{admit, with_rate_limit_headers};

const ANALYZE_CONTEXT: &str = "/api/video/analyze";
const QUESTION_CONTEXT: &str = "/api/video/question";
const TRANSCRIPT_CONTEXT: &str = "/api/video/transcript";

const API_KEY_FALLBACK: &str =
    "API key is required. Get your free Gemini API key at https://aistudio.google.com/app/apikey";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub video_source: Option<String>,
    #[serde(default)]
    pub include_summary: Option<bool>,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub transcript: String,
    pub insights: String,
    pub action_items: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub video_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRequest {
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub video_source: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub video_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequest {
    #[serde(default)]
    pub video_source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub transcript: String,
}

/// Per-endpoint failure boundary: tagged kinds pick the status/code, and
/// credential failures swap in the bring-your-own-key message.
fn gemini_failure(err: &GeminiError, fallback: &'static str, context: &'static str) -> Response {
    let fallback = if err.is_credential_error() {
        API_KEY_FALLBACK
    } else {
        fallback
    };
    ApiError::from_gemini(err, fallback)
        .with_context(context)
        .into_response()
}

fn body_rejection(rejection: JsonRejection, context: &'static str) -> Response {
    ApiError::normalize(
        format!("Invalid request body: {rejection}"),
        "Invalid request body.",
        StatusCode::BAD_REQUEST,
        Some(classify::INVALID_REQUEST),
    )
    .with_context(context)
    .into_response()
}

fn missing_field(details: &'static str, context: &'static str) -> Response {
    ApiError::invalid_request(details)
        .with_context(context)
        .into_response()
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[tracing::instrument(name = "http.analyze_video", skip(state, headers, payload))]
pub async fn analyze_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    // Authentication is optional; guests are limited by address.
    let admission = match admit(&state, &headers, EndpointClass::Analyze) {
        Ok(admission) => admission,
        Err(denied) => return denied,
    };

    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return body_rejection(rejection, ANALYZE_CONTEXT),
    };

    let Some(video_source) = present(&request.video_source) else {
        return missing_field("Missing or invalid 'videoSource'.", ANALYZE_CONTEXT);
    };
    let include_summary = request.include_summary.unwrap_or(true);

    let analysis = match state
        .analyzer
        .analyze(&video_source, include_summary, request.api_key.as_deref())
        .await
    {
        Ok(analysis) => analysis,
        Err(e) => return gemini_failure(&e, "Failed to analyze video.", ANALYZE_CONTEXT),
    };

    // Save to history only for authenticated users; failure must not fail
    // the request.
    let mut video_id = None;
    if let Some(user_id) = &admission.user_id {
        let record = NewVideoRecord {
            user_id: user_id.clone(),
            video_source: video_source.clone(),
            transcript: Some(analysis.transcript.clone()),
            summary: analysis.summary.clone(),
            insights: Some(analysis.insights.clone()),
            action_items: Some(analysis.action_items.clone()),
        };
        match state.history.insert_video(record).await {
            Ok(saved) => video_id = Some(saved.id),
            Err(e) => {
                tracing::error!(error = %e, user_id = %user_id, "Failed to save video to history");
            }
        }
    }

    let body = AnalyzeResponse {
        transcript: analysis.transcript,
        insights: analysis.insights,
        action_items: analysis.action_items,
        summary: analysis.summary,
        video_id,
    };

    with_rate_limit_headers(Json(body).into_response(), &admission.decision)
}

#[tracing::instrument(name = "http.answer_question", skip(state, headers, payload))]
pub async fn answer_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<QuestionRequest>, JsonRejection>,
) -> Response {
    let admission = match admit(&state, &headers, EndpointClass::Question) {
        Ok(admission) => admission,
        Err(denied) => return denied,
    };

    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return body_rejection(rejection, QUESTION_CONTEXT),
    };

    let Some(question) = present(&request.question) else {
        return missing_field("Missing or invalid 'question'.", QUESTION_CONTEXT);
    };

    let api_key = request.api_key.as_deref();
    let video_source = present(&request.video_source);

    // A caller that already holds a transcript gets the cheap path; the
    // video is never reprocessed.
    let answered = match present(&request.transcript) {
        Some(transcript) => {
            state
                .analyzer
                .answer_from_transcript(&transcript, &question, api_key)
                .await
        }
        None => {
            let Some(source) = video_source.as_deref() else {
                return missing_field(
                    "Missing 'videoSource'. Provide either a transcript or a videoSource.",
                    QUESTION_CONTEXT,
                );
            };
            state
                .analyzer
                .answer_from_source(source, &question, api_key)
                .await
        }
    };

    let answer = match answered {
        Ok(answer) => answer,
        Err(e) => return gemini_failure(&e, "Failed to answer question.", QUESTION_CONTEXT),
    };

    if let Some(user_id) = &admission.user_id {
        let record = NewQuestionRecord {
            user_id: user_id.clone(),
            video_id: request.video_id,
            video_source,
            question: question.clone(),
            answer: answer.clone(),
        };
        if let Err(e) = state.history.insert_question(record).await {
            tracing::error!(error = %e, user_id = %user_id, "Failed to save question to history");
        }
    }

    with_rate_limit_headers(
        Json(QuestionResponse { answer }).into_response(),
        &admission.decision,
    )
}

#[tracing::instrument(name = "http.generate_transcript", skip(state, headers, payload))]
pub async fn generate_transcript(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TranscriptRequest>, JsonRejection>,
) -> Response {
    let admission = match admit(&state, &headers, EndpointClass::Transcript) {
        Ok(admission) => admission,
        Err(denied) => return denied,
    };

    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return body_rejection(rejection, TRANSCRIPT_CONTEXT),
    };

    let Some(video_source) = present(&request.video_source) else {
        return missing_field("Missing or invalid 'videoSource'.", TRANSCRIPT_CONTEXT);
    };

    let transcript = match state.analyzer.fetch_transcript(&video_source, None).await {
        Ok(transcript) => transcript,
        Err(e) => return gemini_failure(&e, "Failed to generate transcript.", TRANSCRIPT_CONTEXT),
    };

    with_rate_limit_headers(
        Json(TranscriptResponse { transcript }).into_response(),
        &admission.decision,
    )
}
