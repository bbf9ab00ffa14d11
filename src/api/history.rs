//! History endpoints. Authenticated only; records are scoped to the caller.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{classify, ApiError};
use crate::history::{HistoryError, QuestionRecord, VideoRecord};
use crate::ratelimit::EndpointClass;
use crate::server::AppState;

use super::admission::{admit, with_rate_limit_headers, Admission};

const HISTORY_CONTEXT: &str = "/api/history";

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<VideoRecord>,
}

#[derive(Debug, Serialize)]
pub struct QuestionListResponse {
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Admission plus mandatory authentication.
fn admit_user(state: &AppState, headers: &HeaderMap) -> Result<(Admission, String), Response> {
    let admission = admit(state, headers, EndpointClass::History)?;
    match admission.user_id.clone() {
        Some(user_id) => Ok((admission, user_id)),
        None => Err(ApiError::unauthorized("Missing or invalid bearer token.")
            .with_context(HISTORY_CONTEXT)
            .into_response()),
    }
}

fn history_failure(err: HistoryError, fallback: &'static str) -> Response {
    match err {
        HistoryError::NotFound => {
            ApiError::new(StatusCode::NOT_FOUND, classify::NOT_FOUND, fallback, "record not found")
                .with_context(HISTORY_CONTEXT)
                .into_response()
        }
        other => ApiError::normalize(
            other.to_string(),
            fallback,
            StatusCode::INTERNAL_SERVER_ERROR,
            None,
        )
        .with_context(HISTORY_CONTEXT)
        .into_response(),
    }
}

#[tracing::instrument(name = "http.list_videos", skip(state, headers))]
pub async fn list_videos(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (admission, user_id) = match admit_user(&state, &headers) {
        Ok(ok) => ok,
        Err(resp) => return resp,
    };

    match state.history.list_videos(&user_id).await {
        Ok(videos) => with_rate_limit_headers(
            Json(VideoListResponse { videos }).into_response(),
            &admission.decision,
        ),
        Err(e) => history_failure(e, "Failed to load video history."),
    }
}

#[tracing::instrument(name = "http.delete_video", skip(state, headers))]
pub async fn delete_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let (admission, user_id) = match admit_user(&state, &headers) {
        Ok(ok) => ok,
        Err(resp) => return resp,
    };

    match state.history.delete_video(&user_id, id).await {
        Ok(()) => with_rate_limit_headers(
            Json(DeleteResponse { deleted: true }).into_response(),
            &admission.decision,
        ),
        Err(e) => history_failure(e, "Failed to delete video."),
    }
}

#[tracing::instrument(name = "http.list_questions", skip(state, headers))]
pub async fn list_questions(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (admission, user_id) = match admit_user(&state, &headers) {
        Ok(ok) => ok,
        Err(resp) => return resp,
    };

    match state.history.list_questions(&user_id).await {
        Ok(questions) => with_rate_limit_headers(
            Json(QuestionListResponse { questions }).into_response(),
            &admission.decision,
        ),
        Err(e) => history_failure(e, "Failed to load question history."),
    }
}

#[tracing::instrument(name = "http.delete_question", skip(state, headers))]
pub async fn delete_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Response {
    let (admission, user_id) = match admit_user(&state, &headers) {
        Ok(ok) => ok,
        Err(resp) => return resp,
    };

    match state.history.delete_question(&user_id, id).await {
        Ok(()) => with_rate_limit_headers(
            Json(DeleteResponse { deleted: true }).into_response(),
            &admission.decision,
        ),
        Err(e) => history_failure(e, "Failed to delete question."),
    }
}
