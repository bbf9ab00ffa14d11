use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::server::AppState;

use super::health::health;
use super::history::{delete_question, delete_video, list_questions, list_videos};
use super::video::{analyze_video, answer_question, generate_transcript};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health))
        // Video + history endpoints
        .nest(
            "/api",
            Router::new()
                .route("/video/analyze", post(analyze_video))
                .route("/video/question", post(answer_question))
                .route("/video/transcript", post(generate_transcript))
                .route("/history/videos", get(list_videos))
                .route("/history/videos/{id}", delete(delete_video))
                .route("/history/questions", get(list_questions))
                .route("/history/questions/{id}", delete(delete_question)),
        )
}
