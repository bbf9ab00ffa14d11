//! Per-user history of analyses and questions.
//!
//! Persistence is an external concern behind the `HistoryStore` trait; the
//! service works identically against the in-memory backend (development,
//! tests) and PostgreSQL. A persistence failure is never allowed to fail the
//! request that produced the record.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::DatabaseConfig;

pub use memory::MemoryHistoryStore;
pub use postgres::PostgresHistoryStore;

/// A persisted analysis result.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    pub id: Uuid,
    pub user_id: String,
    pub video_source: String,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub insights: Option<String>,
    pub action_items: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideoRecord {
    pub user_id: String,
    pub video_source: String,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub insights: Option<String>,
    pub action_items: Option<String>,
}

/// A persisted question/answer pair, optionally linked to a video record.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub video_id: Option<Uuid>,
    pub video_source: Option<String>,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub user_id: String,
    pub video_id: Option<Uuid>,
    pub video_source: Option<String>,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("record not found")]
    NotFound,
}

/// Insert/select/delete surface of the external store. All reads and deletes
/// are scoped to the owning user.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert_video(&self, record: NewVideoRecord) -> Result<VideoRecord, HistoryError>;

    async fn list_videos(&self, user_id: &str) -> Result<Vec<VideoRecord>, HistoryError>;

    async fn delete_video(&self, user_id: &str, id: Uuid) -> Result<(), HistoryError>;

    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionRecord, HistoryError>;

    async fn list_questions(&self, user_id: &str) -> Result<Vec<QuestionRecord>, HistoryError>;

    async fn delete_question(&self, user_id: &str, id: Uuid) -> Result<(), HistoryError>;
}

/// Pick a backend from configuration: PostgreSQL when a database URL is
/// configured and reachable, the in-memory store otherwise.
pub async fn create_history_store(config: &DatabaseConfig) -> Arc<dyn HistoryStore> {
    match &config.url {
        Some(_) => match PostgresHistoryStore::connect(config).await {
            Ok(store) => {
                tracing::info!(backend = "postgres", "History store initialized");
                Arc::new(store)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to connect history database, falling back to in-memory store"
                );
                Arc::new(MemoryHistoryStore::new())
            }
        },
        None => {
            tracing::info!(backend = "memory", "History store initialized");
            Arc::new(MemoryHistoryStore::new())
        }
    }
}
