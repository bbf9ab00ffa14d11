//! PostgreSQL history backend.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::DatabaseConfig;

use super::{
    HistoryError, HistoryStore, NewQuestionRecord, NewVideoRecord, QuestionRecord, VideoRecord,
};

pub struct PostgresHistoryStore {
    pool: PgPool,
}

impl PostgresHistoryStore {
    /// Connect a pool from configuration. Expects `videos` and `questions`
    /// tables matching the record shapes (see `migrations/`).
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, HistoryError> {
        let url = config.url.as_deref().ok_or_else(|| {
            HistoryError::Database(sqlx::Error::Configuration(
                "database.url is not configured".into(),
            ))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect(url)
            .await?;

        tracing::info!(
            pool_size = config.pool_size,
            "PostgreSQL connection pool created"
        );

        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn insert_video(&self, record: NewVideoRecord) -> Result<VideoRecord, HistoryError> {
        let stored = sqlx::query_as::<_, VideoRecord>(
            r#"
            INSERT INTO videos (id, user_id, video_source, transcript, summary, insights, action_items, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            RETURNING id, user_id, video_source, transcript, summary, insights, action_items, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(&record.video_source)
        .bind(&record.transcript)
        .bind(&record.summary)
        .bind(&record.insights)
        .bind(&record.action_items)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_videos(&self, user_id: &str) -> Result<Vec<VideoRecord>, HistoryError> {
        let records = sqlx::query_as::<_, VideoRecord>(
            r#"
            SELECT id, user_id, video_source, transcript, summary, insights, action_items, created_at
            FROM videos
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete_video(&self, user_id: &str, id: Uuid) -> Result<(), HistoryError> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HistoryError::NotFound);
        }
        Ok(())
    }

    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionRecord, HistoryError> {
        let stored = sqlx::query_as::<_, QuestionRecord>(
            r#"
            INSERT INTO questions (id, user_id, video_id, video_source, question, answer, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            RETURNING id, user_id, video_id, video_source, question, answer, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(record.video_id)
        .bind(&record.video_source)
        .bind(&record.question)
        .bind(&record.answer)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn list_questions(&self, user_id: &str) -> Result<Vec<QuestionRecord>, HistoryError> {
        let records = sqlx::query_as::<_, QuestionRecord>(
            r#"
            SELECT id, user_id, video_id, video_source, question, answer, created_at
            FROM questions
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn delete_question(&self, user_id: &str, id: Uuid) -> Result<(), HistoryError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(HistoryError::NotFound);
        }
        Ok(())
    }
}
