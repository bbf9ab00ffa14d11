//! In-memory history backend. Records are lost on restart; used for
//! development and tests.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{
    HistoryError, HistoryStore, NewQuestionRecord, NewVideoRecord, QuestionRecord, VideoRecord,
};

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    /// Per-user record lists, newest first.
    videos: DashMap<String, Vec<VideoRecord>>,
    questions: DashMap<String, Vec<QuestionRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            videos: DashMap::new(),
            questions: DashMap::new(),
        }
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn insert_video(&self, record: NewVideoRecord) -> Result<VideoRecord, HistoryError> {
        let stored = VideoRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id.clone(),
            video_source: record.video_source,
            transcript: record.transcript,
            summary: record.summary,
            insights: record.insights,
            action_items: record.action_items,
            created_at: Utc::now(),
        };

        self.videos
            .entry(record.user_id)
            .or_default()
            .insert(0, stored.clone());

        Ok(stored)
    }

    async fn list_videos(&self, user_id: &str) -> Result<Vec<VideoRecord>, HistoryError> {
        Ok(self
            .videos
            .get(user_id)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn delete_video(&self, user_id: &str, id: Uuid) -> Result<(), HistoryError> {
        let mut records = self.videos.get_mut(user_id).ok_or(HistoryError::NotFound)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(HistoryError::NotFound);
        }
        Ok(())
    }

    async fn insert_question(
        &self,
        record: NewQuestionRecord,
    ) -> Result<QuestionRecord, HistoryError> {
        let stored = QuestionRecord {
            id: Uuid::new_v4(),
            user_id: record.user_id.clone(),
            video_id: record.video_id,
            video_source: record.video_source,
            question: record.question,
            answer: record.answer,
            created_at: Utc::now(),
        };

        self.questions
            .entry(record.user_id)
            .or_default()
            .insert(0, stored.clone());

        Ok(stored)
    }

    async fn list_questions(&self, user_id: &str) -> Result<Vec<QuestionRecord>, HistoryError> {
        Ok(self
            .questions
            .get(user_id)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn delete_question(&self, user_id: &str, id: Uuid) -> Result<(), HistoryError> {
        let mut records = self
            .questions
            .get_mut(user_id)
            .ok_or(HistoryError::NotFound)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(HistoryError::NotFound);
        }
        Ok(())
    }
}
