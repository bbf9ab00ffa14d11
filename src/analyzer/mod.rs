//! Orchestration of the generation pipeline.
//!
//! One analyze call fans out into up to four upstream requests: the
//! transcript is fetched first and its text is interpolated into the
//! dependent prompts, then summary, insights, and action items run
//! concurrently against that transcript. Any failure fails the whole
//! operation; partial results are never returned.

use std::sync::Arc;

use url::Url;

use crate::gemini::{prompts, GeminiError, GenerateContent, Part};

/// Hostnames accepted as a video source.
const SUPPORTED_HOSTS: &[&str] = &["youtube.com", "www.youtube.com", "m.youtube.com", "youtu.be"];

/// Everything produced by one analyze call. Immutable after creation;
/// ownership moves to the caller, which may persist it and/or return it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub transcript: String,
    pub insights: String,
    pub action_items: String,
    /// Absent when the caller opted out of the summary.
    pub summary: Option<String>,
}

/// Sequences dependent calls to the generation service.
pub struct VideoAnalyzer {
    generator: Arc<dyn GenerateContent>,
}

impl VideoAnalyzer {
    pub fn new(generator: Arc<dyn GenerateContent>) -> Self {
        Self { generator }
    }

    /// Accept only URLs on the known video platform, before any upstream
    /// call is attempted. Rejecting early preserves quota.
    pub fn validate_source(source: &str) -> Result<(), GeminiError> {
        let supported = Url::parse(source)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .map(|host| SUPPORTED_HOSTS.contains(&host.as_str()))
            .unwrap_or(false);

        if supported {
            Ok(())
        } else {
            Err(GeminiError::UnsupportedSource {
                url: source.to_string(),
            })
        }
    }

    async fn process_video(
        &self,
        source: &str,
        prompt: String,
        api_key: Option<&str>,
    ) -> Result<String, GeminiError> {
        Self::validate_source(source)?;

        let parts = [Part::Text(prompt), Part::VideoUri(source.to_string())];
        self.generator.generate(&parts, api_key).await
    }

    async fn generate_text(
        &self,
        prompt: String,
        api_key: Option<&str>,
    ) -> Result<String, GeminiError> {
        self.generator.generate(&[Part::Text(prompt)], api_key).await
    }

    /// Transcribe a video.
    pub async fn fetch_transcript(
        &self,
        source: &str,
        api_key: Option<&str>,
    ) -> Result<String, GeminiError> {
        self.process_video(source, prompts::transcript(), api_key)
            .await
    }

    /// Full analysis: transcript, then the dependent trio concurrently.
    ///
    /// `include_summary = false` skips the summary call entirely; it is not
    /// issued and not charged, and `summary` is omitted from the result.
    pub async fn analyze(
        &self,
        source: &str,
        include_summary: bool,
        api_key: Option<&str>,
    ) -> Result<Analysis, GeminiError> {
        let transcript = self.fetch_transcript(source, api_key).await?;

        tracing::debug!(
            source = %source,
            include_summary = include_summary,
            transcript_chars = transcript.len(),
            "Transcript ready, generating derived artifacts"
        );

        let insights = self.generate_text(prompts::insights(&transcript), api_key);
        let action_items = self.generate_text(prompts::action_items(&transcript), api_key);

        let (insights, action_items, summary) = if include_summary {
            let summary = self.generate_text(prompts::summary(&transcript), api_key);
            let (insights, action_items, summary) =
                futures::try_join!(insights, action_items, summary)?;
            (insights, action_items, Some(summary))
        } else {
            let (insights, action_items) = futures::try_join!(insights, action_items)?;
            (insights, action_items, None)
        };

        Ok(Analysis {
            transcript,
            insights,
            action_items,
            summary,
        })
    }

    /// Answer a question against a transcript the caller already holds,
    /// avoiding the cost of reprocessing the video.
    pub async fn answer_from_transcript(
        &self,
        transcript: &str,
        question: &str,
        api_key: Option<&str>,
    ) -> Result<String, GeminiError> {
        self.generate_text(prompts::question_from_transcript(transcript, question), api_key)
            .await
    }

    /// Fallback when no transcript is available: answer straight from the
    /// video source.
    pub async fn answer_from_source(
        &self,
        source: &str,
        question: &str,
        api_key: Option<&str>,
    ) -> Result<String, GeminiError> {
        self.process_video(source, prompts::question_from_video(question), api_key)
            .await
    }
}
