//! Upstream generation service client.
//!
//! The rest of the system treats generation as a black-box function behind
//! the `GenerateContent` trait; this module provides the real Gemini-backed
//! implementation plus the tagged error kinds and prompt templates.

mod client;
mod error;
pub mod prompts;

pub use client::{GeminiClient, GenerateContent, Part};
pub use error::GeminiError;
