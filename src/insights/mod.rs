//! Short written feedback about the day. A generative model is used when a key is configured,
//! everything else falls back to static text so callers always get something to show.

pub mod fallback;
pub mod gemini;
pub mod service;
pub mod summary;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InsightError {
    #[error("no API key configured")]
    NotConfigured,
    #[error("usage quota exceeded: {0}")]
    Quota(String),
    #[error("API key rejected: {0}")]
    Auth(String),
    #[error("connection problem: {0}")]
    Network(String),
    #[error("empty response")]
    EmptyResponse,
    #[error("insight service failed: {0}")]
    Other(String),
}

impl InsightError {
    /// Sorts an error message from the service into a variant by the words it mentions.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("quota") || lower.contains("limit") {
            InsightError::Quota(message)
        } else if lower.contains("key") || lower.contains("auth") {
            InsightError::Auth(message)
        } else if lower.contains("network") || lower.contains("fetch") {
            InsightError::Network(message)
        } else {
            InsightError::Other(message)
        }
    }

    pub fn fallback_message(&self) -> &'static str {
        match self {
            InsightError::NotConfigured => {
                "Gemini AI is not configured. Please add your API key to enable AI insights."
            }
            InsightError::Quota(_) => {
                "Daily usage limit reached. AI insights will resume tomorrow. You can still track your focus manually!"
            }
            InsightError::Auth(_) => {
                "API key issue detected. Please check your Gemini API key configuration."
            }
            InsightError::Network(_) => {
                "Connection issue. Check your internet connection and try again."
            }
            InsightError::EmptyResponse | InsightError::Other(_) => {
                "AI insights temporarily unavailable. Your usage tracking continues normally!"
            }
        }
    }
}

/// Anything that turns a prompt into text.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError>;
}
