use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::config::InsightSettings;

use super::{InsightError, InsightProvider};

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CandidatePart {
    text: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text = self
            .candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .map(|v| v.text)
            .collect::<String>();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_owned())
    }
}

/// `generateContent` over plain HTTP.
pub struct GeminiClient {
    client: Client,
    url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(settings: &InsightSettings) -> Result<Self, InsightError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(InsightError::NotConfigured)?;
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| InsightError::Other(e.to_string()))?;
        Ok(Self {
            client,
            url: format!(
                "{}/models/{}:generateContent",
                settings.endpoint.trim_end_matches('/'),
                settings.model
            ),
            api_key,
        })
    }
}

fn status_error(status: StatusCode, message: String) -> InsightError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => InsightError::Quota(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => InsightError::Auth(message),
        _ => InsightError::classify(message),
    }
}

fn transport_error(error: reqwest::Error) -> InsightError {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        InsightError::Network(error.to_string())
    } else {
        InsightError::Other(error.to_string())
    }
}

#[async_trait]
impl InsightProvider for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        debug!("POST {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", &self.api_key)])
            .json(&GenerateRequest {
                contents: [Content {
                    parts: [Part { text: prompt }],
                }],
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|v| v.error.message)
                .unwrap_or(body);
            return Err(status_error(status, message));
        }

        serde_json::from_str::<GenerateResponse>(&body)
            .map_err(|e| InsightError::Other(e.to_string()))?
            .into_text()
            .ok_or(InsightError::EmptyResponse)
    }
}
