use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::utils::{config::RemoteSettings, time::date_to_snapshot_key};

use super::entities::{
    ActivityLog, ActivityStats, DateRange, DistractionLog, EndFocusRequest, FocusSessionResponse,
    FocusStats, StartFocusRequest, WithUser,
};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote request timed out")]
    Timeout,
    #[error("remote service unreachable: {0}")]
    Network(String),
    #[error("remote service answered with status {0}")]
    Status(u16),
    #[error("unexpected response from remote service: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RemoteError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            RemoteError::Timeout
        } else if let Some(status) = value.status() {
            RemoteError::Status(status.as_u16())
        } else if value.is_decode() {
            RemoteError::Decode(value.to_string())
        } else {
            RemoteError::Network(value.to_string())
        }
    }
}

/// Contract with the stats/logging service. Every call is scoped to the configured user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    async fn focus_stats(&self, range: DateRange) -> Result<FocusStats, RemoteError>;

    async fn activity_stats(&self, range: DateRange) -> Result<ActivityStats, RemoteError>;

    /// Returns the id of the created session.
    async fn start_focus_session(&self) -> Result<String, RemoteError>;

    async fn end_focus_session(&self, session_id: &str) -> Result<(), RemoteError>;

    async fn log_distraction(&self, distraction: &DistractionLog) -> Result<(), RemoteError>;

    async fn log_activity(&self, activity: &ActivityLog) -> Result<(), RemoteError>;
}

pub struct HttpRemoteApi {
    client: Client,
    base_url: String,
    user_id: String,
}

impl HttpRemoteApi {
    pub fn new(settings: &RemoteSettings) -> Result<Self, RemoteError> {
        let client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            user_id: settings.user_id.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_stats<T: DeserializeOwned>(
        &self,
        resource: &str,
        range: DateRange,
    ) -> Result<T, RemoteError> {
        let url = self.url(&format!("/{resource}/stats/{}", self.user_id));
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .query(&[
                ("startDate", date_to_snapshot_key(range.start)),
                ("endDate", date_to_snapshot_key(range.end)),
            ])
            .send()
            .await?;
        Ok(checked(response)?.json().await?)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, RemoteError> {
        let url = self.url(path);
        debug!("POST {url}");
        let response = self.client.post(url).json(body).send().await?;
        checked(response)
    }
}

fn checked(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RemoteError::Status(status.as_u16()));
    }
    Ok(response)
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn focus_stats(&self, range: DateRange) -> Result<FocusStats, RemoteError> {
        self.get_stats("focus", range).await
    }

    async fn activity_stats(&self, range: DateRange) -> Result<ActivityStats, RemoteError> {
        self.get_stats("activity", range).await
    }

    async fn start_focus_session(&self) -> Result<String, RemoteError> {
        let response = self
            .post(
                "/focus/start",
                &StartFocusRequest {
                    user_id: &self.user_id,
                },
            )
            .await?;
        let session: FocusSessionResponse = response.json().await?;
        Ok(session.id)
    }

    async fn end_focus_session(&self, session_id: &str) -> Result<(), RemoteError> {
        self.post(
            "/focus/end",
            &EndFocusRequest {
                session_id,
                user_id: &self.user_id,
            },
        )
        .await?;
        Ok(())
    }

    async fn log_distraction(&self, distraction: &DistractionLog) -> Result<(), RemoteError> {
        self.post(
            "/focus/distraction",
            &WithUser {
                user_id: &self.user_id,
                body: distraction,
            },
        )
        .await?;
        Ok(())
    }

    async fn log_activity(&self, activity: &ActivityLog) -> Result<(), RemoteError> {
        self.post(
            "/activity",
            &WithUser {
                user_id: &self.user_id,
                body: activity,
            },
        )
        .await?;
        Ok(())
    }
}
