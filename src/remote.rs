//! Client side of the `/settings` endpoint.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::settings::{BoardSettings, BoardSettingsPatch};

const DEFAULT_API_URL: &str = "http://127.0.0.1:5151/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The request never produced a response (connection refused, timeout, ...).
    #[error("settings request failed: {0}")]
    Network(String),
    #[error("settings server answered {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unexpected settings response: {0}")]
    Decode(String),
}

pub trait SettingsRemote {
    /// `Ok(None)` when the server has no settings stored for the user.
    fn fetch(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<BoardSettings>, RemoteError>> + Send;

    fn create(
        &self,
        user_id: &str,
        settings: &BoardSettings,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn update(
        &self,
        user_id: &str,
        patch: &BoardSettingsPatch,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("BACKYARD_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("BACKYARD_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SettingsWrite<'a, T: Serialize> {
    user_id: &'a str,
    settings: &'a T,
}

#[derive(Debug, Deserialize)]
struct SettingsEnvelope {
    #[serde(default)]
    settings: Option<BoardSettings>,
}

#[derive(Debug, Clone)]
pub struct HttpSettingsRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSettingsRemote {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| RemoteError::Network(err.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/settings", self.base_url)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(RemoteError::Server {
        status: status.as_u16(),
        message,
    })
}

fn network_error(err: reqwest::Error) -> RemoteError {
    RemoteError::Network(err.to_string())
}

impl SettingsRemote for HttpSettingsRemote {
    async fn fetch(&self, user_id: &str) -> Result<Option<BoardSettings>, RemoteError> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(network_error)?;
        let envelope: SettingsEnvelope = check_status(response)
            .await?
            .json()
            .await
            .map_err(|err| RemoteError::Decode(err.to_string()))?;
        Ok(envelope.settings)
    }

    async fn create(&self, user_id: &str, settings: &BoardSettings) -> Result<(), RemoteError> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&SettingsWrite { user_id, settings })
            .send()
            .await
            .map_err(network_error)?;
        check_status(response).await?;
        Ok(())
    }

    async fn update(&self, user_id: &str, patch: &BoardSettingsPatch) -> Result<(), RemoteError> {
        let response = self
            .client
            .patch(self.endpoint())
            .json(&SettingsWrite {
                user_id,
                settings: patch,
            })
            .send()
            .await
            .map_err(network_error)?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let remote = HttpSettingsRemote::new(RemoteConfig {
            base_url: "http://localhost:9000/api/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(remote.endpoint(), "http://localhost:9000/api/settings");
    }

    #[test]
    fn write_body_wraps_settings_with_user() {
        let patch = BoardSettingsPatch {
            stroke_width: Some(3.0),
            ..Default::default()
        };
        let body = serde_json::to_value(SettingsWrite {
            user_id: "user-1",
            settings: &patch,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "userId": "user-1", "settings": { "strokeWidth": 3.0 } })
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let remote = HttpSettingsRemote::new(RemoteConfig {
            base_url: "http://127.0.0.1:1/api".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();
        let err = remote.fetch("user-1").await.unwrap_err();
        assert!(matches!(err, RemoteError::Network(_)));
    }
}
