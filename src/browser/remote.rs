//! HTTP driver talking to a local browser-automation sidecar
//!
//! The automation process (the one actually holding the logged-in browser
//! profile) exposes three endpoints:
//!
//!   GET  {base}/scan  -> JSON array of comments
//!   GET  {base}/post  -> {"content": "..."} or 404
//!   POST {base}/reply -> {"comment_id": "...", "text": "..."}
//!
//! Auth failures from the sidecar map to `SessionInvalid`, which halts the
//! loop; connectivity problems map to transient navigation errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use super::driver::{BrowserDriver, BrowserError};
use crate::domain::Comment;

/// Configuration for the sidecar connection.
#[derive(Debug, Clone)]
pub struct RemoteDriverConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for RemoteDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:4444".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Browser driver backed by an HTTP automation sidecar.
pub struct RemoteDriver {
    client: Client,
    config: RemoteDriverConfig,
}

impl RemoteDriver {
    pub fn new(config: RemoteDriverConfig) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrowserError::Navigation(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn map_request_error(e: reqwest::Error) -> BrowserError {
        // Timeouts and refused connections are the sidecar being slow or
        // restarting; both are worth retrying.
        BrowserError::Navigation(e.to_string())
    }

    fn map_status(status: StatusCode, context: &str) -> BrowserError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                BrowserError::SessionInvalid(format!("{}: HTTP {}", context, status.as_u16()))
            }
            StatusCode::NOT_FOUND => BrowserError::ElementNotFound(format!("{}: HTTP 404", context)),
            s => BrowserError::Navigation(format!("{}: HTTP {}", context, s.as_u16())),
        }
    }
}

#[async_trait]
impl BrowserDriver for RemoteDriver {
    async fn scan(&self) -> Result<Vec<Comment>, BrowserError> {
        let response = self
            .client
            .get(self.url("scan"))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_status(status, "scan"));
        }

        response
            .json::<Vec<Comment>>()
            .await
            .map_err(|e| BrowserError::Navigation(format!("malformed scan payload: {}", e)))
    }

    async fn submit_reply(&self, comment_id: &str, text: &str) -> Result<(), BrowserError> {
        let response = self
            .client
            .post(self.url("reply"))
            .json(&json!({ "comment_id": comment_id, "text": text }))
            .send()
            .await
            .map_err(|e| BrowserError::Submission {
                message: e.to_string(),
                transient: true,
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BrowserError::SessionInvalid(format!(
                "reply rejected: HTTP {}",
                status.as_u16()
            ))),
            s => {
                let body = response.text().await.unwrap_or_default();
                Err(BrowserError::Submission {
                    message: format!("HTTP {}: {}", s.as_u16(), body),
                    // Server-side hiccups are retryable, 4xx rejections are not
                    transient: s.is_server_error(),
                })
            }
        }
    }

    async fn post_content(&self) -> Result<Option<String>, BrowserError> {
        let response = self
            .client
            .get(self.url("post"))
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::map_status(status, "post"));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BrowserError::Navigation(format!("malformed post payload: {}", e)))?;
        Ok(payload
            .get("content")
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }
}
