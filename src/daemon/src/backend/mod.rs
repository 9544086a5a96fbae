//! Client for the trusted credentials backend, keyed by job id.

mod credentials;

use anyhow::Context;
use bytes::Bytes;
use mesos2iam_common::JobId;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub use credentials::IamRoleCredentials;

/// Display strings are what the caller gets to see; the sources are only logged.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("credentials backend unreachable")]
    Unreachable(#[source] reqwest::Error),

    #[error("credentials backend timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("credentials backend answered {0}")]
    Status(StatusCode),

    #[error("credentials backend response could not be read")]
    Body(#[source] reqwest::Error),
}

impl BackendError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout(err)
        } else {
            BackendError::Unreachable(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CredentialsResponse {
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct CredentialsBackend {
    client: Client,
    base_url: String,
}

impl CredentialsBackend {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build credentials backend client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn credentials_url(&self, job_id: &JobId) -> String {
        format!("{}/credentials/{}", self.base_url, job_id)
    }

    /// One attempt, no retries.
    pub async fn fetch(&self, job_id: &JobId) -> Result<CredentialsResponse, BackendError> {
        let url = self.credentials_url(job_id);
        debug!("Requesting credentials from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(BackendError::from_send)?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout(e)
            } else {
                BackendError::Body(e)
            }
        })?;

        if let Err(e) = serde_json::from_slice::<IamRoleCredentials>(&body) {
            warn!(
                "Credentials for job {} do not look like IAM role credentials: {}",
                job_id, e
            );
        }

        Ok(CredentialsResponse { content_type, body })
    }
}
