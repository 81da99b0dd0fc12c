// src/sync/http.rs

// This module handles HTTP access to the reporting status and action endpoints

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;
use url::Url;

use super::messages::ActionKind;
use super::source::{StatusSource, STATUS_ENDPOINT};
use super::status::SetupStatus;
use crate::error::{TrackerError, TrackerResult};

// Helper to create a client (called once per source)
pub fn create_http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("reportsync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// [`StatusSource`] backed by the server's REST endpoints.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpStatusSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;
        let client = create_http_client(timeout)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint_url(&self, path: &str) -> TrackerResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TrackerError::transport(path, e))
    }
}

/// Parse the server address, keeping any path prefix it carries.
pub fn parse_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())
        .with_context(|| format!("Invalid server URL: {}", base_url))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch_status(&self) -> TrackerResult<SetupStatus> {
        let url = self.endpoint_url(STATUS_ENDPOINT)?;
        debug!("Http: GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TrackerError::transport(STATUS_ENDPOINT, e))?;

        if !response.status().is_success() {
            return Err(TrackerError::transport(
                STATUS_ENDPOINT,
                format!("HTTP error: {}", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| TrackerError::transport(STATUS_ENDPOINT, e))?;

        SetupStatus::from_json(&body)
    }

    async fn post_action(&self, action: ActionKind) -> TrackerResult<()> {
        let endpoint = action.endpoint();
        let url = self.endpoint_url(endpoint)?;
        debug!("Http: POST {}", url);

        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| TrackerError::transport(endpoint, e))?;

        if !response.status().is_success() {
            return Err(TrackerError::transport(
                endpoint,
                format!("HTTP error: {}", response.status()),
            ));
        }
        Ok(())
    }
}
