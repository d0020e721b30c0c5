//! # HTTP Fetcher
//!
//! A thin wrapper around a pooled `reqwest::Client` that performs exactly one
//! `GET` against the upstream URL per call. The client carries a request
//! timeout, so a stalled upstream turns into `FetchError::Timeout` instead of
//! an endless poll cycle.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde_json::Value;

use crate::core::snapshot::Snapshot;
use crate::retrieve::fetcher::{FetchError, Fetcher};

/// Single-shot upstream client.
pub struct HttpFetcher {
    /// Reused across polls to keep the connection pool warm.
    client: reqwest::Client,
    /// Absolute URL of the upstream document.
    url: Url,
}

impl HttpFetcher {
    /// Builds a fetcher for `url` with the given request timeout and user agent.
    ///
    /// # Errors
    /// `FetchError::Setup` if the URL is not absolute or the TLS backend fails
    /// to initialise.
    pub fn new(url: &str, timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::Setup(format!("invalid upstream URL {}: {}", url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Setup(e.to_string()))?;

        Ok(Self { client, url })
    }

    /// The upstream URL this fetcher polls.
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn get_document(&self) -> Result<Snapshot, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let document: Value = serde_json::from_slice(&body)?;
        Ok(Snapshot::from_document(document)?)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self) -> Result<Snapshot, FetchError> {
        self.get_document().await
    }
}

fn transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(err.to_string())
    }
}
