use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ReconcileError, Result};

/// Progress callback: (bytes downloaded so far, total from Content-Length if known)
pub type ProgressFn = dyn Fn(u64, Option<u64>) + Send + Sync;

/// Thin HTTP layer shared by all provider clients.
///
/// Connection pooling lives inside the reqwest client; retries do not belong
/// here, that policy is the caller's.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with a per-request deadline.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReconcileError::Network {
                url: String::new(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }

    fn map_send_error(url: &str, e: reqwest::Error) -> ReconcileError {
        if e.is_timeout() {
            ReconcileError::Timeout {
                url: url.to_string(),
            }
        } else {
            ReconcileError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }

    fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            return Err(ReconcileError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    /// GET the full response body.
    ///
    /// When a progress callback is supplied the body is streamed chunk by
    /// chunk and the callback sees monotonically non-decreasing byte counts
    /// before the complete buffer is returned.
    pub async fn get_bytes(&self, url: &str, on_progress: Option<&ProgressFn>) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::map_send_error(url, e))?;
        let response = Self::check_status(url, response)?;

        let total = response.content_length();
        let mut buffer = match total {
            Some(len) => Vec::with_capacity(len as usize),
            None => Vec::new(),
        };

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Self::map_send_error(url, e))?;
            buffer.extend_from_slice(&chunk);
            if let Some(progress) = on_progress {
                progress(buffer.len() as u64, total);
            }
        }

        Ok(buffer)
    }

    /// GET with query parameters, decoded as JSON.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| Self::map_send_error(url, e))?;
        let response = Self::check_status(url, response)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(url, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// POST a raw body with headers, decoded as JSON. IGDB's Apicalypse
    /// protocol sends its query in the request body.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Result<T> {
        let mut request = self.client.post(url).body(body.to_string());
        for (key, value) in headers {
            request = request.header(*key, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::map_send_error(url, e))?;
        let response = Self::check_status(url, response)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::map_send_error(url, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
