//! HTTP client used by the measurement engine

#[cfg(test)]
pub(crate) mod fake;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::{header, Client, StatusCode, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upload chunk size handed to the transport
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Statuses a speed-test server uses to acknowledge an upload
const ACCEPTED_UPLOAD_STATUSES: [u16; 4] = [200, 201, 202, 204];

/// Byte counter shared between a transfer and its observer.
///
/// A transfer cut short by a timeout is dropped mid-flight, so the count
/// is the only record of how much data actually moved.
#[derive(Debug, Clone, Default)]
pub struct TransferProgress {
    bytes: Arc<AtomicU64>,
}

impl TransferProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// HTTP client trait for abstraction and testing
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue one lightweight request and return its status code
    async fn probe(&self, url: &str) -> Result<u16>;

    /// Fetch `url`, streaming the body into `progress`. Returns the body length.
    async fn download(&self, url: &str, progress: &TransferProgress) -> Result<u64>;

    /// Send `payload` to `url`, recording sent bytes in `progress`.
    /// Returns the number of bytes sent.
    async fn upload(&self, url: &str, payload: Bytes, progress: &TransferProgress) -> Result<u64>;
}

/// `reqwest`-backed client
pub struct NetworkClient {
    client: Client,
    timeout: Duration,
}

impl NetworkClient {
    /// Create a new network client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpClient for NetworkClient {
    async fn probe(&self, url: &str) -> Result<u16> {
        let response = self.client
            .get(url)
            .header(header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        Ok(response.status().as_u16())
    }

    async fn download(&self, url: &str, progress: &TransferProgress) -> Result<u64> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::http_request(format!("download returned HTTP {}", status)));
        }

        let mut stream = response.bytes_stream();
        let mut total = 0u64;
        while let Some(chunk) = stream.next().await {
            // The status was fine, so a broken body means the connection dropped
            let chunk = chunk.map_err(|e| {
                if e.is_timeout() {
                    AppError::timeout(e.to_string())
                } else {
                    AppError::network(format!("download body interrupted after {} bytes: {}", total, e))
                }
            })?;
            total += chunk.len() as u64;
            progress.add(chunk.len() as u64);
        }

        Ok(total)
    }

    async fn upload(&self, url: &str, payload: Bytes, progress: &TransferProgress) -> Result<u64> {
        let size = payload.len() as u64;
        let counter = progress.clone();
        let body = futures::stream::iter(upload_chunks(payload).map(move |chunk| {
            counter.add(chunk.len() as u64);
            Ok::<_, std::io::Error>(chunk)
        }));

        let response = self.client
            .post(url)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await?;

        let status = response.status();
        if !is_accepted_upload_status(status) {
            return Err(AppError::http_request(format!("upload returned HTTP {}", status)));
        }

        Ok(size)
    }
}

/// Splits `payload` into transport-sized views of the same buffer
pub fn upload_chunks(payload: Bytes) -> impl Iterator<Item = Bytes> + Send {
    (0..payload.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(move |start| payload.slice(start..(start + UPLOAD_CHUNK_SIZE).min(payload.len())))
}

/// Append query parameters to `base`
pub fn build_url(base: &str, params: &[(&str, String)]) -> Result<String> {
    let mut url = Url::parse(base)?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

pub fn is_accepted_upload_status(status: StatusCode) -> bool {
    ACCEPTED_UPLOAD_STATUSES.contains(&status.as_u16())
}

fn user_agent() -> String {
    format!("{}/{}", crate::PKG_NAME, crate::VERSION)
}
