//! Scripted `HttpClient` for deterministic engine tests.
//!
//! Delays use `tokio::time::sleep`, so tests running with a paused clock
//! observe exact elapsed times.

use super::{is_accepted_upload_status, HttpClient, TransferProgress};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum FakeResponse {
    /// Wait `delay`, count `bytes`, answer with `status`
    Respond { status: u16, bytes: u64, delay: Duration },
    /// Count `bytes`, then never finish
    Stall { bytes: u64 },
    /// Fail at the transport level
    Refuse,
}

impl FakeResponse {
    pub(crate) fn ok_after(delay: Duration) -> Self {
        Self::Respond { status: 200, bytes: 0, delay }
    }

    pub(crate) fn transfer(bytes: u64, delay: Duration) -> Self {
        Self::Respond { status: 200, bytes, delay }
    }

    pub(crate) fn status(status: u16) -> Self {
        Self::Respond { status, bytes: 0, delay: Duration::from_millis(5) }
    }
}

#[derive(Debug)]
pub(crate) struct FakeClient {
    probes: Mutex<VecDeque<FakeResponse>>,
    probe_default: FakeResponse,
    download: FakeResponse,
    upload: FakeResponse,
    calls: Mutex<Vec<String>>,
}

impl FakeClient {
    /// Every operation succeeds: 10 ms probes, 1 MiB per 500 ms transfers
    pub(crate) fn healthy() -> Self {
        Self {
            probes: Mutex::new(VecDeque::new()),
            probe_default: FakeResponse::ok_after(Duration::from_millis(10)),
            download: FakeResponse::transfer(1_048_576, Duration::from_millis(500)),
            upload: FakeResponse::transfer(0, Duration::from_millis(500)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Scripted probe responses, consumed in order before the default applies
    pub(crate) fn with_probes(mut self, probes: Vec<FakeResponse>) -> Self {
        self.probes = Mutex::new(probes.into());
        self
    }

    pub(crate) fn with_probe_default(mut self, response: FakeResponse) -> Self {
        self.probe_default = response;
        self
    }

    pub(crate) fn with_download(mut self, response: FakeResponse) -> Self {
        self.download = response;
        self
    }

    pub(crate) fn with_upload(mut self, response: FakeResponse) -> Self {
        self.upload = response;
        self
    }

    /// URLs requested so far, prefixed by operation name
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, op: &str, url: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{} {}", op, url));
        }
    }

    async fn play(response: &FakeResponse, progress: Option<&TransferProgress>) -> Result<(u16, u64)> {
        match response {
            FakeResponse::Respond { status, bytes, delay } => {
                tokio::time::sleep(*delay).await;
                if let Some(progress) = progress {
                    progress.add(*bytes);
                }
                Ok((*status, *bytes))
            }
            FakeResponse::Stall { bytes } => {
                if let Some(progress) = progress {
                    progress.add(*bytes);
                }
                std::future::pending::<()>().await;
                Err(AppError::internal("stalled transfer resumed"))
            }
            FakeResponse::Refuse => Err(AppError::network("connection refused")),
        }
    }
}

#[async_trait]
impl HttpClient for FakeClient {
    async fn probe(&self, url: &str) -> Result<u16> {
        self.record("probe", url);
        let next = self
            .probes
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or_else(|| self.probe_default.clone());
        let (status, _) = Self::play(&next, None).await?;
        Ok(status)
    }

    async fn download(&self, url: &str, progress: &TransferProgress) -> Result<u64> {
        self.record("download", url);
        let (status, bytes) = Self::play(&self.download, Some(progress)).await?;
        if !(200..300).contains(&status) {
            return Err(AppError::http_request(format!("download returned HTTP {}", status)));
        }
        Ok(bytes)
    }

    async fn upload(&self, url: &str, payload: Bytes, progress: &TransferProgress) -> Result<u64> {
        self.record("upload", url);
        let response = match &self.upload {
            FakeResponse::Respond { status, delay, .. } => FakeResponse::Respond {
                status: *status,
                bytes: payload.len() as u64,
                delay: *delay,
            },
            other => other.clone(),
        };
        let (status, bytes) = Self::play(&response, Some(progress)).await?;
        let accepted = StatusCode::from_u16(status).map(is_accepted_upload_status).unwrap_or(false);
        if !accepted {
            return Err(AppError::http_request(format!("upload returned HTTP {}", status)));
        }
        Ok(bytes)
    }
}
