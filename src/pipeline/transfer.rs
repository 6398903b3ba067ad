//! Transport: POST the multipart form to the conversion endpoint.
//!
//! [`ConversionEndpoint`] is the seam between the controller and the
//! network. [`HttpEndpoint`] is the reqwest-backed implementation used in
//! production; tests plug in an in-process endpoint that reports progress
//! through the same [`TransferTracker`].

use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::pipeline::request::UploadRequest;
use crate::progress::{transfer_percent, ProgressCallback, ProgressState};
use futures::future::BoxFuture;
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Raw reply from the endpoint; status handling is the controller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointReply {
    pub status: u16,
    pub body: String,
}

/// Anything that can carry an [`UploadRequest`] to a conversion server.
pub trait ConversionEndpoint: Send + Sync {
    /// Send `request`, calling [`TransferTracker::record`] as body bytes go
    /// out, and resolve with the server's reply.
    fn post(
        &self,
        request: UploadRequest,
        tracker: Arc<TransferTracker>,
    ) -> BoxFuture<'_, Result<EndpointReply, UploadError>>;
}

/// Counts body bytes handed to the transport and turns them into the
/// `0..=80` transfer percentage.
pub struct TransferTracker {
    total: u64,
    sent: AtomicU64,
    state: Arc<Mutex<ProgressState>>,
    callback: Option<ProgressCallback>,
}

impl TransferTracker {
    pub fn new(
        total: u64,
        state: Arc<Mutex<ProgressState>>,
        callback: Option<ProgressCallback>,
    ) -> Self {
        Self {
            total,
            sent: AtomicU64::new(0),
            state,
            callback,
        }
    }

    /// A tracker with its own progress state and no observer.
    pub fn detached(total: u64) -> Self {
        Self::new(total, Arc::new(Mutex::new(ProgressState::new())), None)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total
    }

    pub fn bytes_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn percent(&self) -> u8 {
        lock_progress(&self.state).percent()
    }

    /// Account for `n` more bytes. Reports only when the percentage moves.
    pub fn record(&self, n: u64) {
        let sent = self.sent.fetch_add(n, Ordering::SeqCst).saturating_add(n);
        let Some(pct) = transfer_percent(sent, self.total) else {
            return;
        };
        // Held across the callback so concurrent reports stay ordered.
        let mut state = lock_progress(&self.state);
        if state.advance_to(pct) {
            debug!("Upload progress {}% ({}/{} bytes)", pct, sent, self.total);
            if let Some(ref cb) = self.callback {
                cb.on_progress(pct);
            }
        }
    }
}

pub(crate) fn lock_progress(state: &Mutex<ProgressState>) -> MutexGuard<'_, ProgressState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The production endpoint: a multipart POST via reqwest.
#[derive(Debug, Clone)]
pub struct HttpEndpoint {
    client: Client,
    url: Url,
    timeout_secs: u64,
    chunk_size: usize,
}

impl HttpEndpoint {
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        Ok(Self {
            client: build_client(config.timeout_secs)?,
            url: config.endpoint_url(),
            timeout_secs: config.timeout_secs,
            chunk_size: config.chunk_size,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn send(
        &self,
        request: UploadRequest,
        tracker: Arc<TransferTracker>,
    ) -> Result<EndpointReply, UploadError> {
        let url = self.url.to_string();
        info!(
            "POST {} ({} file(s), {} bytes)",
            url,
            request.files().len(),
            request.total_bytes()
        );
        let form = request.into_form(tracker, self.chunk_size);

        let response = self
            .client
            .post(self.url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!("Endpoint replied HTTP {} ({} bytes)", status, body.len());

        Ok(EndpointReply { status, body })
    }

    fn transport_error(&self, e: reqwest::Error) -> UploadError {
        if e.is_timeout() {
            UploadError::Timeout {
                url: self.url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            UploadError::Transport {
                url: self.url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

impl ConversionEndpoint for HttpEndpoint {
    fn post(
        &self,
        request: UploadRequest,
        tracker: Arc<TransferTracker>,
    ) -> BoxFuture<'_, Result<EndpointReply, UploadError>> {
        Box::pin(self.send(request, tracker))
    }
}

/// A reqwest client with the whole-request timeout applied.
pub fn build_client(timeout_secs: u64) -> Result<Client, UploadError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| UploadError::Internal(format!("HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::UploadProgressCallback;

    struct Recorder(Mutex<Vec<u8>>);

    impl UploadProgressCallback for Recorder {
        fn on_progress(&self, percent: u8) {
            self.0.lock().unwrap().push(percent);
        }
    }

    #[test]
    fn record_reports_only_changes() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let state = Arc::new(Mutex::new(ProgressState::new()));
        let tracker = TransferTracker::new(1000, Arc::clone(&state), Some(rec.clone()));

        tracker.record(1); // 0.08 → floor 0, no change
        tracker.record(249); // 250/1000 → 20
        tracker.record(0); // still 20
        tracker.record(750); // 1000/1000 → 80

        assert_eq!(*rec.0.lock().unwrap(), vec![20, 80]);
        assert_eq!(tracker.bytes_sent(), 1000);
        assert_eq!(state.lock().unwrap().percent(), 80);
    }

    #[test]
    fn record_never_passes_ceiling() {
        let tracker = TransferTracker::detached(10);
        tracker.record(10);
        tracker.record(10);
        assert_eq!(tracker.percent(), 80);
    }

    #[test]
    fn zero_total_reports_nothing() {
        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let tracker = TransferTracker::new(0, Arc::new(Mutex::new(ProgressState::new())), Some(rec.clone()));
        tracker.record(5);
        assert!(rec.0.lock().unwrap().is_empty());
        assert_eq!(tracker.percent(), 0);
    }

    #[test]
    fn http_endpoint_targets_root() {
        let config = UploadConfig::builder()
            .server("http://localhost:8080/convert")
            .build()
            .unwrap();
        let endpoint = HttpEndpoint::new(&config).unwrap();
        assert_eq!(endpoint.url().as_str(), "http://localhost:8080/");
    }
}
