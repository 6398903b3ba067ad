//! The upload workflow controller: one submission cycle end to end.
//!
//! A cycle threads a [`WorkflowState`] value through the pipeline stages:
//!
//! ```text
//! validate ─▶ build request ─▶ POST / ─▶ parse ─▶ finalize ∥ render delay ─▶ results
//! ```
//!
//! A cycle starts from the state the previous one settled in; the
//! `Validated` edge clears its results and failure before anything is sent.
//! The live percentage is shared with the transport and the finalisation
//! walk, and is folded back into the state on arrival and on render.
//!
//! Each cycle owns a [`CancellationToken`]. Starting a new cycle on the same
//! controller cancels the previous one, so a stale cycle can never render
//! over a newer one.

use crate::config::{is_known_source_encoding, UploadConfig};
use crate::error::UploadError;
use crate::output::{parse_outcomes, UploadOutput, UploadStats};
use crate::pipeline::selection::{self, SelectedFile};
use crate::pipeline::transfer::{
    lock_progress, ConversionEndpoint, HttpEndpoint, TransferTracker,
};
use crate::pipeline::{finalize, request::UploadRequest};
use crate::progress::ProgressState;
use crate::workflow::{WorkflowEvent, WorkflowState};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Longest slice of an error body carried into [`UploadError::ServerStatus`].
const MAX_ERROR_BODY: usize = 200;

/// Drives submission cycles against one conversion endpoint.
pub struct UploadController {
    config: UploadConfig,
    endpoint: Arc<dyn ConversionEndpoint>,
    current: Mutex<Option<Cycle>>,
    next_cycle: AtomicU64,
    settled: Mutex<WorkflowState>,
}

/// The cycle currently allowed to touch progress and results.
#[derive(Clone)]
struct Cycle {
    id: u64,
    token: CancellationToken,
}

impl UploadController {
    /// A controller talking HTTP to `config.server`.
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let endpoint = HttpEndpoint::new(&config)?;
        Ok(Self::with_endpoint(config, Arc::new(endpoint)))
    }

    /// A controller using a caller-supplied endpoint.
    pub fn with_endpoint(config: UploadConfig, endpoint: Arc<dyn ConversionEndpoint>) -> Self {
        Self {
            config,
            endpoint,
            current: Mutex::new(None),
            next_cycle: AtomicU64::new(1),
            settled: Mutex::new(WorkflowState::new()),
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// State left behind by the last cycle that returned to idle.
    pub fn last_state(&self) -> WorkflowState {
        lock(&self.settled).clone()
    }

    /// Cancel the cycle in flight, if any.
    pub fn cancel(&self) {
        if let Some(cycle) = lock(&self.current).take() {
            debug!("Cancelling upload cycle {}", cycle.id);
            cycle.token.cancel();
        }
    }

    /// Validate `paths` by name, read them, and run a cycle.
    pub async fn submit_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
    ) -> Result<UploadOutput, UploadError> {
        let state = self.last_state().transition(WorkflowEvent::Submit)?;
        match selection::load_selection(paths).await {
            Ok(files) => self.run(state, files).await,
            Err(e) => Err(self.abort(state, e)),
        }
    }

    /// Run a cycle over files already in memory.
    pub async fn submit(&self, files: Vec<SelectedFile>) -> Result<UploadOutput, UploadError> {
        let state = self.last_state().transition(WorkflowEvent::Submit)?;
        self.run(state, files).await
    }

    async fn run(
        &self,
        state: WorkflowState,
        files: Vec<SelectedFile>,
    ) -> Result<UploadOutput, UploadError> {
        let request = match UploadRequest::new(
            files,
            Some(&self.config.source_encoding),
            Some(&self.config.dest_encoding),
        ) {
            Ok(r) => r,
            Err(e) => return Err(self.abort(state, e)),
        };

        let total_bytes = request.total_bytes();
        if total_bytes > self.config.max_upload_bytes {
            let e = UploadError::PayloadTooLarge {
                size: total_bytes,
                limit: self.config.max_upload_bytes,
            };
            return Err(self.abort(state, e));
        }
        if !is_known_source_encoding(request.encoding()) {
            warn!(
                "Source encoding '{}' is not a known EBCDIC code page; sending as-is",
                request.encoding()
            );
        }

        let cycle = self.begin_cycle();
        let cancel = cycle.token.clone();
        let state = state.transition(WorkflowEvent::Validated)?;
        let file_count = request.files().len();
        info!(
            "Starting upload of {} file(s), {} bytes (encoding={}, dest_encoding={})",
            file_count,
            total_bytes,
            request.encoding(),
            request.dest_encoding()
        );
        for field in request.fields() {
            debug!("form field: {:?}", field);
        }

        let callback = self.config.progress_callback.clone();
        if let Some(ref cb) = callback {
            cb.on_cycle_start(file_count, total_bytes);
            cb.on_progress(0);
        }

        let started = Instant::now();
        let progress = Arc::new(Mutex::new(ProgressState::new()));
        let tracker = Arc::new(TransferTracker::new(
            total_bytes,
            Arc::clone(&progress),
            callback.clone(),
        ));

        // ── Transfer ─────────────────────────────────────────────────────
        let state = state.transition(WorkflowEvent::Sent)?;
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(self.cancelled()),
            reply = self.endpoint.post(request, Arc::clone(&tracker)) => reply,
        };
        let reply = match reply {
            Ok(r) => r,
            Err(e) => return Err(self.fail(state, &cycle, e)),
        };

        if reply.status == 413 {
            let e = UploadError::PayloadTooLarge {
                size: total_bytes,
                limit: self.config.max_upload_bytes,
            };
            return Err(self.fail(state, &cycle, e));
        }
        if reply.status != 200 {
            let e = UploadError::ServerStatus {
                status: reply.status,
                body: truncate(&reply.body, MAX_ERROR_BODY),
            };
            return Err(self.fail(state, &cycle, e));
        }
        let outcomes = match parse_outcomes(&reply.body) {
            Ok(o) => o,
            Err(e) => {
                let e = UploadError::MalformedResponse {
                    detail: e.to_string(),
                };
                return Err(self.fail(state, &cycle, e));
            }
        };
        info!("Server returned {} result(s)", outcomes.len());

        let transferred = lock_progress(&progress).percent();
        let state = state
            .transition(WorkflowEvent::Progress(transferred))?
            .transition(WorkflowEvent::Received(outcomes))?;

        // ── Finalize ∥ render delay ──────────────────────────────────────
        // The delay runs from arrival. If the walk to 100 is still going when
        // it fires, progress snaps to 100 so it never trails the results.
        let animation =
            finalize::animate(&progress, self.config.finalize_tick, callback.as_ref());
        let delay = tokio::time::sleep(self.config.render_delay);
        tokio::pin!(animation);
        tokio::pin!(delay);
        let mut animation_done = false;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(self.cancelled()),
                _ = &mut animation, if !animation_done => animation_done = true,
                _ = &mut delay => break,
            }
        }
        finalize::complete(&progress, callback.as_ref());

        // ── Render ───────────────────────────────────────────────────────
        let state = state.transition(WorkflowEvent::Rendered)?;
        if let Some(ref cb) = callback {
            cb.on_results(&state.results);
        }

        let mut stats = UploadStats::tally(&state.results);
        stats.files_sent = file_count;
        stats.bytes_sent = tracker.bytes_sent();
        stats.total_duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "Upload complete: {} converted, {} rejected, {} replacement(s) in {}ms",
            stats.converted, stats.rejected, stats.total_replacements, stats.total_duration_ms
        );

        let output = UploadOutput {
            outcomes: state.results.clone(),
            stats,
        };
        self.settle(state, &cycle);
        Ok(output)
    }

    /// Install a fresh cycle, cancelling whatever cycle held the slot.
    fn begin_cycle(&self) -> Cycle {
        let cycle = Cycle {
            id: self.next_cycle.fetch_add(1, Ordering::SeqCst),
            token: CancellationToken::new(),
        };
        if let Some(previous) = lock(&self.current).replace(cycle.clone()) {
            debug!("Cycle {} supersedes cycle {} still in flight", cycle.id, previous.id);
            previous.token.cancel();
        }
        cycle
    }

    /// Publish a finished cycle's state and release its token slot.
    fn settle(&self, state: WorkflowState, cycle: &Cycle) {
        if cycle.token.is_cancelled() {
            return;
        }
        *lock(&self.settled) = state;
        let mut current = lock(&self.current);
        if current.as_ref().is_some_and(|c| c.id == cycle.id) {
            *current = None;
        }
    }

    /// Pre-send refusal: nothing was touched, so nothing is reported.
    fn abort(&self, state: WorkflowState, error: UploadError) -> UploadError {
        debug!("Cycle aborted before sending: {}", error);
        match state.transition(WorkflowEvent::Abort) {
            Ok(_) => error,
            Err(e) => e,
        }
    }

    /// Post-send failure: reset progress, surface the message.
    fn fail(&self, state: WorkflowState, cycle: &Cycle, error: UploadError) -> UploadError {
        if cycle.token.is_cancelled() {
            return self.cancelled();
        }
        let message = error.to_string();
        warn!("Upload failed: {}", message);
        let state = match state.transition(WorkflowEvent::Fail(message.clone())) {
            Ok(s) => s,
            Err(e) => return e,
        };
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_progress(0);
            cb.on_failure(&message);
        }
        self.settle(state, cycle);
        error
    }

    fn cancelled(&self) -> UploadError {
        debug!("Cycle cancelled; dropping pending work");
        UploadError::Cancelled
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.trim().to_string();
    }
    let cut: String = s.chars().take(max).collect();
    format!("{}\u{2026}", cut.trim())
}
