//! Progress state and the callback trait for upload-cycle events.
//!
//! Inject an [`Arc<dyn UploadProgressCallback>`] via
//! [`crate::config::UploadConfigBuilder::progress_callback`] to receive
//! events as a cycle moves from upload to rendered results.
//!
//! The percentage follows a fixed split: the byte transfer drives it from 0
//! to [`TRANSFER_CEILING`], and a cosmetic finalisation animation walks the
//! remaining points to 100 once the server has answered.
//!
//! # Example
//!
//! ```rust
//! use ebcdic_upload::{UploadProgressCallback, UploadConfig};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl UploadProgressCallback for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = UploadConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::FileOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Highest percentage the byte transfer alone may report.
pub const TRANSFER_CEILING: u8 = 80;

/// Percentage for `sent` of `total` bytes, scaled into `0..=80`.
///
/// Returns `None` when the total is unknown (zero), mirroring a transport
/// that cannot compute its length.
pub fn transfer_percent(sent: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let sent = sent.min(total) as u128;
    let pct = sent * TRANSFER_CEILING as u128 / total as u128;
    Some(pct as u8)
}

/// One cycle's progress percentage, 0–100 and never decreasing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    percent: u8,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Move to `percent` if that is further along. Returns `true` on change.
    pub fn advance_to(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent > self.percent {
            self.percent = percent;
            true
        } else {
            false
        }
    }

    /// Advance by one point (finalisation step). Returns `true` on change.
    pub fn step(&mut self) -> bool {
        self.advance_to(self.percent.saturating_add(1))
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }

    /// Textual label shown next to the fill, e.g. `"42%"`.
    pub fn label(&self) -> String {
        format!("{}%", self.percent)
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent)
    }
}

/// Called by the controller as a cycle advances.
///
/// Implementations must be `Send + Sync`: the transfer stream reports from
/// whichever worker thread is polling the request body. All methods have
/// default no-op implementations so callers only override what they need.
pub trait UploadProgressCallback: Send + Sync {
    /// Called once after validation, before the request is sent. Any
    /// previous progress and results should be cleared here.
    ///
    /// # Arguments
    /// * `file_count`  — number of `files` parts in the request
    /// * `total_bytes` — summed file content length
    fn on_cycle_start(&self, file_count: usize, total_bytes: u64) {
        let _ = (file_count, total_bytes);
    }

    /// Called whenever the percentage changes. Values never decrease
    /// within one cycle.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called once the render delay has elapsed, with outcomes in
    /// response order.
    fn on_results(&self, outcomes: &[FileOutcome]) {
        let _ = outcomes;
    }

    /// Called when the cycle fails after validation. Progress has been
    /// reset to 0.
    fn on_failure(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl UploadProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::UploadConfig`].
pub type ProgressCallback = Arc<dyn UploadProgressCallback>;
