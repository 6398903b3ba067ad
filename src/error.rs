//! Error types for the ebcdic-upload library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`UploadError`] — **Fatal**: the submission cycle cannot complete
//!   (bad selection, unreadable file, server failure, cancelled). Returned as
//!   `Err(UploadError)` from [`crate::controller::UploadController`].
//!
//! * [`DownloadError`] — **Non-fatal**: one archive could not be fetched
//!   after a successful conversion. Stored inside
//!   [`crate::download::DownloadOutcome`] so the other archives still land.
//!
//! Selection errors are the "alert" class: they fire before any file is read
//! or any request is built. Hosts check [`UploadError::is_selection_error`]
//! to present them as a blocking message rather than a failed transfer.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by a submission cycle.
#[derive(Debug, Error)]
pub enum UploadError {
    // ── Selection errors ──────────────────────────────────────────────────
    /// No files were selected.
    #[error("Please select at least one file.")]
    EmptySelection,

    /// A selected file does not carry the `.ebc` extension.
    #[error("Only EBCDIC (.ebc) files are allowed! Rejected: '{filename}'")]
    InvalidExtension { filename: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Selected file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Summed file size exceeds what the server accepts.
    #[error("Upload of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The request could not be sent or the response could not be read.
    #[error("Upload to '{url}' failed: {reason}\nCheck the server is running and reachable.")]
    Transport { url: String, reason: String },

    /// The request exceeded the configured timeout.
    #[error("Upload timed out after {secs}s for '{url}'\nIncrease --timeout.")]
    Timeout { url: String, secs: u64 },

    /// The server answered with a non-success status.
    #[error("Server returned HTTP {status}: {body}")]
    ServerStatus { status: u16, body: String },

    /// The body was not a JSON array of conversion results.
    #[error("Malformed response from server: {detail}")]
    MalformedResponse { detail: String },

    // ── Workflow errors ───────────────────────────────────────────────────
    /// A newer cycle (or an explicit cancel) superseded this one.
    #[error("Upload cancelled")]
    Cancelled,

    /// The workflow was asked to move along an edge it does not have.
    #[error("Invalid workflow transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl UploadError {
    /// `true` for errors raised before anything was read or sent.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            UploadError::EmptySelection | UploadError::InvalidExtension { .. }
        )
    }
}

/// A non-fatal error for a single archive download.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DownloadError {
    /// The `zip_download` value could not be resolved to a URL.
    #[error("{filename}: invalid download link '{link}'")]
    InvalidLink { filename: String, link: String },

    /// The GET failed or returned a non-success status.
    #[error("{filename}: download failed: {detail}")]
    Failed { filename: String, detail: String },

    /// The archive was fetched but could not be written.
    #[error("{filename}: could not write archive: {detail}")]
    WriteFailed { filename: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_extension_display() {
        let e = UploadError::InvalidExtension {
            filename: "notes.txt".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains(".ebc"), "got: {msg}");
        assert!(msg.contains("notes.txt"), "got: {msg}");
    }

    #[test]
    fn selection_errors_are_classified() {
        assert!(UploadError::EmptySelection.is_selection_error());
        assert!(UploadError::InvalidExtension {
            filename: "a.txt".into()
        }
        .is_selection_error());
        assert!(!UploadError::Cancelled.is_selection_error());
        assert!(!UploadError::ServerStatus {
            status: 500,
            body: String::new()
        }
        .is_selection_error());
    }

    #[test]
    fn server_status_display() {
        let e = UploadError::ServerStatus {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(e.to_string().contains("502"));
        assert!(e.to_string().contains("bad gateway"));
    }

    #[test]
    fn timeout_display() {
        let e = UploadError::Timeout {
            url: "http://localhost/".into(),
            secs: 30,
        };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn download_error_display() {
        let e = DownloadError::Failed {
            filename: "a.ebc".into(),
            detail: "HTTP 404".into(),
        };
        assert!(e.to_string().starts_with("a.ebc"));
        assert!(e.to_string().contains("404"));
    }
}
