//! # ebcdic-upload
//!
//! Client for an EBCDIC-to-Unicode conversion server: pick `.ebc` files,
//! upload them as one multipart request, follow a progress percentage, and
//! render the per-file results the server sends back.
//!
//! The conversion itself (code-page detection, transcoding, replacement
//! accounting, ZIP packaging) happens on the server. This crate owns the
//! submission cycle around it.
//!
//! ## Cycle Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Select    non-empty, every name ends in .ebc (case-insensitive)
//!  ├─ 2. Request   multipart: files × N, encoding, dest_encoding
//!  ├─ 3. Transfer  POST /, progress 0 → 80 % from bytes sent
//!  ├─ 4. Finalize  cosmetic walk 80 → 100 %, 1 point per 20 ms
//!  └─ 5. Render    after 500 ms: one card per result, response order
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ebcdic_upload::{render_text, UploadConfig, UploadController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = UploadConfig::builder()
//!         .server("http://127.0.0.1:8080")
//!         .build()?;
//!     let controller = UploadController::new(config)?;
//!     let output = controller.submit_paths(&["report.EBC", "data.ebc"]).await?;
//!     print!("{}", render_text(&output.outcomes));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ebcup` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ebcdic-upload = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod download;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    OutputFormat, UploadConfig, UploadConfigBuilder, DEFAULT_DEST_ENCODING,
    DEFAULT_SOURCE_ENCODING, KNOWN_DEST_ENCODINGS, KNOWN_SOURCE_ENCODINGS,
};
pub use controller::UploadController;
pub use download::{download_archives, DownloadOutcome};
pub use error::{DownloadError, UploadError};
pub use output::{ConversionResult, FileOutcome, UploadOutput, UploadStats};
pub use pipeline::render::{render_html, render_text};
pub use pipeline::request::UploadRequest;
pub use pipeline::selection::{validate_selection, SelectedFile};
pub use pipeline::transfer::{ConversionEndpoint, EndpointReply, HttpEndpoint, TransferTracker};
pub use progress::{NoopProgressCallback, ProgressCallback, ProgressState, UploadProgressCallback};
pub use workflow::{Phase, WorkflowEvent, WorkflowState};
