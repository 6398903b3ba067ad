//! Configuration types for an upload cycle.
//!
//! All client behaviour is controlled through [`UploadConfig`], built via
//! its [`UploadConfigBuilder`]. The two encoding labels stand in for the
//! host page's selectors; an empty or unset selector falls back to
//! [`DEFAULT_SOURCE_ENCODING`] / [`DEFAULT_DEST_ENCODING`].

use crate::error::UploadError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Source label asking the server to detect the code page itself.
pub const DEFAULT_SOURCE_ENCODING: &str = "auto";

/// Destination label used when none is selected.
pub const DEFAULT_DEST_ENCODING: &str = "utf-8";

/// IBM code pages offered by the conversion server's source selector.
pub const KNOWN_SOURCE_ENCODINGS: &[&str] = &[
    "cp037", "cp273", "cp277", "cp278", "cp280", "cp281", "cp284", "cp285", "cp297", "cp420",
    "cp424", "cp437", "cp500", "cp875", "cp880", "cp891", "cp903", "cp904", "cp905", "cp918",
    "cp1026", "cp1047", "cp1140", "cp1141", "cp1142", "cp1143", "cp1144", "cp1145", "cp1146",
    "cp1147", "cp1148", "cp1149",
];

/// Destination encodings the server writes.
pub const KNOWN_DEST_ENCODINGS: &[&str] = &["utf-8", "utf-16", "utf-32"];

/// Body limit enforced by the conversion server (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// `true` if `label` is `auto` or one of [`KNOWN_SOURCE_ENCODINGS`].
pub fn is_known_source_encoding(label: &str) -> bool {
    let label = label.trim().to_ascii_lowercase();
    label == DEFAULT_SOURCE_ENCODING || KNOWN_SOURCE_ENCODINGS.contains(&label.as_str())
}

/// Resolve a selector value: blank or missing means `default`.
pub fn selector_or_default(value: Option<&str>, default: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => default.to_string(),
    }
}

/// Configuration for an upload cycle.
///
/// # Example
/// ```rust
/// use ebcdic_upload::UploadConfig;
///
/// let config = UploadConfig::builder()
///     .server("http://127.0.0.1:8080")
///     .source_encoding("cp1047")
///     .build()
///     .unwrap();
/// assert_eq!(config.dest_encoding, "utf-8");
/// ```
#[derive(Clone)]
pub struct UploadConfig {
    /// Base URL of the conversion server. Default: `http://127.0.0.1:8080`.
    ///
    /// The upload goes to `/` on this base; relative `zip_download` links
    /// are resolved against it too.
    pub server: Url,

    /// Source encoding label sent as the `encoding` field. Default: `auto`.
    pub source_encoding: String,

    /// Destination encoding label sent as `dest_encoding`. Default: `utf-8`.
    pub dest_encoding: String,

    /// Whole-request timeout in seconds. Default: 300.
    pub timeout_secs: u64,

    /// Interval between 1-point steps of the finalisation animation. Default: 20 ms.
    pub finalize_tick: Duration,

    /// Delay from result arrival to rendering. Default: 500 ms.
    pub render_delay: Duration,

    /// Largest summed file size sent to the server. Default: 50 MiB.
    pub max_upload_bytes: u64,

    /// Size of each body chunk handed to the transport. Default: 64 KiB.
    ///
    /// Progress is reported once per chunk, so smaller chunks give a
    /// smoother bar at the cost of more callback invocations.
    pub chunk_size: usize,

    /// Optional observer for cycle events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            source_encoding: DEFAULT_SOURCE_ENCODING.to_string(),
            dest_encoding: DEFAULT_DEST_ENCODING.to_string(),
            timeout_secs: 300,
            finalize_tick: Duration::from_millis(20),
            render_delay: Duration::from_millis(500),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            chunk_size: 64 * 1024,
            progress_callback: None,
        }
    }
}

fn default_server() -> Url {
    Url::parse("http://127.0.0.1:8080/").expect("static URL is valid")
}

impl fmt::Debug for UploadConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfig")
            .field("server", &self.server.as_str())
            .field("source_encoding", &self.source_encoding)
            .field("dest_encoding", &self.dest_encoding)
            .field("timeout_secs", &self.timeout_secs)
            .field("finalize_tick", &self.finalize_tick)
            .field("render_delay", &self.render_delay)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("chunk_size", &self.chunk_size)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn UploadProgressCallback>"),
            )
            .finish()
    }
}

impl UploadConfig {
    /// Create a new builder for `UploadConfig`.
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder {
            config: Self::default(),
            server: None,
        }
    }

    /// The upload endpoint: `/` on the server base.
    pub fn endpoint_url(&self) -> Url {
        let mut url = self.server.clone();
        url.set_path("/");
        url.set_query(None);
        url
    }
}

/// Builder for [`UploadConfig`].
pub struct UploadConfigBuilder {
    config: UploadConfig,
    server: Option<String>,
}

impl fmt::Debug for UploadConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadConfigBuilder")
            .field("config", &self.config)
            .field("server", &self.server)
            .finish()
    }
}

impl UploadConfigBuilder {
    /// Server base URL; parsed and validated in [`build`](Self::build).
    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.server = Some(url.into());
        self
    }

    /// Source selector value. Blank resets to `auto`.
    pub fn source_encoding(mut self, label: impl AsRef<str>) -> Self {
        self.config.source_encoding =
            selector_or_default(Some(label.as_ref()), DEFAULT_SOURCE_ENCODING);
        self
    }

    /// Destination selector value. Blank resets to `utf-8`.
    pub fn dest_encoding(mut self, label: impl AsRef<str>) -> Self {
        self.config.dest_encoding =
            selector_or_default(Some(label.as_ref()), DEFAULT_DEST_ENCODING);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn finalize_tick(mut self, tick: Duration) -> Self {
        self.config.finalize_tick = tick;
        self
    }

    pub fn render_delay(mut self, delay: Duration) -> Self {
        self.config.render_delay = delay;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<UploadConfig, UploadError> {
        if let Some(raw) = self.server.take() {
            self.config.server = parse_server(&raw)?;
        }
        let c = &self.config;
        if c.timeout_secs == 0 {
            return Err(UploadError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        if c.finalize_tick.is_zero() {
            return Err(UploadError::InvalidConfig(
                "Finalize tick must be non-zero".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(UploadError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

fn parse_server(raw: &str) -> Result<Url, UploadError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| UploadError::InvalidConfig(format!("Server URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(UploadError::InvalidConfig(format!(
            "Server URL must be http or https, got '{other}'"
        ))),
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How results are presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Terminal cards, one block per file. (default)
    #[default]
    Text,
    /// The raw outcome list as pretty JSON.
    Json,
    /// `result-card` markup matching the web tool's results container.
    Html,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_selectors() {
        let c = UploadConfig::default();
        assert_eq!(c.source_encoding, "auto");
        assert_eq!(c.dest_encoding, "utf-8");
        assert_eq!(c.finalize_tick, Duration::from_millis(20));
        assert_eq!(c.render_delay, Duration::from_millis(500));
    }

    #[test]
    fn blank_selector_falls_back() {
        let c = UploadConfig::builder()
            .source_encoding("  ")
            .dest_encoding("")
            .build()
            .unwrap();
        assert_eq!(c.source_encoding, "auto");
        assert_eq!(c.dest_encoding, "utf-8");
    }

    #[test]
    fn selector_value_kept() {
        assert_eq!(selector_or_default(Some("cp500"), "auto"), "cp500");
        assert_eq!(selector_or_default(None, "auto"), "auto");
    }

    #[test]
    fn endpoint_is_root_of_server() {
        let c = UploadConfig::builder()
            .server("http://example.com:9000/some/page?x=1")
            .build()
            .unwrap();
        assert_eq!(c.endpoint_url().as_str(), "http://example.com:9000/");
    }

    #[test]
    fn rejects_non_http_server() {
        let err = UploadConfig::builder().server("ftp://host/").build();
        assert!(matches!(err, Err(UploadError::InvalidConfig(_))));
        let err = UploadConfig::builder().server("not a url").build();
        assert!(matches!(err, Err(UploadError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = UploadConfig::builder().timeout_secs(0).build();
        assert!(matches!(err, Err(UploadError::InvalidConfig(_))));
    }

    #[test]
    fn known_encodings() {
        assert!(is_known_source_encoding("auto"));
        assert!(is_known_source_encoding("CP1047"));
        assert!(!is_known_source_encoding("IBM037"));
        assert!(!is_known_source_encoding("latin-1"));
    }
}
