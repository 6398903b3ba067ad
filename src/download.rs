//! Fetch the per-file ZIP archives linked from conversion results.
//!
//! The server answers with links such as `/uploads/a_converted.zip`, relative
//! to its own origin. Each link is resolved against the configured server,
//! fetched, and written atomically into the target directory under the
//! link's last path segment. A failed download is recorded and the others
//! continue.

use crate::error::DownloadError;
use crate::output::{ConversionResult, FileOutcome};
use futures::stream::{self, StreamExt};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Archives fetched at once.
const DOWNLOAD_CONCURRENCY: usize = 4;

/// Where one archive ended up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub filename: String,
    pub result: Result<PathBuf, DownloadError>,
}

/// Resolve a `zip_download` link against the server base URL.
pub fn resolve_link(base: &Url, link: &str) -> Option<Url> {
    let url = base.join(link.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

/// Local file name for an archive URL: its last non-empty path segment.
pub fn archive_name(url: &Url) -> Option<String> {
    url.path_segments()?
        .rev()
        .find(|s| !s.is_empty())
        .filter(|s| *s != "." && *s != "..")
        .map(str::to_string)
}

/// Download every converted outcome's archive into `dir`.
///
/// Rejected outcomes have no archive and are skipped. Results come back in
/// outcome order.
pub async fn download_archives(
    client: &Client,
    base: &Url,
    outcomes: &[FileOutcome],
    dir: &Path,
) -> Vec<DownloadOutcome> {
    let converted: Vec<&ConversionResult> =
        outcomes.iter().filter_map(FileOutcome::as_converted).collect();

    stream::iter(converted)
        .map(|r| async move {
            DownloadOutcome {
                filename: r.filename.clone(),
                result: download_one(client, base, r, dir).await,
            }
        })
        .buffered(DOWNLOAD_CONCURRENCY)
        .collect()
        .await
}

async fn download_one(
    client: &Client,
    base: &Url,
    result: &ConversionResult,
    dir: &Path,
) -> Result<PathBuf, DownloadError> {
    let invalid = || DownloadError::InvalidLink {
        filename: result.filename.clone(),
        link: result.zip_download.clone(),
    };
    let url = resolve_link(base, &result.zip_download).ok_or_else(invalid)?;
    let name = archive_name(&url).ok_or_else(invalid)?;

    let failed = |detail: String| DownloadError::Failed {
        filename: result.filename.clone(),
        detail,
    };
    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

    let target = dir.join(&name);
    let filename = result.filename.clone();
    let written = write_atomically(dir.to_path_buf(), target.clone(), bytes.to_vec());
    match tokio::task::spawn_blocking(written).await {
        Ok(Ok(())) => {
            info!("Saved {} ({} bytes)", target.display(), bytes.len());
            Ok(target)
        }
        Ok(Err(e)) => {
            warn!("Could not write {}: {}", target.display(), e);
            Err(DownloadError::WriteFailed {
                filename,
                detail: e.to_string(),
            })
        }
        Err(e) => Err(DownloadError::WriteFailed {
            filename,
            detail: format!("write task panicked: {e}"),
        }),
    }
}

/// Write into a temp file beside `target`, then rename over it.
fn write_atomically(
    dir: PathBuf,
    target: PathBuf,
    data: Vec<u8>,
) -> impl FnOnce() -> std::io::Result<()> {
    move || {
        std::fs::create_dir_all(&dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&data)?;
        tmp.flush()?;
        tmp.persist(&target).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8080/").unwrap()
    }

    #[test]
    fn resolves_relative_link() {
        let url = resolve_link(&base(), "/uploads/a_converted.zip").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/uploads/a_converted.zip");
    }

    #[test]
    fn keeps_absolute_link() {
        let url = resolve_link(&base(), "https://cdn.example.com/dl/a.zip").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example.com"));
    }

    #[test]
    fn rejects_non_http_link() {
        assert!(resolve_link(&base(), "file:///etc/passwd").is_none());
        assert!(resolve_link(&base(), "javascript:alert(1)").is_none());
    }

    #[test]
    fn archive_name_is_last_segment() {
        let url = Url::parse("http://h/uploads/a_converted.zip").unwrap();
        assert_eq!(archive_name(&url).as_deref(), Some("a_converted.zip"));
        let url = Url::parse("http://h/").unwrap();
        assert_eq!(archive_name(&url), None);
    }

    #[test]
    fn atomic_write_lands_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.zip");
        write_atomically(dir.path().to_path_buf(), target.clone(), b"PK\x03\x04".to_vec())().unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"PK\x03\x04");
    }

    #[tokio::test]
    async fn rejected_outcomes_are_skipped() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let outcomes = vec![FileOutcome::Rejected {
            filename: "x.ebc".into(),
            error: "no".into(),
        }];
        let got = download_archives(&client, &base(), &outcomes, dir.path()).await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn invalid_link_is_reported_without_network() {
        let client = Client::new();
        let dir = tempfile::tempdir().unwrap();
        let outcomes = vec![FileOutcome::Converted(ConversionResult {
            filename: "a.ebc".into(),
            used_encoding: "cp037".into(),
            dest_encoding: "UTF-8".into(),
            replacement_count: 0,
            zip_download: "http://h/".into(),
        })];
        let got = download_archives(&client, &base(), &outcomes, dir.path()).await;
        assert_eq!(got.len(), 1);
        assert!(matches!(got[0].result, Err(DownloadError::InvalidLink { .. })));
    }
}
