//! Selection checks: only non-empty lists of `.ebc` files may be sent.
//!
//! The check is purely client-side and runs before any file is opened. The
//! server remains the authority on what it accepts; this only spares the
//! user a round trip for an obviously wrong pick.

use crate::error::UploadError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension every selected file name must end with (case-insensitive).
pub const REQUIRED_EXTENSION: &str = ".ebc";

/// A file picked for upload: its name and full content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn len(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<u8>) {
        (self.name, self.content)
    }
}

/// `true` if `name` ends with `.ebc`, ignoring case.
pub fn has_ebc_extension(name: &str) -> bool {
    name.to_lowercase().ends_with(REQUIRED_EXTENSION)
}

/// Reject an empty selection or any name without the `.ebc` extension.
///
/// The first offending name is reported.
pub fn validate_selection<S: AsRef<str>>(names: &[S]) -> Result<(), UploadError> {
    if names.is_empty() {
        return Err(UploadError::EmptySelection);
    }
    if let Some(bad) = names.iter().find(|n| !has_ebc_extension(n.as_ref())) {
        return Err(UploadError::InvalidExtension {
            filename: bad.as_ref().to_string(),
        });
    }
    Ok(())
}

/// The name a path is uploaded under: its final component.
pub fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Validate `paths` by name, then read each file.
///
/// Names are checked first so a bad pick never touches the file system.
pub async fn load_selection<P: AsRef<Path>>(
    paths: &[P],
) -> Result<Vec<SelectedFile>, UploadError> {
    let names: Vec<String> = paths.iter().map(|p| upload_name(p.as_ref())).collect();
    validate_selection(&names)?;

    let mut files = Vec::with_capacity(paths.len());
    for (path, name) in paths.iter().zip(names) {
        let content = read_file(path.as_ref()).await?;
        debug!("Selected {} ({} bytes)", name, content.len());
        files.push(SelectedFile::new(name, content));
    }
    Ok(files)
}

async fn read_file(path: &Path) -> Result<Vec<u8>, UploadError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => UploadError::FileNotFound {
            path: PathBuf::from(path),
        },
        std::io::ErrorKind::PermissionDenied => UploadError::PermissionDenied {
            path: PathBuf::from(path),
        },
        _ => UploadError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
    })
}
