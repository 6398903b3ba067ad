//! Multipart request assembly.
//!
//! The form carries one `files` part per selected file, in selection order,
//! followed by the `encoding` and `dest_encoding` text fields. File parts are
//! streamed in `chunk_size` pieces so the [`TransferTracker`] sees each piece
//! as the transport pulls it.

use crate::config::{selector_or_default, DEFAULT_DEST_ENCODING, DEFAULT_SOURCE_ENCODING};
use crate::error::UploadError;
use crate::pipeline::selection::{validate_selection, SelectedFile};
use crate::pipeline::transfer::TransferTracker;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::sync::Arc;

pub const FILES_FIELD: &str = "files";
pub const ENCODING_FIELD: &str = "encoding";
pub const DEST_ENCODING_FIELD: &str = "dest_encoding";

/// A validated upload, ready to be turned into a multipart body.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    files: Vec<SelectedFile>,
    encoding: String,
    dest_encoding: String,
}

/// Shape of one form field, for logging and inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField<'a> {
    File {
        name: &'static str,
        filename: &'a str,
        len: u64,
    },
    Text {
        name: &'static str,
        value: &'a str,
    },
}

impl UploadRequest {
    /// Build a request from files and the two selector values.
    ///
    /// Blank or missing selectors fall back to `auto` / `utf-8`. The file
    /// list is re-checked so a request can never exist with a bad name.
    pub fn new(
        files: Vec<SelectedFile>,
        encoding: Option<&str>,
        dest_encoding: Option<&str>,
    ) -> Result<Self, UploadError> {
        let names: Vec<&str> = files.iter().map(SelectedFile::name).collect();
        validate_selection(&names)?;
        Ok(Self {
            files,
            encoding: selector_or_default(encoding, DEFAULT_SOURCE_ENCODING),
            dest_encoding: selector_or_default(dest_encoding, DEFAULT_DEST_ENCODING),
        })
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn dest_encoding(&self) -> &str {
        &self.dest_encoding
    }

    /// Summed length of all file contents.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(SelectedFile::len).sum()
    }

    /// Fields in the order they are written to the body.
    pub fn fields(&self) -> Vec<FormField<'_>> {
        let mut fields: Vec<FormField<'_>> = self
            .files
            .iter()
            .map(|f| FormField::File {
                name: FILES_FIELD,
                filename: f.name(),
                len: f.len(),
            })
            .collect();
        fields.push(FormField::Text {
            name: ENCODING_FIELD,
            value: &self.encoding,
        });
        fields.push(FormField::Text {
            name: DEST_ENCODING_FIELD,
            value: &self.dest_encoding,
        });
        fields
    }

    /// Consume the request into a multipart form whose file bodies report
    /// to `tracker` as they are read.
    pub fn into_form(self, tracker: Arc<TransferTracker>, chunk_size: usize) -> Form {
        let chunk_size = chunk_size.max(1);
        let mut form = Form::new();

        for file in self.files {
            let (name, content) = file.into_parts();
            let len = content.len() as u64;
            let chunks: Vec<Vec<u8>> = content.chunks(chunk_size).map(<[u8]>::to_vec).collect();
            let tracker = Arc::clone(&tracker);
            let body = Body::wrap_stream(stream::iter(chunks).map(move |chunk| {
                tracker.record(chunk.len() as u64);
                Ok::<_, std::io::Error>(chunk)
            }));
            let part = Part::stream_with_length(body, len).file_name(name);
            form = form.part(FILES_FIELD, part);
        }

        form.text(ENCODING_FIELD, self.encoding)
            .text(DEST_ENCODING_FIELD, self.dest_encoding)
    }
}
