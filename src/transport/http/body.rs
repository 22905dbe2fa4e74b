//! Streaming multipart bodies with progress reporting

use bytes::Bytes;
use futures::Stream;
use reqwest::multipart::{Form, Part};

use crate::error::Result;
use crate::transport::{ProgressCallback, UploadForm};

/// Size of each chunk handed to the connection (64 KiB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Build the multipart form for an upload
pub(super) fn multipart_form(form: UploadForm, progress: Option<ProgressCallback>) -> Result<Form> {
    let total = form.data.len() as u64;
    let body = reqwest::Body::wrap_stream(progress_chunks(form.data, progress));

    let part = Part::stream_with_length(body, total)
        .file_name(form.file_name)
        .mime_str(&form.mime)?;

    let mut multipart = Form::new();
    for (name, value) in form.fields {
        multipart = multipart.text(name, value);
    }
    Ok(multipart.part(form.file_field, part))
}

/// Split `data` into chunks, reporting `(sent, total)` as each one is handed out
pub(super) fn progress_chunks(
    data: Bytes,
    progress: Option<ProgressCallback>,
) -> impl Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    async_stream::stream! {
        let total = data.len() as u64;
        if let Some(ref report) = progress {
            report(0, total);
        }

        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + CHUNK_SIZE).min(data.len());
            let chunk = data.slice(offset..end);
            offset = end;
            if let Some(ref report) = progress {
                report(offset as u64, total);
            }
            yield Ok(chunk);
        }
    }
}
