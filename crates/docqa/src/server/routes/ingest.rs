//! File upload endpoint

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::ingestion::sanitize_filename;
use crate::server::state::AppState;
use crate::types::{FileType, UploadResponse};

/// POST /upload - Save a `.txt` or `.pdf` file and add it to the index
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    let start = Instant::now();

    let (original_name, data) = loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| Error::InvalidUpload(format!("Failed to read multipart field: {}", e)))?
            .ok_or_else(|| Error::InvalidUpload("No 'file' part in the request".into()))?;

        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidUpload(format!("Failed to read file: {}", e)))?;
        break (name, data);
    };

    if original_name.trim().is_empty() {
        return Err(Error::InvalidUpload("No file selected".into()));
    }
    if !FileType::from_filename(&original_name).is_supported() {
        return Err(Error::UnsupportedFileType(format!(
            "'{}' - only .txt and .pdf files are accepted",
            original_name
        )));
    }
    let filename = sanitize_filename(&original_name)
        .ok_or_else(|| Error::InvalidUpload(format!("Invalid file name '{}'", original_name)))?;

    let dir = state.config().documents.dir.clone();
    tokio::fs::create_dir_all(&dir).await?;
    let path = dir.join(&filename);

    // Stage next to the target so a failed upload never replaces an existing document
    let staged = stage_upload(dir, data.clone()).await?;

    let added = match state.pipeline().ingest_bytes(&filename, &data).await {
        Ok(added) => added,
        Err(e) => {
            tracing::error!("Failed to process upload {}: {}", filename, e);
            return Err(e);
        }
    };

    let target = path.clone();
    tokio::task::spawn_blocking(move || staged.persist(&target))
        .await
        .map_err(|e| Error::internal(format!("Upload task failed: {}", e)))?
        .map_err(|e| Error::Io(e.error))?;
    tracing::info!("Saved upload to {} ({} bytes)", path.display(), data.len());

    let total = state.knowledge().len();
    tracing::info!(
        "Ingested upload {} in {}ms: {} chunks, {} total",
        filename,
        start.elapsed().as_millis(),
        added,
        total
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: format!("File '{}' uploaded and processed.", filename),
            new_chunks_added: added,
            total_chunks_in_index: total,
        }),
    ))
}

/// Write upload bytes to a temporary file inside `dir`; it is removed when dropped
async fn stage_upload(dir: PathBuf, data: Bytes) -> Result<NamedTempFile> {
    tokio::task::spawn_blocking(move || {
        let mut file = NamedTempFile::new_in(&dir)?;
        file.write_all(&data)?;
        file.flush()?;
        Ok::<_, Error>(file)
    })
    .await
    .map_err(|e| Error::internal(format!("Upload task failed: {}", e)))?
}
