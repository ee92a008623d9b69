//! Ingestion pipeline orchestration

use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::retrieval::KnowledgeBase;
use crate::types::FileType;

use super::chunker::TextChunker;
use super::parser::FileParser;

/// Outcome of ingesting a directory of documents
#[derive(Debug, Clone, Default)]
pub struct IngestSummary {
    /// Files indexed successfully
    pub files_processed: usize,
    /// Files that failed to ingest
    pub files_failed: Vec<(PathBuf, String)>,
    /// Chunks added across all files
    pub chunks_added: usize,
}

/// Main ingestion pipeline: read, chunk, embed, index
#[derive(Clone)]
pub struct IngestPipeline {
    /// Text chunker
    chunker: TextChunker,
    /// Shared index the chunks are added to
    knowledge: Arc<KnowledgeBase>,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(chunker: TextChunker, knowledge: Arc<KnowledgeBase>) -> Self {
        Self { chunker, knowledge }
    }

    /// The knowledge base this pipeline feeds
    pub fn knowledge(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge
    }

    /// Ingest a file from disk. Returns the number of chunks added.
    pub async fn ingest(&self, path: &Path) -> Result<usize> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::file_parse(path.display().to_string(), "invalid file name"))?
            .to_string();

        let file_type = FileType::from_filename(&filename);
        if !file_type.is_supported() {
            return Err(Error::UnsupportedFileType(filename));
        }

        let data = tokio::fs::read(path).await?;
        self.ingest_bytes(&filename, &data).await
    }

    /// Ingest file contents already in memory, tagged with `filename` as source
    pub async fn ingest_bytes(&self, filename: &str, data: &[u8]) -> Result<usize> {
        let owned_name = filename.to_string();
        let owned_data = data.to_vec();
        let parsed = tokio::task::spawn_blocking(move || FileParser::parse(&owned_name, &owned_data))
            .await
            .map_err(|e| Error::internal(format!("Parser task failed: {}", e)))??;

        if parsed.content.trim().is_empty() {
            return Err(Error::EmptyDocument(filename.to_string()));
        }

        let chunks = self.chunker.chunk(&parsed.content, filename);
        match parsed.total_pages {
            Some(pages) => tracing::info!(
                "Processing {} ({}, {} pages, {} chars, {} chunks)",
                filename,
                parsed.file_type.display_name(),
                pages,
                parsed.content.chars().count(),
                chunks.len()
            ),
            None => tracing::info!(
                "Processing {} ({}, {} chars, {} chunks)",
                filename,
                parsed.file_type.display_name(),
                parsed.content.chars().count(),
                chunks.len()
            ),
        }

        self.knowledge.index_chunks(chunks).await
    }

    /// Ingest every `.txt` and `.pdf` file directly inside `dir`, in name order.
    ///
    /// Uses the same path as a single upload. A failing file is logged and
    /// skipped; the directory is created when missing.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<IngestSummary> {
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await?;
            tracing::info!("Created documents directory {}", dir.display());
        }

        let mut summary = IngestSummary::default();

        let files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| FileType::from_filename(n).is_supported())
                    .unwrap_or(false)
            })
            .collect();

        for path in files {
            tracing::info!("Ingesting {}", path.display());
            match self.ingest(&path).await {
                Ok(count) => {
                    summary.files_processed += 1;
                    summary.chunks_added += count;
                }
                Err(e) => {
                    tracing::error!("Failed to ingest {}: {}", path.display(), e);
                    summary.files_failed.push((path, e.to_string()));
                }
            }
        }

        if summary.files_processed == 0 {
            tracing::info!("No documents ingested from {}; index is empty", dir.display());
        } else {
            tracing::info!(
                "Ingested {} files ({} chunks), {} failed",
                summary.files_processed,
                summary.chunks_added,
                summary.files_failed.len()
            );
        }

        Ok(summary)
    }
}

/// Reduce an uploaded file name to a safe single path component.
///
/// Keeps the last component, replaces characters outside `[A-Za-z0-9._-]`
/// with `_` and strips leading dots. Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '_') {
        None
    } else {
        Some(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::knowledge::tests::FixedEmbedder;

    fn pipeline() -> IngestPipeline {
        let embedder = FixedEmbedder::new(&[
            ("The capital of France is Paris.", vec![1.0, 0.0]),
            ("Rust has no garbage collector.", vec![0.0, 1.0]),
        ]);
        IngestPipeline::new(
            TextChunker::default(),
            Arc::new(KnowledgeBase::new(Arc::new(embedder))),
        )
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(
            sanitize_filename("../../etc/passwd.txt").as_deref(),
            Some("passwd.txt")
        );
        assert_eq!(
            sanitize_filename("my notes (v2).txt").as_deref(),
            Some("my_notes__v2_.txt")
        );
        assert_eq!(sanitize_filename("C:\\docs\\a.txt").as_deref(), Some("a.txt"));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[tokio::test]
    async fn test_ingest_bytes_indexes_chunks() {
        let pipeline = pipeline();
        let added = pipeline
            .ingest_bytes("france.txt", b"The capital of France is Paris.")
            .await
            .unwrap();
        assert_eq!(added, 1);
        assert_eq!(pipeline.knowledge().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_document_is_an_error() {
        let pipeline = pipeline();
        let err = pipeline.ingest_bytes("blank.txt", b"   \n").await.unwrap_err();
        assert!(matches!(err, Error::EmptyDocument(_)));
        assert!(pipeline.knowledge().is_empty());
    }

    #[tokio::test]
    async fn test_directory_ingestion_skips_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "The capital of France is Paris.").unwrap();
        std::fs::write(dir.path().join("b.txt"), "Rust has no garbage collector.").unwrap();
        std::fs::write(dir.path().join("c.txt"), "").unwrap();
        std::fs::write(dir.path().join("d.pdf"), "not really a pdf").unwrap();
        std::fs::write(dir.path().join("e.md"), "# ignored").unwrap();

        let pipeline = pipeline();
        let summary = pipeline.ingest_directory(dir.path()).await.unwrap();

        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.chunks_added, 2);
        assert_eq!(summary.files_failed.len(), 2);
        assert_eq!(pipeline.knowledge().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("documents");

        let summary = pipeline().ingest_directory(&docs).await.unwrap();
        assert!(docs.is_dir());
        assert_eq!(summary.files_processed, 0);
    }
}
