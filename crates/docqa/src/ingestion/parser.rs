//! Text extraction for plain-text and PDF files

use crate::error::{Error, Result};
use crate::types::FileType;

/// Extracted text of one document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

/// Format-specific text reader
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        match FileType::from_filename(filename) {
            FileType::Txt => Ok(Self::parse_text(data)),
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Unsupported(ext) => Err(Error::UnsupportedFileType(format!(
                "'{}' - only .txt and .pdf files are accepted",
                ext
            ))),
        }
    }

    /// Plain text is taken verbatim; invalid UTF-8 sequences are replaced
    fn parse_text(data: &[u8]) -> ParsedDocument {
        ParsedDocument {
            file_type: FileType::Txt,
            content: String::from_utf8_lossy(data).into_owned(),
            total_pages: None,
        }
    }

    /// Concatenate the text of every page in page order
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        match Self::extract_pages(data) {
            Ok((content, pages)) => Ok(ParsedDocument {
                file_type: FileType::Pdf,
                content,
                total_pages: Some(pages),
            }),
            Err(page_error) => {
                tracing::warn!(
                    "Per-page extraction failed for {} ({}), retrying whole document",
                    filename,
                    page_error
                );
                let content = pdf_extract::extract_text_from_mem(data)
                    .map_err(|e| Error::file_parse(filename, e.to_string()))?;
                Ok(ParsedDocument {
                    file_type: FileType::Pdf,
                    content,
                    total_pages: None,
                })
            }
        }
    }

    fn extract_pages(data: &[u8]) -> std::result::Result<(String, u32), lopdf::Error> {
        let doc = lopdf::Document::load_mem(data)?;
        let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();

        let mut content = String::new();
        for page in &page_numbers {
            content.push_str(&doc.extract_text(&[*page])?);
        }

        Ok((content, page_numbers.len() as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_verbatim() {
        let parsed = FileParser::parse("notes.txt", "Line one\nLine two\n".as_bytes()).unwrap();
        assert_eq!(parsed.file_type, FileType::Txt);
        assert_eq!(parsed.content, "Line one\nLine two\n");
    }

    #[test]
    fn test_unsupported_extension() {
        let err = FileParser::parse("slides.pptx", b"PK").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_unreadable_pdf_is_parse_error() {
        let err = FileParser::parse("broken.pdf", b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }
}
