//! Document and chunk types

use serde::{Deserialize, Serialize};

/// Supported document formats
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Plain text file, read verbatim
    Txt,
    /// PDF document, text extracted page by page
    Pdf,
    /// Anything else, carrying the offending extension
    Unsupported(String),
}

impl FileType {
    /// Detect file type from an extension (without the dot, any case)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "txt" => Self::Txt,
            "pdf" => Self::Pdf,
            other => Self::Unsupported(other.to_string()),
        }
    }

    /// Detect file type from a file name or path
    pub fn from_filename(filename: &str) -> Self {
        match std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
        {
            Some(ext) => Self::from_extension(ext),
            None => Self::Unsupported(String::new()),
        }
    }

    /// Check if this file type can be ingested
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Get display name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Txt => "Text",
            Self::Pdf => "PDF",
            Self::Unsupported(_) => "Unsupported",
        }
    }
}

/// A bounded window of a source document, the unit of retrieval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Window text
    pub text: String,
    /// Identifier of the originating document (its file name)
    pub source: String,
    /// Character offset of the window in the document text
    pub offset: usize,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: impl Into<String>, source: impl Into<String>, offset: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            offset,
        }
    }

    /// Length of the window in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("notes.txt"), FileType::Txt);
        assert_eq!(FileType::from_filename("Report.PDF"), FileType::Pdf);
        assert_eq!(
            FileType::from_filename("slides.pptx"),
            FileType::Unsupported("pptx".to_string())
        );
        assert!(!FileType::from_filename("README").is_supported());
    }
}
