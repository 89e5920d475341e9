//! Document and chunk records

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Byte size recorded when the upload cannot report one
pub const UNKNOWN_SIZE: i64 = -1;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Legacy Microsoft Word document (.doc)
    Doc,
    /// Microsoft Word document (.docx)
    Docx,
    /// Markdown file
    Markdown,
    /// Plain text file
    Plain,
}

impl FileType {
    /// Detect file type from extension; `None` means the type is unsupported
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "doc" => Some(Self::Doc),
            "docx" => Some(Self::Docx),
            "md" | "markdown" => Some(Self::Markdown),
            "txt" | "text" | "plain" => Some(Self::Plain),
            _ => None,
        }
    }

    /// Detect file type from a filename's extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = filename.rsplit('.').next()?;
        if ext == filename {
            // No dot at all
            return None;
        }
        Self::from_extension(ext)
    }

    /// Stable lowercase name, used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Doc => "doc",
            Self::Docx => "docx",
            Self::Markdown => "markdown",
            Self::Plain => "plain",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Doc => "Word Document (.doc)",
            Self::Docx => "Word Document (.docx)",
            Self::Markdown => "Markdown",
            Self::Plain => "Text File",
        }
    }
}

/// A document that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Original filename as uploaded
    pub name: String,
    /// File type
    pub file_type: FileType,
    /// File size in bytes, or -1 when the upload did not report one
    pub size: i64,
    /// Location of the original bytes in the object store (`bucket/key`)
    pub object_location: String,
    /// Owning user
    pub owner_id: Uuid,
    /// Ingestion timestamp
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(
        name: String,
        file_type: FileType,
        size: i64,
        object_location: String,
        owner_id: Uuid,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            file_type,
            size,
            object_location,
            owner_id,
            created_at: chrono::Utc::now(),
        }
    }
}

/// A chunk row in the metadata store
///
/// The chunk's text and embedding live in the vector index under the same id;
/// this row anchors the id and its position to the owning document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk ID, shared with the vector index entry
    pub id: Uuid,
    /// 0-based ordinal within the document
    pub position: u32,
    /// Parent document ID
    pub document_id: Uuid,
}

impl ChunkRecord {
    /// Create a new chunk record
    pub fn new(position: u32, document_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            document_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_extension("pdf"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_extension("md"), Some(FileType::Markdown));
        assert_eq!(FileType::from_extension("txt"), Some(FileType::Plain));
        assert_eq!(FileType::from_extension("exe"), None);
    }

    #[test]
    fn test_file_type_from_filename() {
        assert_eq!(FileType::from_filename("notes.docx"), Some(FileType::Docx));
        assert_eq!(
            FileType::from_filename("archive.tar.md"),
            Some(FileType::Markdown)
        );
        assert_eq!(FileType::from_filename("no_extension"), None);
        assert_eq!(FileType::from_filename("binary.exe"), None);
    }

    #[test]
    fn test_file_type_round_trips_through_str() {
        for ft in [
            FileType::Pdf,
            FileType::Doc,
            FileType::Docx,
            FileType::Markdown,
            FileType::Plain,
        ] {
            assert_eq!(FileType::from_extension(ft.as_str()), Some(ft));
        }
    }
}
