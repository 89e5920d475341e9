//! Content extraction for supported file types

use sha2::{Digest, Sha256};
use std::io::Write;

use crate::error::{Error, Result};
use crate::types::FileType;

/// Wall-clock bound for a single PDF parse
const PDF_EXTRACT_TIMEOUT_SECS: u64 = 60;

/// Extracts plain text from raw file bytes
///
/// Dispatch is by the declared file type, never by sniffing content; the type
/// comes from the filename extension and unsupported extensions are rejected
/// before any bytes are touched.
pub struct ContentExtractor;

impl ContentExtractor {
    /// Resolve the declared file type from a filename
    pub fn detect_type(filename: &str) -> Result<FileType> {
        FileType::from_filename(filename).ok_or_else(|| {
            let ext = std::path::Path::new(filename)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or(filename);
            Error::UnsupportedFileType(ext.to_lowercase())
        })
    }

    /// Extract plain text, preserving source order
    pub fn extract(filename: &str, file_type: FileType, data: &[u8]) -> Result<String> {
        match file_type {
            FileType::Pdf => Self::extract_pdf(filename, data),
            // Legacy .doc goes through the same parser; genuinely binary DOC
            // payloads fail extraction rather than being skipped
            FileType::Docx | FileType::Doc => Self::extract_docx(filename, data),
            FileType::Markdown | FileType::Plain => Ok(Self::extract_text(data)),
        }
    }

    /// Extract PDF text via a scoped temp file, bounded by a parse timeout
    fn extract_pdf(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        // The PDF parser wants file-path access; the temp file is removed on
        // drop on every exit path below.
        let mut temp = tempfile::NamedTempFile::new()?;
        temp.write_all(data)?;
        temp.flush()?;

        let path = temp.path().to_path_buf();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text(&path);
            let _ = tx.send(result);
        });

        let content = match rx.recv_timeout(Duration::from_secs(PDF_EXTRACT_TIMEOUT_SECS)) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                text
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(Error::extraction(filename, e.to_string()));
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The parse thread cannot be killed; it holds its own path
                // handle and the unlinked temp file goes away when it exits.
                tracing::error!(
                    "PDF extraction timeout after {}s for '{}'",
                    PDF_EXTRACT_TIMEOUT_SECS,
                    filename
                );
                return Err(Error::extraction(filename, "PDF extraction timed out"));
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(Error::extraction(filename, "PDF extraction thread crashed"));
            }
        };

        let content = content
            .replace('\0', "")
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if content.trim().is_empty() {
            return Err(Error::extraction(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        Ok(content)
    }

    /// Extract DOCX text by walking the document tree in paragraph order
    fn extract_docx(filename: &str, data: &[u8]) -> Result<String> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();
        for child in doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    let mut text = String::new();
                    for child in p.children {
                        if let docx_rs::ParagraphChild::Run(run) = child {
                            for child in run.children {
                                if let docx_rs::RunChild::Text(t) = child {
                                    text.push_str(&t.text);
                                }
                            }
                        }
                    }
                    paragraphs.push(text);
                }
                docx_rs::DocumentChild::Table(_) => {
                    // Table extraction not supported
                }
                _ => {}
            }
        }

        let content = paragraphs.join("\n\n");
        if content.trim().is_empty() {
            return Err(Error::extraction(
                filename,
                "No text content could be extracted",
            ));
        }

        Ok(content)
    }

    /// Decode plain text or markdown as UTF-8
    fn extract_text(data: &[u8]) -> String {
        String::from_utf8_lossy(data).to_string()
    }
}

/// SHA-256 hex digest of uploaded bytes, logged for traceability
pub fn hash_content(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_type_supported() {
        assert_eq!(
            ContentExtractor::detect_type("report.pdf").unwrap(),
            FileType::Pdf
        );
        assert_eq!(
            ContentExtractor::detect_type("notes.MD").unwrap(),
            FileType::Markdown
        );
    }

    #[test]
    fn test_detect_type_rejects_unknown_extension() {
        let err = ContentExtractor::detect_type("malware.exe").unwrap_err();
        match err {
            Error::UnsupportedFileType(ext) => assert_eq!(ext, "exe"),
            other => panic!("expected UnsupportedFileType, got {:?}", other),
        }
    }

    #[test]
    fn test_detect_type_rejects_missing_extension() {
        assert!(matches!(
            ContentExtractor::detect_type("README"),
            Err(Error::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_extract_plain_text() {
        let text = ContentExtractor::extract("a.txt", FileType::Plain, b"hello\nworld").unwrap();
        assert_eq!(text, "hello\nworld");
    }

    #[test]
    fn test_extract_markdown_is_raw() {
        let md = b"# Title\n\nBody paragraph.";
        let text = ContentExtractor::extract("a.md", FileType::Markdown, md).unwrap();
        assert_eq!(text, "# Title\n\nBody paragraph.");
    }

    #[test]
    fn test_extract_invalid_docx_fails() {
        let err =
            ContentExtractor::extract("broken.docx", FileType::Docx, b"not a zip archive").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_extract_invalid_pdf_fails() {
        let err = ContentExtractor::extract("broken.pdf", FileType::Pdf, b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Extraction { .. }));
    }

    #[test]
    fn test_hash_content_is_deterministic() {
        let a = hash_content(b"same bytes");
        let b = hash_content(b"same bytes");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert_ne!(a, hash_content(b"different bytes"));
    }
}
