//! Document text extraction.
//!
//! Turns raw uploaded file bytes into plain text based on the file extension.

mod pdf;

use crate::error::{LeseError, Result};

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Pdf,
    Text,
    Markdown,
}

impl FileFormat {
    /// Detect the format from a file name's extension.
    pub fn detect(file_name: &str) -> Result<Self> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => Ok(FileFormat::Pdf),
            "txt" => Ok(FileFormat::Text),
            "md" | "markdown" => Ok(FileFormat::Markdown),
            "" => Err(LeseError::UnsupportedFormat(format!(
                "'{}' has no file extension",
                file_name
            ))),
            other => Err(LeseError::UnsupportedFormat(format!(
                "'.{}' files are not supported (supported: .pdf, .txt, .md)",
                other
            ))),
        }
    }
}

/// Extract plain text from file bytes.
///
/// Fails with `Extraction` when the content cannot be parsed (e.g. a corrupt PDF).
pub fn extract_text(bytes: &[u8], format: FileFormat) -> Result<String> {
    match format {
        FileFormat::Pdf => pdf::extract_pdf_text(bytes),
        FileFormat::Text | FileFormat::Markdown => Ok(decode_text(bytes)),
    }
}

/// Decode text bytes as UTF-8, replacing invalid sequences.
fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_formats() {
        assert_eq!(FileFormat::detect("report.pdf").unwrap(), FileFormat::Pdf);
        assert_eq!(FileFormat::detect("notes.TXT").unwrap(), FileFormat::Text);
        assert_eq!(
            FileFormat::detect("readme.md").unwrap(),
            FileFormat::Markdown
        );
    }

    #[test]
    fn test_detect_unknown_extension() {
        let err = FileFormat::detect("image.png").unwrap_err();
        assert!(matches!(err, LeseError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_detect_missing_extension() {
        let err = FileFormat::detect("Makefile").unwrap_err();
        assert!(matches!(err, LeseError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_extract_plain_text() {
        let text = extract_text(b"hello world", FileFormat::Text).unwrap();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_extract_invalid_utf8_is_lossy() {
        let text = extract_text(&[0x68, 0x69, 0xFF], FileFormat::Text).unwrap();
        assert!(text.starts_with("hi"));
    }

    #[test]
    fn test_extract_corrupt_pdf() {
        let err = extract_text(b"not a pdf at all", FileFormat::Pdf).unwrap_err();
        assert!(matches!(err, LeseError::Extraction(_)));
    }
}
