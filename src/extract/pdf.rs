//! PDF text extraction via the pdf-extract crate.

use crate::error::{LeseError, Result};
use tracing::debug;

/// Extract plain text from PDF bytes.
///
/// pdf-extract can panic on malformed documents, so the call is wrapped in
/// catch_unwind and any panic is reported as an extraction failure.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let outcome = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    let text = match outcome {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(LeseError::Extraction(format!(
                "could not parse PDF: {}",
                e
            )))
        }
        Err(panic_payload) => {
            let msg = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic".to_string()
            };
            return Err(LeseError::Extraction(format!(
                "PDF parser panicked: {}",
                msg
            )));
        }
    };

    if text.trim().is_empty() {
        return Err(LeseError::Extraction(
            "PDF contains no extractable text (it may be scanned images)".to_string(),
        ));
    }

    debug!("Extracted {} characters from PDF", text.len());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_bytes_fail_cleanly() {
        let err = extract_pdf_text(&[0u8; 64]).unwrap_err();
        assert!(matches!(err, LeseError::Extraction(_)));
    }

    #[test]
    fn test_empty_input_fails_cleanly() {
        assert!(extract_pdf_text(&[]).is_err());
    }
}
