use bytes::Bytes;
use tracing::debug;

use crate::errors::AppError;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Extracts and normalizes the text of an uploaded CV.
pub fn extract_text(document: &[u8]) -> Result<String, AppError> {
    if document.is_empty() {
        return Err(AppError::Validation("CV upload is empty".to_string()));
    }
    if !document.starts_with(PDF_MAGIC) {
        return Err(AppError::Extraction("file is not a PDF".to_string()));
    }

    let raw = pdf_extract::extract_text_from_mem(document)
        .map_err(|e| AppError::Extraction(format!("could not read PDF: {e}")))?;
    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(AppError::Extraction(
            "PDF contains no extractable text".to_string(),
        ));
    }

    debug!(chars = text.len(), "Extracted CV text");
    Ok(text)
}

/// Runs `extract_text` off the async runtime. pdf-extract can panic on
/// malformed files; a panic surfaces as an extraction error.
pub async fn extract_text_blocking(document: Bytes) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || extract_text(&document))
        .await
        .map_err(|e| AppError::Extraction(format!("PDF parser crashed: {e}")))?
}

/// CRLF to LF, runs of spaces and tabs to one space, three or more newlines
/// to two, then trim.
pub fn normalize_whitespace(text: &str) -> String {
    let text = text.replace("\r\n", "\n");

    let mut spaced = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ' ' || c == '\t' {
            if !spaced.ends_with(' ') {
                spaced.push(' ');
            }
        } else {
            spaced.push(c);
        }
    }

    let mut out = String::with_capacity(spaced.len());
    let mut run = 0usize;
    for c in spaced.chars() {
        if c == '\n' {
            run += 1;
            if run <= 2 {
                out.push(c);
            }
        } else {
            run = 0;
            out.push(c);
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_spaces_and_tabs() {
        assert_eq!(normalize_whitespace("a  \t b"), "a b");
    }

    #[test]
    fn test_normalize_caps_blank_lines_at_two_newlines() {
        assert_eq!(normalize_whitespace("a\n\n\n\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("a\n\nb"), "a\n\nb");
        assert_eq!(normalize_whitespace("a\nb"), "a\nb");
    }

    #[test]
    fn test_normalize_converts_crlf_and_trims() {
        assert_eq!(normalize_whitespace("  a\r\nb\r\n\r\n\r\nc  "), "a\nb\n\nc");
    }

    #[test]
    fn test_extract_rejects_non_pdf() {
        let err = extract_text(b"hello world").unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }

    #[test]
    fn test_extract_rejects_empty_upload() {
        let err = extract_text(b"").unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blocking_wrapper_reports_errors() {
        let err = extract_text_blocking(Bytes::from_static(b"not a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Extraction(_)));
    }
}
