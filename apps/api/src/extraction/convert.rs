//! Document to plain text. Only plain text and PDF uploads are understood;
//! everything else is rejected before extraction runs.

use std::path::Path;

use thiserror::Error;

pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("unsupported content type '{0}'")]
    UnsupportedMimeType(String),

    #[error("could not read PDF: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone)]
pub struct ConvertedDocument {
    pub mime_type: String,
    pub body: String,
}

/// Resolves a content type from the file extension.
pub fn mime_type_by_extension(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("txt") | Some("text") => "text/plain",
        Some("md") => "text/markdown",
        Some("pdf") => "application/pdf",
        _ => OCTET_STREAM,
    }
}

/// Converts an uploaded document to text.
///
/// A generic `application/octet-stream` type is resolved from `filename`.
/// CPU-bound; call from `spawn_blocking`.
pub fn to_text(
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Result<ConvertedDocument, ConvertError> {
    // Drop parameters such as "; charset=utf-8"
    let declared = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let mime_type = if declared == OCTET_STREAM {
        mime_type_by_extension(filename).to_string()
    } else {
        declared
    };

    let body = if mime_type.starts_with("text/") {
        String::from_utf8_lossy(data).into_owned()
    } else if mime_type == "application/pdf" {
        pdf_extract::extract_text_from_mem(data).map_err(|e| ConvertError::Pdf(e.to_string()))?
    } else {
        return Err(ConvertError::UnsupportedMimeType(mime_type));
    };

    Ok(ConvertedDocument { mime_type, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_passes_through() {
        let doc = to_text("a.txt", "text/plain; charset=utf-8", "北京大学".as_bytes()).unwrap();
        assert_eq!(doc.mime_type, "text/plain");
        assert_eq!(doc.body, "北京大学");
    }

    #[test]
    fn test_octet_stream_uses_extension() {
        let doc = to_text("张三的简历.TXT", OCTET_STREAM, b"hello").unwrap();
        assert_eq!(doc.mime_type, "text/plain");
        assert_eq!(doc.body, "hello");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = to_text("cv.docx", OCTET_STREAM, b"PK").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedMimeType(ref m) if m == OCTET_STREAM));

        let err = to_text("cv.png", "image/png", b"").unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedMimeType(_)));
    }

    #[test]
    fn test_garbage_pdf_is_an_error() {
        let err = to_text("cv.pdf", "application/pdf", b"not a pdf").unwrap_err();
        assert!(matches!(err, ConvertError::Pdf(_)));
    }

    #[test]
    fn test_mime_type_by_extension() {
        assert_eq!(mime_type_by_extension("a/b/c.pdf"), "application/pdf");
        assert_eq!(mime_type_by_extension("notes.md"), "text/markdown");
        assert_eq!(mime_type_by_extension("noext"), OCTET_STREAM);
    }
}
