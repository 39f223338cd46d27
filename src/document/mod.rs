pub mod pdf;
pub mod docx;
pub mod chunk;

use std::path::Path;

use log::debug;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported document type: {0}")]
    Unsupported(String),
    #[error("could not read document: {0}")]
    Unreadable(String),
    #[error("document contains no extractable text")]
    NoText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    Text,
}

impl DocumentKind {
    /// Decide the document type from the file extension, falling back to magic bytes.
    pub fn detect(filename: &str, bytes: &[u8]) -> Result<Self, ExtractError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase());

        match ext.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("docx") => Ok(Self::Docx),
            Some("txt") | Some("md") => Ok(Self::Text),
            _ if bytes.starts_with(b"%PDF") => Ok(Self::Pdf),
            _ if bytes.starts_with(b"PK\x03\x04") => Ok(Self::Docx),
            Some(other) => Err(ExtractError::Unsupported(other.to_string())),
            None => Err(ExtractError::Unsupported(filename.to_string())),
        }
    }
}

/// Extract normalized text from a document's raw bytes.
pub fn process_document(filename: &str, bytes: &[u8]) -> Result<String, ExtractError> {
    let kind = DocumentKind::detect(filename, bytes)?;
    let content = match kind {
        DocumentKind::Pdf => pdf::extract(bytes)?,
        DocumentKind::Docx => docx::extract(bytes)?,
        DocumentKind::Text => String::from_utf8(bytes.to_vec())
            .map_err(|_| ExtractError::Unreadable("text file is not valid UTF-8".to_string()))?,
    };

    let processed = normalize(&content);
    if processed.trim().is_empty() {
        return Err(ExtractError::NoText);
    }
    debug!("extracted {} chars from {} ({:?})", processed.chars().count(), filename, kind);
    Ok(processed)
}

/// Same as [`process_document`], run on the blocking pool.
///
/// The PDF backend can panic on malformed input; a panic is reported as an
/// unreadable document.
pub async fn process_document_blocking(filename: String, bytes: Vec<u8>) -> Result<String, ExtractError> {
    tokio::task::spawn_blocking(move || process_document(&filename, &bytes))
        .await
        .map_err(|err| ExtractError::Unreadable(format!("extractor crashed: {err}")))?
}

fn normalize(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .replace(|c: char| c.is_control() && c != '\n' && c != '\t', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() -> anyhow::Result<()> {
        assert_eq!(DocumentKind::detect("notes.PDF", b"")?, DocumentKind::Pdf);
        assert_eq!(DocumentKind::detect("notes.docx", b"")?, DocumentKind::Docx);
        assert_eq!(DocumentKind::detect("notes.md", b"")?, DocumentKind::Text);
        assert_eq!(DocumentKind::detect("blob", b"%PDF-1.7")?, DocumentKind::Pdf);
        assert!(matches!(
            DocumentKind::detect("slides.pptx", b"\x00\x01"),
            Err(ExtractError::Unsupported(_))
        ));
        Ok(())
    }

    #[test]
    fn test_text_document() -> anyhow::Result<()> {
        let text = process_document("notes.txt", b"Photosynthesis\r\nmakes\x07 sugar\n")?;
        assert_eq!(text, "Photosynthesis\nmakes sugar\n");
        Ok(())
    }

    #[test]
    fn test_blank_document_has_no_text() {
        assert!(matches!(
            process_document("empty.txt", b"  \n\n "),
            Err(ExtractError::NoText)
        ));
    }

    #[tokio::test]
    async fn test_blocking_unreadable_pdf() {
        let result = process_document_blocking("broken.pdf".to_string(), b"%PDF-garbage".to_vec()).await;
        assert!(matches!(result, Err(ExtractError::Unreadable(_))));
    }
}
