//! PDF pre-check run before a file is sent for analysis.

use lopdf::Document;
use tracing::debug;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Basic facts about a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PdfInfo {
    /// Number of pages.
    pub page_count: u32,
    /// Whether the file was encrypted (and opened with the empty password).
    pub encrypted: bool,
}

/// Parse `data` as a PDF and report its page count.
///
/// Encrypted files are accepted only when the empty password opens them.
pub fn inspect(data: &[u8]) -> Result<PdfInfo> {
    let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    let encrypted = doc.is_encrypted();
    if encrypted {
        if doc.decrypt("").is_err() {
            return Err(PdfError::Encrypted);
        }
        debug!("Decrypted PDF with empty password");
    }

    let page_count = doc.get_pages().len() as u32;
    if page_count == 0 {
        return Err(PdfError::NoPages);
    }

    debug!("PDF has {} pages", page_count);
    Ok(PdfInfo {
        page_count,
        encrypted,
    })
}

/// Whether the bytes start with the PDF header.
pub fn has_pdf_header(data: &[u8]) -> bool {
    data.starts_with(b"%PDF-")
}
