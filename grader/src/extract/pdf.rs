use lopdf::Document;

use super::{ExtractError, ExtractStrategy};

/// Extracts text from a PDF page by page. A page whose content cannot be
/// decoded contributes an empty line instead of failing the whole file.
pub struct PdfExtractor;

impl ExtractStrategy for PdfExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let doc = Document::load_mem(bytes)
            .map_err(|e| ExtractError(format!("unreadable PDF: {}", e)))?;

        let pages: Vec<String> = doc
            .get_pages()
            .keys()
            .map(|page| doc.extract_text(&[*page]).unwrap_or_default())
            .collect();

        Ok(pages.join("\n"))
    }

    fn failure_placeholder(&self) -> &'static str {
        "[Error reading PDF file.]"
    }
}
