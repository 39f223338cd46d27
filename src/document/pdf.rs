use pdf_extract::extract_text_from_mem_by_pages;

use super::ExtractError;

const PAGE_SEPARATOR: &str = "\n\n";

/// Extract the text of every page, skipping pages with no text layer.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let pages = extract_text_from_mem_by_pages(bytes)
        .map_err(|err| ExtractError::Unreadable(format!("PDF: {err}")))?;
    Ok(join_pages(&pages))
}

fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR)
}
