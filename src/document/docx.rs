use docx_rs::read_docx;

use super::ExtractError;

pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = read_docx(bytes)
        .map_err(|err| ExtractError::Unreadable(format!("DOCX: {err}")))?;

    let mut text = String::new();
    for child in &document.document.children {
        if let docx_rs::DocumentChild::Paragraph(p) = child {
            for run in &p.children {
                if let docx_rs::ParagraphChild::Run(r) = run {
                    for text_node in &r.children {
                        if let docx_rs::RunChild::Text(t) = text_node {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use docx_rs::{Docx, Paragraph, Run};

    use super::*;

    #[test]
    fn test_paragraphs_become_lines() -> anyhow::Result<()> {
        let mut buffer = Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Mitochondria")))
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Powerhouse of the cell")))
            .build()
            .pack(&mut buffer)?;

        let text = extract(buffer.get_ref())?;
        assert_eq!(text, "Mitochondria\nPowerhouse of the cell\n");
        Ok(())
    }

    #[test]
    fn test_garbage_is_unreadable() {
        assert!(extract(b"PK not really a zip").is_err());
    }
}
