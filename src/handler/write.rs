use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook};

use crate::flashcard::Flashcard;

pub fn export_to_excel(cards: &[Flashcard], path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();

    let worksheet = workbook.add_worksheet();

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center);

    worksheet.write_string_with_format(0u32, 0, "#", &header_format)?;
    worksheet.write_string_with_format(0u32, 1, "Question", &header_format)?;
    worksheet.write_string_with_format(0u32, 2, "Answer", &header_format)?;

    for (i, card) in cards.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, row as f64)?;
        worksheet.write_string(row, 1, &card.question)?;
        worksheet.write_string(row, 2, &card.answer)?;
    }

    worksheet.autofit();

    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("deck.xlsx");
        let cards: Vec<_> = [("Capital of France?", "Paris"), ("Capital of Italy?", "Rome")]
            .iter()
            .filter_map(|(q, a)| Flashcard::new(q, a))
            .collect();

        export_to_excel(&cards, &path)?;
        let bytes = std::fs::read(&path)?;
        assert!(bytes.starts_with(b"PK"));
        Ok(())
    }
}
