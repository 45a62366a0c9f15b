use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::{Workbook, Worksheet};
use std::io::Cursor;

use super::ConvertError;

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        // Whole floats print without the trailing ".0"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        other => other.to_string(),
    }
}

/// First worksheet as rows of display strings, trailing empty rows dropped
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, ConvertError> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| ConvertError::Spreadsheet(e.to_string()))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ConvertError::Spreadsheet("no sheets found in workbook".to_string()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| ConvertError::Spreadsheet(format!("{sheet_name}: {e}")))?;

    let mut rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    while rows
        .last()
        .is_some_and(|row| row.iter().all(|cell| cell.trim().is_empty()))
    {
        rows.pop();
    }

    log::debug!("read {} rows from sheet {sheet_name}", rows.len());
    Ok(rows)
}

/// Single-sheet workbook, one string cell per item
pub fn write_rows(rows: &[Vec<String>]) -> Result<Vec<u8>, ConvertError> {
    let xlsx_error = |e: rust_xlsxwriter::XlsxError| ConvertError::Spreadsheet(e.to_string());

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            worksheet
                .write_string(r as u32, c as u16, value)
                .map_err(xlsx_error)?;
        }
    }
    workbook.push_worksheet(worksheet);
    workbook.save_to_buffer().map_err(xlsx_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn written_rows_read_back() {
        let rows = vec![
            vec!["name".to_string(), "qty".to_string()],
            vec!["apples".to_string(), "3".to_string()],
        ];
        let bytes = write_rows(&rows).unwrap();
        assert_eq!(read_first_sheet(&bytes).unwrap(), rows);
    }

    #[test]
    fn whole_floats_drop_the_fraction() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(2.5)), "2.5");
    }
}
