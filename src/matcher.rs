use crate::period::PeriodLabel;
use crate::schema::{HeaderLabel, HeaderMap};
use crate::workbook::{Cell, Sheet};

/// First row below the header whose period cell is text equal (ignoring case)
/// to `target`. Later duplicates are never considered.
pub fn find_period_row(
    sheet: &Sheet,
    header: &HeaderMap,
    header_row: usize,
    target: &PeriodLabel,
) -> Option<usize> {
    let column = header.column(HeaderLabel::Period);
    (header_row + 1..=sheet.max_row()).find(|&row| match sheet.cell(row, column) {
        Cell::Text(text) => target.matches(text),
        Cell::Formula { cached, .. } => cached.as_text().is_some_and(|t| target.matches(t)),
        _ => false,
    })
}
