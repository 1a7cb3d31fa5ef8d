use crate::schema::{Aggregate, HeaderLabel, HeaderMap};
use crate::workbook::{Cell, Sheet};

/// Writes one aggregate into `row`. The value column is always overwritten;
/// date columns only when the aggregate carries a date. No other cell changes.
pub fn write_aggregate(sheet: &mut Sheet, row: usize, header: &HeaderMap, aggregate: &Aggregate) {
    if let Some(date) = aggregate.latest_invoice_date {
        sheet.set_cell(row, header.column(HeaderLabel::InvoiceDate), Cell::Date(date));
    }

    sheet.set_cell(
        row,
        header.column(HeaderLabel::InvoiceValue),
        Cell::Number(aggregate.total_value.clone()),
    );

    if let Some(date) = aggregate.latest_receipt_date {
        sheet.set_cell(row, header.column(HeaderLabel::ReceiptDate), Cell::Date(date));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodLabel;
    use bigdecimal::{BigDecimal, Zero};
    use chrono::NaiveDate;

    fn header() -> HeaderMap {
        HeaderMap {
            period: 1,
            invoice_date: 2,
            invoice_value: 3,
            receipt_date: 4,
        }
    }

    fn existing_row() -> Sheet {
        let mut sheet = Sheet::new("12");
        sheet.set_cell(2, 1, Cell::text("MARÇO/24"));
        sheet.set_cell(2, 2, Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        sheet.set_cell(2, 3, Cell::Number(BigDecimal::from(7)));
        sheet.set_cell(2, 4, Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
        sheet.set_cell(2, 5, Cell::text("keep me"));
        sheet
    }

    #[test]
    fn test_writes_all_present_fields() {
        let mut sheet = existing_row();
        let aggregate = Aggregate {
            site_id: 12,
            period: PeriodLabel::new("MARÇO/24"),
            total_value: BigDecimal::from(1500),
            latest_invoice_date: NaiveDate::from_ymd_opt(2024, 3, 20),
            latest_receipt_date: NaiveDate::from_ymd_opt(2024, 4, 10),
        };

        write_aggregate(&mut sheet, 2, &header(), &aggregate);

        assert_eq!(sheet.cell(2, 2), &Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()));
        assert_eq!(sheet.cell(2, 3), &Cell::Number(BigDecimal::from(1500)));
        assert_eq!(sheet.cell(2, 4), &Cell::Date(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()));
        assert_eq!(sheet.cell(2, 1), &Cell::text("MARÇO/24"));
        assert_eq!(sheet.cell(2, 5), &Cell::text("keep me"));
    }

    #[test]
    fn test_absent_dates_leave_cells_and_zero_total_is_written() {
        let mut sheet = existing_row();
        let aggregate = Aggregate {
            site_id: 12,
            period: PeriodLabel::new("MARÇO/24"),
            total_value: BigDecimal::zero(),
            latest_invoice_date: None,
            latest_receipt_date: None,
        };

        write_aggregate(&mut sheet, 2, &header(), &aggregate);

        assert_eq!(sheet.cell(2, 2), &Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        assert_eq!(sheet.cell(2, 3), &Cell::Number(BigDecimal::zero()));
        assert_eq!(sheet.cell(2, 4), &Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()));
    }
}
