use crate::config::{ExtractColumns, ReconcileConfig};
use crate::error::{ReconcileError, Result};
use crate::schema::LineItem;
use crate::workbook::Cell;
use crate::xlsx::cell_from_data;
use bigdecimal::{BigDecimal, ToPrimitive, Zero};
use calamine::{open_workbook_auto, Reader};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, info, warn};
use std::path::Path;
use std::str::FromStr;

/// One billing row as read from the extract, before any typing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    /// Spreadsheet row number, header being row 1.
    pub row: usize,
    pub site_id: Cell,
    pub period_start: Cell,
    pub invoice_date: Cell,
    pub invoice_value: Cell,
    pub receipt_date: Cell,
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub line_items: Vec<LineItem>,
    pub dropped: usize,
}

/// Reads the billing extract. `.csv` files go through the csv reader, anything
/// else is opened as a spreadsheet and its first sheet is used.
pub fn read_billing_extract(
    path: impl AsRef<Path>,
    config: &ReconcileConfig,
) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    let records = if is_csv {
        read_csv_extract(path, &config.columns)?
    } else {
        read_sheet_extract(path, &config.columns)?
    };

    info!(
        "Read {} billing row(s) from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

fn read_csv_extract(path: &Path, columns: &ExtractColumns) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| ReconcileError::Open {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();
    let layout = ColumnLayout::locate(&headers, columns)?;

    let mut records = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let cell_at = |col: usize| match record.get(col) {
            Some(v) if !v.trim().is_empty() => Cell::text(v.trim()),
            _ => Cell::Empty,
        };
        records.push(layout.build(idx + 2, cell_at));
    }
    Ok(records)
}

fn read_sheet_extract(path: &Path, columns: &ExtractColumns) -> Result<Vec<RawRecord>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| ReconcileError::Open {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ReconcileError::Read {
            what: path.display().to_string(),
            details: "billing extract contains no sheets".to_string(),
        })?;

    let range = workbook.worksheet_range(&sheet_name)?;
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);
    let mut rows = range.rows();

    let headers: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .map(|d| cell_from_data(d).as_text().unwrap_or_default().trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    let layout = ColumnLayout::locate(&headers, columns)?;

    let records = rows
        .enumerate()
        .map(|(idx, row)| {
            let cell_at = |col: usize| row.get(col).map(cell_from_data).unwrap_or_default();
            layout.build(first_row + idx + 2, cell_at)
        })
        .collect();
    Ok(records)
}

/// 0-based positions of the five billing columns in the header.
struct ColumnLayout {
    site_id: usize,
    period_start: usize,
    invoice_date: usize,
    invoice_value: usize,
    receipt_date: usize,
}

impl ColumnLayout {
    fn locate(headers: &[String], columns: &ExtractColumns) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| ReconcileError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            site_id: find(&columns.site_id)?,
            period_start: find(&columns.period_start)?,
            invoice_date: find(&columns.invoice_date)?,
            invoice_value: find(&columns.invoice_value)?,
            receipt_date: find(&columns.receipt_date)?,
        })
    }

    fn build(&self, row: usize, cell_at: impl Fn(usize) -> Cell) -> RawRecord {
        RawRecord {
            row,
            site_id: cell_at(self.site_id),
            period_start: cell_at(self.period_start),
            invoice_date: cell_at(self.invoice_date),
            invoice_value: cell_at(self.invoice_value),
            receipt_date: cell_at(self.receipt_date),
        }
    }
}

/// Types raw billing rows. Rows whose period start cannot be read as a date
/// are dropped and counted; an unusable site id or value aborts.
pub fn normalize(records: &[RawRecord], config: &ReconcileConfig) -> Result<Normalized> {
    let mut normalized = Normalized::default();

    for record in records {
        let Some(period_start) = parse_date(&record.period_start, &config.text_date_formats)
        else {
            warn!(
                "Dropping billing row {}: unreadable period start {:?}",
                record.row, record.period_start
            );
            normalized.dropped += 1;
            continue;
        };

        let site_id = parse_site_id(&record.site_id).ok_or_else(|| {
            ReconcileError::InvalidRecord {
                row: record.row,
                column: config.columns.site_id.clone(),
                details: format!("expected an integer site id, found {:?}", record.site_id),
            }
        })?;

        let invoice_value = parse_value(&record.invoice_value).ok_or_else(|| {
            ReconcileError::InvalidRecord {
                row: record.row,
                column: config.columns.invoice_value.clone(),
                details: format!("expected a number, found {:?}", record.invoice_value),
            }
        })?;

        normalized.line_items.push(LineItem {
            site_id,
            period_start,
            invoice_emission_date: parse_date(&record.invoice_date, &config.text_date_formats),
            invoice_value,
            receipt_date: parse_date(&record.receipt_date, &config.text_date_formats),
        });
    }

    debug!(
        "Normalized {} line item(s), dropped {}",
        normalized.line_items.len(),
        normalized.dropped
    );
    Ok(normalized)
}

pub fn parse_date(cell: &Cell, formats: &[String]) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date_text(s, formats),
        Cell::Formula { cached, .. } => parse_date(cached, formats),
        Cell::Empty
        | Cell::Number(_)
        | Cell::Time(_)
        | Cell::Duration(_)
        | Cell::Bool(_)
        | Cell::Error(_) => None,
    }
}

fn parse_date_text(text: &str, formats: &[String]) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
        if let Ok(d) = NaiveDate::parse_from_str(text, format) {
            return Some(d);
        }
    }

    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive())
}

fn parse_site_id(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) if n.is_integer() => n.to_i64(),
        Cell::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                BigDecimal::from_str(s)
                    .ok()
                    .filter(|d| d.is_integer())
                    .and_then(|d| d.to_i64())
            })
        }
        Cell::Formula { cached, .. } => parse_site_id(cached),
        _ => None,
    }
}

/// Missing values count as zero, the way a column sum skips blanks.
fn parse_value(cell: &Cell) -> Option<BigDecimal> {
    match cell {
        Cell::Empty => Some(BigDecimal::zero()),
        Cell::Number(n) => Some(n.clone()),
        Cell::Text(s) if s.trim().is_empty() => Some(BigDecimal::zero()),
        Cell::Text(s) => BigDecimal::from_str(s.trim()).ok(),
        Cell::Formula { cached, .. } => parse_value(cached),
        _ => None,
    }
}
