//! Spreadsheet adapters: calamine for reading, rust_xlsxwriter for writing.
//!
//! Cell values, formulas, sheet order and the layout captured by
//! [`crate::layout`] survive a round trip. Fonts, fills and borders do not,
//! since the writer always produces a fresh file.

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, Result};
use crate::layout::{read_xlsx_layouts, NumberFormat, SheetLayout};
use crate::workbook::{decimal_from_f64, Cell, Sheet, TrackingWorkbook};
use bigdecimal::{BigDecimal, ToPrimitive};
use calamine::{
    open_workbook_auto, open_workbook_auto_from_rs, Data, DataType, ExcelDateTime, Reader, Sheets,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

const DURATION_FORMAT: &str = "[h]:mm:ss";
const MS_PER_DAY: f64 = 86_400_000.0;

pub(crate) fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => number(*f),
        Data::Int(i) => Cell::Number(BigDecimal::from(*i)),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => cell_from_excel_datetime(dt),
        Data::DateTimeIso(s) => {
            if let Ok(value) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                date_or_datetime(value)
            } else if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                Cell::Date(date)
            } else if let Ok(time) = NaiveTime::parse_from_str(s, "%H:%M:%S%.f") {
                Cell::Time(time)
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::DurationIso(s) => data
            .as_duration()
            .map(Cell::Duration)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::Error(e) => Cell::Error(e.to_string()),
    }
}

fn number(value: f64) -> Cell {
    decimal_from_f64(value).map(Cell::Number).unwrap_or_default()
}

// Serials below 1 carry no date part: Excel shows them as bare times.
fn cell_from_excel_datetime(dt: &ExcelDateTime) -> Cell {
    if dt.is_duration() {
        return dt
            .as_duration()
            .map(Cell::Duration)
            .unwrap_or_else(|| number(dt.as_f64()));
    }
    match dt.as_datetime() {
        Some(value) if (0.0..1.0).contains(&dt.as_f64()) => Cell::Time(value.time()),
        Some(value) => date_or_datetime(value),
        None => number(dt.as_f64()),
    }
}

fn date_or_datetime(value: NaiveDateTime) -> Cell {
    if value.time() == NaiveTime::MIN {
        Cell::Date(value.date())
    } else {
        Cell::DateTime(value)
    }
}

pub fn read_tracking_workbook(path: impl AsRef<Path>) -> Result<TrackingWorkbook> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path).map_err(|e| ReconcileError::Open {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;
    let mut tracking = load_sheets(&mut workbook, &path.display().to_string())?;

    match File::open(path) {
        Ok(file) => attach_layouts(&mut tracking, BufReader::new(file)),
        Err(e) => debug!("Layout of {} not read: {}", path.display(), e),
    }

    info!(
        "Loaded tracking workbook {} with {} sheet(s)",
        path.display(),
        tracking.sheets.len()
    );
    Ok(tracking)
}

pub fn read_tracking_workbook_from_bytes(bytes: Vec<u8>) -> Result<TrackingWorkbook> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.as_slice())).map_err(|e| {
            ReconcileError::Open {
                path: "<in-memory workbook>".to_string(),
                details: e.to_string(),
            }
        })?;
    let mut tracking = load_sheets(&mut workbook, "<in-memory workbook>")?;
    attach_layouts(&mut tracking, Cursor::new(bytes.as_slice()));
    Ok(tracking)
}

fn attach_layouts<R: Read + Seek>(workbook: &mut TrackingWorkbook, reader: R) {
    let names: Vec<String> = workbook.sheet_names().map(str::to_string).collect();
    for (sheet, layout) in workbook.sheets.iter_mut().zip(read_xlsx_layouts(reader, &names)) {
        sheet.layout = layout;
    }
}

fn load_sheets<RS: Read + Seek>(workbook: &mut Sheets<RS>, what: &str) -> Result<TrackingWorkbook> {
    let names = workbook.sheet_names();
    if names.is_empty() {
        return Err(ReconcileError::Read {
            what: what.to_string(),
            details: "workbook contains no sheets".to_string(),
        });
    }

    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ReconcileError::Read {
                what: format!("sheet '{}'", name),
                details: e.to_string(),
            })?;

        let mut sheet = Sheet::new(name.clone());
        if let Some((row0, col0)) = range.start() {
            for (r, row) in range.rows().enumerate() {
                for (c, data) in row.iter().enumerate() {
                    let cell = cell_from_data(data);
                    if !cell.is_empty() {
                        sheet.set_cell(row0 as usize + r + 1, col0 as usize + c + 1, cell);
                    }
                }
            }
        }

        // Not every format exposes formulas; their cached values are enough then.
        match workbook.worksheet_formula(&name) {
            Ok(formulas) => {
                if let Some((row0, col0)) = formulas.start() {
                    for (r, row) in formulas.rows().enumerate() {
                        for (c, formula) in row.iter().enumerate() {
                            if formula.is_empty() {
                                continue;
                            }
                            let (row, col) = (row0 as usize + r + 1, col0 as usize + c + 1);
                            let cached = sheet.cell(row, col).clone();
                            sheet.set_cell(
                                row,
                                col,
                                Cell::Formula {
                                    formula: formula.clone(),
                                    cached: Box::new(cached),
                                },
                            );
                        }
                    }
                }
            }
            Err(e) => debug!("No formulas read for sheet '{}': {}", name, e),
        }

        sheets.push(sheet);
    }

    Ok(TrackingWorkbook::new(sheets))
}

pub fn write_tracking_workbook(
    workbook: &TrackingWorkbook,
    path: impl AsRef<Path>,
    config: &ReconcileConfig,
) -> Result<()> {
    let path = path.as_ref();
    let mut xlsx = build_xlsx(workbook, config)?;
    xlsx.save(path)
        .map_err(|e| ReconcileError::Write(format!("{}: {}", path.display(), e)))?;
    info!("Saved tracking workbook to {}", path.display());
    Ok(())
}

pub fn tracking_workbook_to_bytes(
    workbook: &TrackingWorkbook,
    config: &ReconcileConfig,
) -> Result<Vec<u8>> {
    let mut xlsx = build_xlsx(workbook, config)?;
    Ok(xlsx.save_to_buffer()?)
}

/// Formats shared by every sheet of one write, created once per distinct
/// number format.
struct FormatCache {
    date: NumberFormat,
    datetime: NumberFormat,
    time: NumberFormat,
    duration: NumberFormat,
    formats: HashMap<NumberFormat, Format>,
    general: Format,
}

impl FormatCache {
    fn new(config: &ReconcileConfig) -> Self {
        Self {
            date: NumberFormat::Custom(config.output_date_format.clone()),
            datetime: NumberFormat::Custom(config.output_datetime_format.clone()),
            time: NumberFormat::Custom(config.output_time_format.clone()),
            duration: NumberFormat::Custom(DURATION_FORMAT.to_string()),
            formats: HashMap::new(),
            general: Format::new(),
        }
    }

    /// Format for `cell`: the one it was read with, else the default for its type.
    fn for_cell(&mut self, cell: &Cell, own: Option<&NumberFormat>) -> &Format {
        let fallback = match cell {
            Cell::Date(_) => Some(&self.date),
            Cell::DateTime(_) => Some(&self.datetime),
            Cell::Time(_) => Some(&self.time),
            Cell::Duration(_) => Some(&self.duration),
            _ => None,
        };
        match own.or(fallback) {
            Some(number_format) => self
                .formats
                .entry(number_format.clone())
                .or_insert_with(|| match number_format {
                    NumberFormat::Builtin(id) => Format::new().set_num_format_index(*id),
                    NumberFormat::Custom(code) => Format::new().set_num_format(code),
                }),
            None => &self.general,
        }
    }
}

fn build_xlsx(workbook: &TrackingWorkbook, config: &ReconcileConfig) -> Result<Workbook> {
    if workbook.sheets.is_empty() {
        return Err(ReconcileError::Write(
            "tracking workbook has no sheets".to_string(),
        ));
    }

    let mut xlsx = Workbook::new();
    let mut formats = FormatCache::new(config);

    for sheet in &workbook.sheets {
        let worksheet = xlsx.add_worksheet();
        let sheet_error =
            |e: rust_xlsxwriter::XlsxError| ReconcileError::Write(format!("sheet '{}': {}", sheet.name, e));
        worksheet.set_name(&sheet.name).map_err(sheet_error)?;
        apply_layout(worksheet, &sheet.layout).map_err(sheet_error)?;

        for (row, col, cell) in sheet.cells() {
            if sheet.layout.is_merge_hidden(row, col) {
                continue;
            }
            let format = formats.for_cell(cell, sheet.layout.number_format(row, col));
            write_cell(worksheet, (row - 1) as u32, (col - 1) as u16, cell, format).map_err(|e| {
                ReconcileError::Write(format!(
                    "sheet '{}' cell ({}, {}): {}",
                    sheet.name, row, col, e
                ))
            })?;
        }
    }

    Ok(xlsx)
}

// Merges go first: merge_range blanks its area and cells written afterwards
// replace the blank at the origin.
fn apply_layout(
    ws: &mut Worksheet,
    layout: &SheetLayout,
) -> std::result::Result<(), rust_xlsxwriter::XlsxError> {
    for (&col, &width) in &layout.column_widths {
        ws.set_column_width((col - 1) as u16, width)?;
    }
    let blank = Format::new();
    for merge in &layout.merged_ranges {
        if merge.first_row == merge.last_row && merge.first_col == merge.last_col {
            continue;
        }
        ws.merge_range(
            (merge.first_row - 1) as u32,
            (merge.first_col - 1) as u16,
            (merge.last_row - 1) as u32,
            (merge.last_col - 1) as u16,
            "",
            &blank,
        )?;
    }
    Ok(())
}

fn write_cell(ws: &mut Worksheet, row: u32, col: u16, cell: &Cell, format: &Format) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) => {
            ws.write_string_with_format(row, col, s, format)?;
        }
        Cell::Number(n) => {
            ws.write_number_with_format(row, col, decimal_to_f64(n)?, format)?;
        }
        Cell::Date(d) => {
            if is_excel_year(d.year()) {
                ws.write_datetime_with_format(row, col, d, format)?;
            } else {
                ws.write_string(row, col, d.format("%d/%m/%Y").to_string())?;
            }
        }
        Cell::DateTime(dt) => {
            if is_excel_year(dt.year()) {
                ws.write_datetime_with_format(row, col, dt, format)?;
            } else {
                ws.write_string(row, col, dt.format("%d/%m/%Y %H:%M:%S").to_string())?;
            }
        }
        Cell::Time(t) => {
            ws.write_datetime_with_format(row, col, t, format)?;
        }
        Cell::Duration(d) => {
            ws.write_number_with_format(row, col, d.num_milliseconds() as f64 / MS_PER_DAY, format)?;
        }
        Cell::Bool(b) => {
            ws.write_boolean_with_format(row, col, *b, format)?;
        }
        Cell::Error(e) => {
            let formula = Formula::new(format!("={}", e)).set_result(e);
            ws.write_formula_with_format(row, col, formula, format)?;
        }
        Cell::Formula { formula, cached } => {
            let mut formula = Formula::new(formula);
            if let Some(result) = cached_result(cached) {
                formula = formula.set_result(result);
            }
            ws.write_formula_with_format(row, col, formula, format)?;
        }
    }
    Ok(())
}

// Excel serials start at 1900 and end with 9999.
fn is_excel_year(year: i32) -> bool {
    (1900..=9999).contains(&year)
}

fn decimal_to_f64(value: &BigDecimal) -> Result<f64> {
    value
        .to_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| ReconcileError::Write(format!("number {} does not fit a spreadsheet cell", value)))
}

fn cached_result(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Text(s) | Cell::Error(s) => Some(s.clone()),
        Cell::Number(n) => Some(n.to_string()),
        Cell::Bool(true) => Some("TRUE".to_string()),
        Cell::Bool(false) => Some("FALSE".to_string()),
        Cell::Formula { cached, .. } => cached_result(cached),
        Cell::Empty | Cell::Date(_) | Cell::DateTime(_) | Cell::Time(_) | Cell::Duration(_) => None,
    }
}
