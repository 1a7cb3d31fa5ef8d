//! In-memory model of the tracking workbook.
//!
//! Row and column indices in this module are 1-based, the way spreadsheet users
//! count them.

use crate::layout::SheetLayout;
use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(BigDecimal),
    Date(NaiveDate),
    /// Date with a time of day, as read from the workbook.
    DateTime(NaiveDateTime),
    /// Time of day without a date (serial values below 1).
    Time(NaiveTime),
    /// Elapsed time, e.g. a `[h]:mm` cell.
    Duration(Duration),
    Bool(bool),
    /// Error value such as `#N/A`, kept verbatim.
    Error(String),
    /// Formula source (without the leading `=`) and the value last computed for it.
    Formula { formula: String, cached: Box<Cell> },
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Text content, looking through formulas to their cached result.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            Cell::Formula { cached, .. } => cached.as_text(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.is_empty(),
            _ => false,
        }
    }
}

/// Converts a spreadsheet float into an exact decimal via its shortest
/// round-trip representation, so `0.1` stays `0.1`.
pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    pub layout: SheetLayout,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            layout: SheetLayout::default(),
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            layout: SheetLayout::default(),
            rows,
        }
    }

    /// Last row holding a non-empty cell, or 0 for an empty sheet.
    pub fn max_row(&self) -> usize {
        self.rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|idx| idx + 1)
            .unwrap_or(0)
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        row.checked_sub(1)
            .and_then(|idx| self.rows.get(idx))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        col.checked_sub(1)
            .and_then(|idx| self.row(row).get(idx))
            .unwrap_or(EMPTY)
    }

    /// Overwrites one cell, growing the grid when the target lies outside it.
    /// Indices of 0 are ignored.
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        if row == 0 || col == 0 {
            return;
        }
        if self.rows.len() < row {
            self.rows.resize_with(row, Vec::new);
        }
        let cells = &mut self.rows[row - 1];
        if cells.len() < col {
            cells.resize_with(col, Cell::default);
        }
        cells[col - 1] = cell;
    }

    /// Non-empty cells with their 1-based coordinates, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, c)| !c.is_empty())
                .map(move |(c, cell)| (r + 1, c + 1, cell))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackingWorkbook {
    pub sheets: Vec<Sheet>,
}

impl TrackingWorkbook {
    pub fn new(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.name.as_str())
    }

    pub fn sheet(&self, idx: usize) -> Option<&Sheet> {
        self.sheets.get(idx)
    }

    pub fn sheet_mut(&mut self, idx: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(idx)
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }
}
