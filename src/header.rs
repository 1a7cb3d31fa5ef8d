//! Locates the header row of a tracking sheet.
//!
//! Header position differs from sheet to sheet, so the leading rows are scanned
//! for cells containing each required label. The scan is an explicit state
//! machine: a [`HeaderScan`] accumulates label positions row by row until it
//! either becomes [`ScanState::Resolved`] or runs out of rows and ends as
//! [`HeaderResolution::NotFound`].

use crate::config::{HeaderLabels, ReconcileConfig};
use crate::schema::{HeaderLabel, HeaderMap};
use crate::workbook::{Cell, Sheet};
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderResolution {
    Resolved { map: HeaderMap, row: usize },
    NotFound { rows_scanned: usize },
}

#[derive(Debug, Clone)]
pub struct HeaderScan {
    needles: [String; 4],
    found: [Option<usize>; 4],
}

#[derive(Debug, Clone)]
pub enum ScanState {
    Scanning(HeaderScan),
    Resolved { map: HeaderMap, row: usize },
}

impl HeaderScan {
    pub fn new(labels: &HeaderLabels) -> Self {
        let mut needles: [String; 4] = Default::default();
        for label in HeaderLabel::ALL {
            let text = match label {
                HeaderLabel::Period => &labels.period,
                HeaderLabel::InvoiceDate => &labels.invoice_date,
                HeaderLabel::InvoiceValue => &labels.invoice_value,
                HeaderLabel::ReceiptDate => &labels.receipt_date,
            };
            needles[label.index()] = text.to_uppercase();
        }

        Self {
            needles,
            found: [None; 4],
        }
    }

    /// Feeds one row (1-based `row`) into the scan. Columns are visited left to
    /// right and only the first column seen for a label is kept.
    pub fn advance(mut self, row: usize, cells: &[Cell]) -> ScanState {
        for (idx, cell) in cells.iter().enumerate() {
            let Some(text) = cell.as_text() else {
                continue;
            };
            let text = text.to_uppercase();

            for label in HeaderLabel::ALL {
                let slot = &mut self.found[label.index()];
                if slot.is_none() && text.contains(&self.needles[label.index()]) {
                    *slot = Some(idx + 1);
                }
            }
        }

        let found = self.found;
        match found {
            [Some(period), Some(invoice_date), Some(invoice_value), Some(receipt_date)] => {
                ScanState::Resolved {
                    map: HeaderMap {
                        period,
                        invoice_date,
                        invoice_value,
                        receipt_date,
                    },
                    row,
                }
            }
            _ => ScanState::Scanning(self),
        }
    }

    pub fn missing(&self) -> impl Iterator<Item = HeaderLabel> + '_ {
        HeaderLabel::ALL
            .into_iter()
            .filter(|label| self.found[label.index()].is_none())
    }
}

pub fn resolve_header(sheet: &Sheet, config: &ReconcileConfig) -> HeaderResolution {
    let mut scan = HeaderScan::new(&config.labels);

    for row in 1..=config.header_scan_rows {
        scan = match scan.advance(row, sheet.row(row)) {
            ScanState::Scanning(next) => next,
            ScanState::Resolved { map, row } => return HeaderResolution::Resolved { map, row },
        };
    }

    debug!(
        "Sheet '{}': header labels {:?} not found in first {} row(s)",
        sheet.name,
        scan.missing().collect::<Vec<_>>(),
        config.header_scan_rows
    );
    HeaderResolution::NotFound {
        rows_scanned: config.header_scan_rows,
    }
}
