use crate::period::PeriodLabel;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One normalized billing line. `period_start` is always a valid date; rows
/// without one never make it this far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub site_id: i64,
    pub period_start: NaiveDate,
    pub invoice_emission_date: Option<NaiveDate>,
    pub invoice_value: BigDecimal,
    pub receipt_date: Option<NaiveDate>,
}

/// Billing totals for one (site, period) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub site_id: i64,
    pub period: PeriodLabel,
    pub total_value: BigDecimal,
    /// Most recent invoice emission date in the group, if any line had one.
    pub latest_invoice_date: Option<NaiveDate>,
    /// Most recent receipt date in the group, if any line had one.
    pub latest_receipt_date: Option<NaiveDate>,
}

/// The four columns every tracking sheet must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeaderLabel {
    Period,
    InvoiceDate,
    InvoiceValue,
    ReceiptDate,
}

impl HeaderLabel {
    pub const ALL: [HeaderLabel; 4] = [
        HeaderLabel::Period,
        HeaderLabel::InvoiceDate,
        HeaderLabel::InvoiceValue,
        HeaderLabel::ReceiptDate,
    ];

    pub fn index(self) -> usize {
        match self {
            HeaderLabel::Period => 0,
            HeaderLabel::InvoiceDate => 1,
            HeaderLabel::InvoiceValue => 2,
            HeaderLabel::ReceiptDate => 3,
        }
    }
}

/// 1-based column of each required label within one sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMap {
    pub period: usize,
    pub invoice_date: usize,
    pub invoice_value: usize,
    pub receipt_date: usize,
}

impl HeaderMap {
    pub fn column(&self, label: HeaderLabel) -> usize {
        match label {
            HeaderLabel::Period => self.period,
            HeaderLabel::InvoiceDate => self.invoice_date,
            HeaderLabel::InvoiceValue => self.invoice_value,
            HeaderLabel::ReceiptDate => self.receipt_date,
        }
    }
}
