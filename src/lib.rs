//! # Tracking Reconciler
//!
//! Keeps a manually maintained measurement tracking workbook in step with a
//! periodically exported billing extract.
//!
//! ## Core Concepts
//!
//! - **Billing extract**: raw invoice line-items, one per row, keyed by site (obra) id
//! - **Aggregate**: totals for one (site, month) pair, with the most recent invoice and receipt dates
//! - **Period label**: the join key between both sides, e.g. `MARÇO/24`
//! - **Tracking workbook**: one sheet per site, named after the site id, one row per month
//!
//! Each aggregate is routed to its site's sheet, the sheet's header row is
//! discovered by scanning for known labels, the row for the period is located
//! and the invoice value, invoice date and receipt date cells are overwritten.
//! Lookups that fail are reported, never fatal. Only unreadable inputs abort
//! a run.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tracking_reconciler::*;
//!
//! let config = ReconcileConfig::default();
//! let output = reconcile_files("Pasta1.xlsx", "ACOMPANHAMENTO.xlsx", &config)?;
//! write_tracking_workbook(&output.workbook, "ACOMPANHAMENTO_ATUALIZADO.xlsx", &config)?;
//! println!("{}", output.report);
//! ```

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod error;
pub mod header;
pub mod index;
pub mod ingestion;
pub mod layout;
pub mod matcher;
pub mod period;
pub mod report;
pub mod schema;
pub mod workbook;
pub mod writer;
pub mod xlsx;

pub use aggregator::aggregate;
pub use config::{ExtractColumns, HeaderLabels, ReconcileConfig};
pub use engine::{SyncEngine, SyncOutput};
pub use error::{ReconcileError, Result};
pub use header::{resolve_header, HeaderResolution};
pub use index::{find_site_sheet, site_prefix};
pub use ingestion::{normalize, read_billing_extract, Normalized, RawRecord};
pub use layout::{MergedRange, NumberFormat, SheetLayout};
pub use matcher::find_period_row;
pub use period::{period_label, PeriodLabel};
pub use report::{Outcome, OutcomeReport};
pub use schema::*;
pub use workbook::{Cell, Sheet, TrackingWorkbook};
pub use writer::write_aggregate;
pub use xlsx::{
    read_tracking_workbook, read_tracking_workbook_from_bytes, tracking_workbook_to_bytes,
    write_tracking_workbook,
};

use log::{debug, info};
use std::path::Path;

/// Runs the whole pipeline on in-memory inputs.
pub fn reconcile(
    records: &[RawRecord],
    workbook: TrackingWorkbook,
    config: &ReconcileConfig,
) -> Result<SyncOutput> {
    config.validate()?;

    let normalized = normalize(records, config)?;
    let aggregates = aggregate(&normalized.line_items);

    info!(
        "Reconciling {} aggregate(s) from {} line item(s)",
        aggregates.len(),
        normalized.line_items.len()
    );
    debug!(
        "Tracking workbook sheets: {:?}",
        workbook.sheet_names().collect::<Vec<_>>()
    );

    let mut output = SyncEngine::new(config).run(workbook, &aggregates);
    output.report.dropped_line_items = normalized.dropped;
    Ok(output)
}

/// Reads both inputs from disk and runs the pipeline. Any failure to read
/// either file aborts before a single aggregate is applied.
pub fn reconcile_files(
    billing_extract: impl AsRef<Path>,
    tracking_workbook: impl AsRef<Path>,
    config: &ReconcileConfig,
) -> Result<SyncOutput> {
    config.validate()?;
    let records = read_billing_extract(billing_extract, config)?;
    let workbook = read_tracking_workbook(tracking_workbook)?;
    reconcile(&records, workbook, config)
}
