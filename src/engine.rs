use crate::config::ReconcileConfig;
use crate::header::{resolve_header, HeaderResolution};
use crate::index::find_site_sheet;
use crate::matcher::find_period_row;
use crate::report::{Outcome, OutcomeReport};
use crate::schema::Aggregate;
use crate::workbook::TrackingWorkbook;
use crate::writer::write_aggregate;
use log::{debug, info, warn};

/// Result of one run: the updated workbook handed back to the caller together
/// with what happened to each aggregate.
#[derive(Debug, Clone)]
pub struct SyncOutput {
    pub workbook: TrackingWorkbook,
    pub report: OutcomeReport,
}

/// Drives each aggregate through sheet lookup, header resolution, row matching
/// and the final write. Lookup failures are recorded, never raised.
pub struct SyncEngine<'a> {
    config: &'a ReconcileConfig,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, mut workbook: TrackingWorkbook, aggregates: &[Aggregate]) -> SyncOutput {
        let mut report = OutcomeReport::default();

        for aggregate in aggregates {
            let outcome = self.apply(&mut workbook, aggregate);
            match &outcome {
                Outcome::Updated { .. } => info!("{}", outcome),
                _ => warn!("{}", outcome),
            }
            report.push(outcome);
        }

        info!(
            "Processed {} aggregate(s), {} written",
            report.len(),
            report.updated_count()
        );
        SyncOutput { workbook, report }
    }

    fn apply(&self, workbook: &mut TrackingWorkbook, aggregate: &Aggregate) -> Outcome {
        let Some(sheet_idx) = find_site_sheet(workbook, aggregate.site_id) else {
            return Outcome::SheetNotFound {
                site_id: aggregate.site_id,
            };
        };
        let Some(sheet) = workbook.sheet_mut(sheet_idx) else {
            return Outcome::SheetNotFound {
                site_id: aggregate.site_id,
            };
        };
        debug!(
            "Site {} resolved to sheet '{}'",
            aggregate.site_id, sheet.name
        );

        let (header, header_row) = match resolve_header(sheet, self.config) {
            HeaderResolution::Resolved { map, row } => (map, row),
            HeaderResolution::NotFound { .. } => {
                return Outcome::HeaderNotFound {
                    site_id: aggregate.site_id,
                    sheet_name: sheet.name.clone(),
                }
            }
        };

        let Some(row) = find_period_row(sheet, &header, header_row, &aggregate.period) else {
            return Outcome::RowNotFound {
                site_id: aggregate.site_id,
                period: aggregate.period.clone(),
                sheet_name: sheet.name.clone(),
            };
        };

        write_aggregate(sheet, row, &header, aggregate);

        Outcome::Updated {
            site_id: aggregate.site_id,
            period: aggregate.period.clone(),
            sheet_name: sheet.name.clone(),
            row,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::PeriodLabel;
    use crate::workbook::{Cell, Sheet};
    use bigdecimal::BigDecimal;

    fn tracking_sheet(name: &str, periods: &[&str]) -> Sheet {
        let mut sheet = Sheet::new(name);
        for (col, label) in ["MÊS", "DATA NF", "VALOR NF", "DATA DO RECEBIMENTO"]
            .iter()
            .enumerate()
        {
            sheet.set_cell(1, col + 1, Cell::text(*label));
        }
        for (i, period) in periods.iter().enumerate() {
            sheet.set_cell(i + 2, 1, Cell::text(*period));
        }
        sheet
    }

    fn aggregate(site_id: i64, period: &str, total: i64) -> Aggregate {
        Aggregate {
            site_id,
            period: PeriodLabel::new(period),
            total_value: BigDecimal::from(total),
            latest_invoice_date: None,
            latest_receipt_date: None,
        }
    }

    #[test]
    fn test_each_failure_is_recorded_and_processing_continues() {
        let workbook = TrackingWorkbook::new(vec![
            tracking_sheet("12 - Alpha", &["MARÇO/24"]),
            Sheet::from_rows("13 - Broken", vec![vec![Cell::text("nothing here")]]),
        ]);
        let aggregates = vec![
            aggregate(99, "MARÇO/24", 1),
            aggregate(13, "MARÇO/24", 2),
            aggregate(12, "ABRIL/24", 3),
            aggregate(12, "MARÇO/24", 4),
        ];

        let config = ReconcileConfig::default();
        let output = SyncEngine::new(&config).run(workbook, &aggregates);

        assert_eq!(
            output.report.outcomes,
            vec![
                Outcome::SheetNotFound { site_id: 99 },
                Outcome::HeaderNotFound {
                    site_id: 13,
                    sheet_name: "13 - Broken".to_string(),
                },
                Outcome::RowNotFound {
                    site_id: 12,
                    period: PeriodLabel::new("ABRIL/24"),
                    sheet_name: "12 - Alpha".to_string(),
                },
                Outcome::Updated {
                    site_id: 12,
                    period: PeriodLabel::new("MARÇO/24"),
                    sheet_name: "12 - Alpha".to_string(),
                    row: 2,
                },
            ]
        );

        let sheet = output.workbook.sheet(0).unwrap();
        assert_eq!(sheet.cell(2, 3), &Cell::Number(BigDecimal::from(4)));
    }

    #[test]
    fn test_unmatched_aggregates_leave_workbook_untouched() {
        let workbook = TrackingWorkbook::new(vec![tracking_sheet("12 - Alpha", &["MARÇO/24"])]);
        let before = workbook.clone();

        let config = ReconcileConfig::default();
        let output = SyncEngine::new(&config).run(
            workbook,
            &[aggregate(99, "MARÇO/24", 1), aggregate(12, "MAIO/24", 1)],
        );

        assert_eq!(output.workbook, before);
        assert_eq!(output.report.updated_count(), 0);
    }
}
