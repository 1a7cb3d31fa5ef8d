use crate::period::PeriodLabel;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the pipeline ended for one aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Updated {
        site_id: i64,
        period: PeriodLabel,
        sheet_name: String,
        row: usize,
    },
    SheetNotFound {
        site_id: i64,
    },
    HeaderNotFound {
        site_id: i64,
        sheet_name: String,
    },
    RowNotFound {
        site_id: i64,
        period: PeriodLabel,
        sheet_name: String,
    },
}

impl Outcome {
    pub fn is_update(&self) -> bool {
        matches!(self, Outcome::Updated { .. })
    }

    pub fn site_id(&self) -> i64 {
        match self {
            Outcome::Updated { site_id, .. }
            | Outcome::SheetNotFound { site_id }
            | Outcome::HeaderNotFound { site_id, .. }
            | Outcome::RowNotFound { site_id, .. } => *site_id,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Updated {
                site_id,
                period,
                sheet_name,
                row,
            } => write!(
                f,
                "Updated site {} period {} in sheet '{}' (row {})",
                site_id, period, sheet_name, row
            ),
            Outcome::SheetNotFound { site_id } => {
                write!(f, "Warning: no sheet found for site '{}'", site_id)
            }
            Outcome::HeaderNotFound { sheet_name, .. } => write!(
                f,
                "Warning: header not found in sheet '{}', sheet skipped",
                sheet_name
            ),
            Outcome::RowNotFound {
                site_id,
                period,
                sheet_name,
            } => write!(
                f,
                "Warning: period {} not found in sheet '{}' for site {}",
                period, sheet_name, site_id
            ),
        }
    }
}

/// Per-aggregate outcomes, in the order the aggregates were processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OutcomeReport {
    pub outcomes: Vec<Outcome>,
    /// Billing rows dropped because their period start could not be parsed.
    #[serde(default)]
    pub dropped_line_items: usize,
}

impl OutcomeReport {
    pub fn push(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn updated_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_update()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &Outcome> {
        self.outcomes.iter().filter(|o| !o.is_update())
    }

    /// True when every aggregate was written and no billing row was dropped.
    pub fn is_clean(&self) -> bool {
        self.dropped_line_items == 0 && self.failures().next().is_none()
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(OutcomeReport);
        serde_json::to_string_pretty(&schema)
    }
}

impl fmt::Display for OutcomeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{}", outcome)?;
        }
        if self.dropped_line_items > 0 {
            writeln!(
                f,
                "Warning: {} billing row(s) dropped for an unreadable period date",
                self.dropped_line_items
            )?;
        }
        write!(
            f,
            "{} of {} aggregate(s) written",
            self.updated_count(),
            self.outcomes.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> OutcomeReport {
        OutcomeReport {
            outcomes: vec![
                Outcome::Updated {
                    site_id: 12,
                    period: PeriodLabel::new("MARÇO/24"),
                    sheet_name: "12 - Site Alpha".to_string(),
                    row: 5,
                },
                Outcome::SheetNotFound { site_id: 99 },
            ],
            dropped_line_items: 0,
        }
    }

    #[test]
    fn test_counts_and_failures() {
        let report = sample_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report.updated_count(), 1);
        assert_eq!(report.failures().count(), 1);
        assert!(!report.is_clean());
        assert_eq!(report.failures().next().unwrap().site_id(), 99);
    }

    #[test]
    fn test_display_lists_every_outcome() {
        let text = sample_report().to_string();
        assert!(text.contains("Updated site 12 period MARÇO/24 in sheet '12 - Site Alpha'"));
        assert!(text.contains("no sheet found for site '99'"));
        assert!(text.ends_with("1 of 2 aggregate(s) written"));
    }

    #[test]
    fn test_serialization_is_tagged() {
        let json = serde_json::to_string(&sample_report()).unwrap();
        assert!(json.contains(r#""outcome":"sheet_not_found""#));
        assert!(json.contains(r#""period":"MARÇO/24""#));

        let back: OutcomeReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_report());
    }

    #[test]
    fn test_schema_generation() {
        let schema = OutcomeReport::schema_as_json().unwrap();
        assert!(schema.contains("outcomes"));
        assert!(schema.contains("dropped_line_items"));
    }
}
