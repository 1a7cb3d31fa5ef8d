use crate::error::{ReconcileError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Column names of the billing extract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct ExtractColumns {
    #[schemars(description = "Integer site (obra) identifier")]
    pub site_id: String,

    #[schemars(description = "Start date of the billed period; rows where it cannot be parsed are dropped")]
    pub period_start: String,

    #[schemars(description = "Invoice emission date, may be empty")]
    pub invoice_date: String,

    #[schemars(description = "Invoice value, summed per site and period")]
    pub invoice_value: String,

    #[schemars(description = "Payment receipt date, may be empty")]
    pub receipt_date: String,
}

impl Default for ExtractColumns {
    fn default() -> Self {
        Self {
            site_id: "ObraVen_Vnv".to_string(),
            period_start: "DataIni_cvm".to_string(),
            invoice_date: "DataEmis_Nf".to_string(),
            invoice_value: "TotalValorNF".to_string(),
            receipt_date: "DataRec".to_string(),
        }
    }
}

impl ExtractColumns {
    pub fn all(&self) -> [&str; 5] {
        [
            &self.site_id,
            &self.period_start,
            &self.invoice_date,
            &self.invoice_value,
            &self.receipt_date,
        ]
    }
}

/// Substrings identifying the header cells of a tracking sheet.
/// Matching is case-insensitive and a cell only needs to contain the label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct HeaderLabels {
    pub period: String,
    pub invoice_date: String,
    pub invoice_value: String,
    pub receipt_date: String,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        Self {
            period: "MÊS".to_string(),
            invoice_date: "DATA NF".to_string(),
            invoice_value: "VALOR NF".to_string(),
            receipt_date: "DATA DO RECEBIMENTO".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct ReconcileConfig {
    pub columns: ExtractColumns,

    pub labels: HeaderLabels,

    #[schemars(description = "Number of leading rows scanned for the header of each tracking sheet")]
    pub header_scan_rows: usize,

    #[schemars(
        description = "chrono format strings tried in order for date cells stored as text. RFC 3339 timestamps are always accepted."
    )]
    pub text_date_formats: Vec<String>,

    #[schemars(description = "Excel number format applied to dates written into the tracking workbook")]
    pub output_date_format: String,

    #[schemars(description = "Number format for date-time cells that carry no format of their own")]
    pub output_datetime_format: String,

    #[schemars(description = "Number format for time-of-day cells that carry no format of their own")]
    pub output_time_format: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            columns: ExtractColumns::default(),
            labels: HeaderLabels::default(),
            header_scan_rows: 10,
            text_date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%Y-%m-%d %H:%M:%S".to_string(),
                "%d/%m/%Y".to_string(),
                "%d/%m/%Y %H:%M:%S".to_string(),
            ],
            output_date_format: "dd/mm/yyyy".to_string(),
            output_datetime_format: "dd/mm/yyyy hh:mm:ss".to_string(),
            output_time_format: "hh:mm:ss".to_string(),
        }
    }
}

impl ReconcileConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ReconcileError::Open {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.header_scan_rows == 0 {
            return Err(ReconcileError::Config(
                "header_scan_rows must be at least 1".to_string(),
            ));
        }

        let labels = [
            &self.labels.period,
            &self.labels.invoice_date,
            &self.labels.invoice_value,
            &self.labels.receipt_date,
        ];
        if labels.iter().any(|l| l.trim().is_empty()) {
            return Err(ReconcileError::Config(
                "header labels must not be empty".to_string(),
            ));
        }

        if self.columns.all().iter().any(|c| c.trim().is_empty()) {
            return Err(ReconcileError::Config(
                "billing extract column names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(ReconcileConfig);
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: ReconcileConfig =
            serde_json::from_str(r#"{ "header_scan_rows": 4, "labels": { "period": "PERIODO" } }"#)
                .unwrap();

        assert_eq!(config.header_scan_rows, 4);
        assert_eq!(config.labels.period, "PERIODO");
        assert_eq!(config.labels.invoice_value, "VALOR NF");
        assert_eq!(config.columns.site_id, "ObraVen_Vnv");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_window_and_labels() {
        let config = ReconcileConfig {
            header_scan_rows: 0,
            ..ReconcileConfig::default()
        };
        assert!(matches!(config.validate(), Err(ReconcileError::Config(_))));

        let mut config = ReconcileConfig::default();
        config.labels.receipt_date = "  ".to_string();
        assert!(matches!(config.validate(), Err(ReconcileError::Config(_))));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = ReconcileConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("header_scan_rows"));
        assert!(schema_json.contains("text_date_formats"));
    }
}
