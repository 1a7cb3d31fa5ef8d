use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

const MONTH_NAMES: [&str; 12] = [
    "JANEIRO",
    "FEVEREIRO",
    "MARÇO",
    "ABRIL",
    "MAIO",
    "JUNHO",
    "JULHO",
    "AGOSTO",
    "SETEMBRO",
    "OUTUBRO",
    "NOVEMBRO",
    "DEZEMBRO",
];

/// Join key between billing periods and tracking rows, e.g. `MARÇO/24`.
///
/// Equality ignores case. The year is kept to two digits, so periods a century
/// apart share a label.
#[derive(Debug, Clone, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PeriodLabel(String);

impl PeriodLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against free text read from a sheet.
    pub fn matches(&self, text: &str) -> bool {
        self.0.to_uppercase() == text.to_uppercase()
    }
}

impl PartialEq for PeriodLabel {
    fn eq(&self, other: &Self) -> bool {
        self.matches(&other.0)
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn period_label(date: NaiveDate) -> PeriodLabel {
    PeriodLabel(format!(
        "{}/{:02}",
        MONTH_NAMES[date.month0() as usize],
        date.year().rem_euclid(100)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_period_label_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(period_label(date).as_str(), "MARÇO/24");

        let date = NaiveDate::from_ymd_opt(2005, 1, 31).unwrap();
        assert_eq!(period_label(date).as_str(), "JANEIRO/05");

        let date = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(period_label(date).as_str(), "DEZEMBRO/23");
    }

    #[test]
    fn test_every_month_has_its_own_name() {
        for (month0, name) in MONTH_NAMES.iter().enumerate() {
            let date = NaiveDate::from_ymd_opt(2024, month0 as u32 + 1, 15).unwrap();
            assert_eq!(period_label(date).as_str(), format!("{}/24", name));
        }
    }

    #[test]
    fn test_label_ignores_day_within_month() {
        let first = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(period_label(first), period_label(last));
    }

    #[test]
    fn test_distinct_months_and_years_give_distinct_labels() {
        let mut seen = HashSet::new();
        for year in 2000..2100 {
            for month in 1..=12 {
                let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
                assert!(seen.insert(period_label(date).as_str().to_string()));
            }
        }
        assert_eq!(seen.len(), 1200);
    }

    #[test]
    fn test_century_ambiguity_is_preserved() {
        let old = NaiveDate::from_ymd_opt(1924, 3, 1).unwrap();
        let new = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(period_label(old), period_label(new));
    }

    #[test]
    fn test_case_insensitive_equality() {
        let label = PeriodLabel::new("MARÇO/24");
        assert!(label.matches("março/24"));
        assert!(label.matches("Março/24"));
        assert!(!label.matches("MARÇO/25"));
        assert!(!label.matches(" MARÇO/24"));
        assert_eq!(label, PeriodLabel::new("marÇo/24"));
    }
}
