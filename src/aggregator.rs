use crate::period::{period_label, PeriodLabel};
use crate::schema::{Aggregate, LineItem};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use std::collections::BTreeMap;

struct Accumulator {
    total: BigDecimal,
    latest_invoice_date: Option<NaiveDate>,
    latest_receipt_date: Option<NaiveDate>,
}

/// Groups line items by site and period label. Output is ordered by site id,
/// then by label text.
pub fn aggregate(items: &[LineItem]) -> Vec<Aggregate> {
    let mut groups: BTreeMap<(i64, String), Accumulator> = BTreeMap::new();

    for item in items {
        let label = period_label(item.period_start);
        let acc = groups
            .entry((item.site_id, label.as_str().to_string()))
            .or_insert_with(|| Accumulator {
                total: BigDecimal::zero(),
                latest_invoice_date: None,
                latest_receipt_date: None,
            });

        acc.total += &item.invoice_value;
        acc.latest_invoice_date = acc.latest_invoice_date.max(item.invoice_emission_date);
        acc.latest_receipt_date = acc.latest_receipt_date.max(item.receipt_date);
    }

    groups
        .into_iter()
        .map(|((site_id, label), acc)| Aggregate {
            site_id,
            period: PeriodLabel::new(label),
            total_value: acc.total,
            latest_invoice_date: acc.latest_invoice_date,
            latest_receipt_date: acc.latest_receipt_date,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(site_id: i64, period_start: NaiveDate, value: &str) -> LineItem {
        LineItem {
            site_id,
            period_start,
            invoice_emission_date: None,
            invoice_value: BigDecimal::from_str(value).unwrap(),
            receipt_date: None,
        }
    }

    #[test]
    fn test_groups_by_site_and_month() {
        let items = vec![
            item(12, date(2024, 3, 5), "1000"),
            item(12, date(2024, 3, 20), "500"),
            item(12, date(2024, 4, 1), "10"),
            item(7, date(2024, 3, 1), "1"),
        ];

        let aggregates = aggregate(&items);
        assert_eq!(aggregates.len(), 3);

        assert_eq!(aggregates[0].site_id, 7);
        let march = aggregates
            .iter()
            .find(|a| a.site_id == 12 && a.period.as_str() == "MARÇO/24")
            .unwrap();
        assert_eq!(march.total_value, BigDecimal::from(1500));
    }

    #[test]
    fn test_sum_is_exact() {
        let items: Vec<LineItem> = (0..10).map(|_| item(1, date(2024, 1, 1), "0.1")).collect();
        let aggregates = aggregate(&items);
        assert_eq!(aggregates[0].total_value, BigDecimal::from(1));
    }

    #[test]
    fn test_total_is_preserved_across_groups() {
        let items = vec![
            item(1, date(2023, 12, 31), "123.45"),
            item(2, date(2024, 1, 1), "-20.05"),
            item(1, date(2024, 1, 15), "0.60"),
            item(2, date(2024, 1, 30), "1000"),
        ];
        let input_total: BigDecimal = items.iter().map(|i| i.invoice_value.clone()).sum();
        let output_total: BigDecimal = aggregate(&items).into_iter().map(|a| a.total_value).sum();
        assert_eq!(input_total, output_total);
    }

    #[test]
    fn test_latest_dates_ignore_missing_values() {
        let mut first = item(12, date(2024, 3, 5), "1");
        first.receipt_date = Some(date(2024, 4, 2));
        first.invoice_emission_date = Some(date(2024, 3, 10));
        let mut second = item(12, date(2024, 3, 20), "1");
        second.invoice_emission_date = Some(date(2024, 3, 25));

        let aggregates = aggregate(&[first, second]);
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].latest_receipt_date, Some(date(2024, 4, 2)));
        assert_eq!(aggregates[0].latest_invoice_date, Some(date(2024, 3, 25)));
    }

    #[test]
    fn test_group_without_dates_keeps_them_absent() {
        let aggregates = aggregate(&[item(3, date(2024, 5, 1), "0")]);
        assert_eq!(aggregates[0].latest_invoice_date, None);
        assert_eq!(aggregates[0].latest_receipt_date, None);
        assert!(aggregates[0].total_value.is_zero());
    }
}
