use crate::workbook::TrackingWorkbook;
use regex::Regex;
use std::sync::LazyLock;

static SITE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("site prefix pattern is valid"));

/// Leading run of digits in a sheet name, as authored (`"012 - Obra"` gives `"012"`).
pub fn site_prefix(sheet_name: &str) -> Option<&str> {
    SITE_PREFIX
        .captures(sheet_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Index of the first sheet whose numeric prefix is the site id written in
/// decimal. The comparison is textual, so `"012"` never matches site 12.
pub fn find_site_sheet(workbook: &TrackingWorkbook, site_id: i64) -> Option<usize> {
    let wanted = site_id.to_string();
    workbook
        .sheet_names()
        .position(|name| site_prefix(name) == Some(wanted.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Sheet;

    fn workbook(names: &[&str]) -> TrackingWorkbook {
        TrackingWorkbook::new(names.iter().map(|n| Sheet::new(*n)).collect())
    }

    #[test]
    fn test_site_prefix() {
        assert_eq!(site_prefix("12 - Site Alpha"), Some("12"));
        assert_eq!(site_prefix("305Obra"), Some("305"));
        assert_eq!(site_prefix("Resumo"), None);
        assert_eq!(site_prefix(" 12 - leading space"), None);
    }

    #[test]
    fn test_find_site_sheet_compares_whole_prefix() {
        let wb = workbook(&["Resumo", "123 - Beta", "12 - Alpha", "012 - Gamma"]);
        assert_eq!(find_site_sheet(&wb, 12), Some(2));
        assert_eq!(find_site_sheet(&wb, 123), Some(1));
        assert_eq!(find_site_sheet(&wb, 1), None);
        assert_eq!(find_site_sheet(&wb, 99), None);
    }

    #[test]
    fn test_leading_zeros_must_match_as_authored() {
        let wb = workbook(&["007 - Bond"]);
        assert_eq!(find_site_sheet(&wb, 7), None);
    }

    #[test]
    fn test_first_matching_sheet_wins() {
        let wb = workbook(&["12 - Old", "12 - New"]);
        assert_eq!(find_site_sheet(&wb, 12), Some(0));
    }
}
