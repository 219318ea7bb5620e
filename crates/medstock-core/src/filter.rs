//! Query filter over normalized items.
//!
//! A query matches an item when the trimmed, lowercased query is a plain
//! substring of the item's precomputed search key. There is no tokenizing,
//! no regex, and no result limit; truncation is the caller's business.

use crate::models::InventoryItem;

/// Return the items matching `query`, in dataset order.
///
/// An empty or whitespace-only query matches everything.
pub fn filter<'a>(items: &'a [InventoryItem], query: &str) -> Vec<&'a InventoryItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return items.iter().collect();
    }
    items
        .iter()
        .filter(|item| item.search_key().contains(needle.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, RawTable};
    use crate::normalize::normalize;

    fn t(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn items() -> Vec<InventoryItem> {
        let table = RawTable::with_rows(
            ["NAME1", "CONTENT", "TYPE", "CODE1", "Amount1", "minofLotPack", "TradeName", "LotNo"],
            vec![
                vec![t("Amoxycillin"), t("500 mg"), t("cap"), t("1000317"), t("33"), t("500"), t("Amoxil"), t("A1")],
                vec![t("Paracetamol"), t("500 mg"), t("tab"), t("1000412"), t("10"), t("1000"), t("Tylenol"), t("P7")],
                vec![t("Metformin"), t("850 mg"), t("tab"), t("2000001"), t("4"), t("100"), CellValue::Blank, t("M3")],
            ],
        );
        normalize(&table).unwrap().items
    }

    fn names(found: &[&InventoryItem]) -> Vec<String> {
        found.iter().map(|i| i.display_name().to_string()).collect()
    }

    #[test]
    fn empty_query_is_identity() {
        let all = items();
        for q in ["", "   ", "\t\n"] {
            let found = filter(&all, q);
            assert_eq!(found.len(), all.len());
            for (a, b) in found.iter().zip(all.iter()) {
                assert!(std::ptr::eq(*a, b));
            }
        }
    }

    #[test]
    fn substring_match_preserves_order() {
        let all = items();
        assert_eq!(
            names(&filter(&all, "500 mg")),
            vec!["Amoxycillin 500 mg cap", "Paracetamol 500 mg tab"]
        );
        assert_eq!(names(&filter(&all, "tab")).len(), 2);
    }

    #[test]
    fn matches_code_trade_name_and_lot() {
        let all = items();
        assert_eq!(names(&filter(&all, "1000412")), vec!["Paracetamol 500 mg tab"]);
        assert_eq!(names(&filter(&all, "amoxil")), vec!["Amoxycillin 500 mg cap"]);
        assert_eq!(names(&filter(&all, "m3")), vec!["Metformin 850 mg tab"]);
    }

    #[test]
    fn case_insensitive_and_trimmed() {
        let all = items();
        assert_eq!(filter(&all, "TYLENOL"), filter(&all, "tylenol"));
        assert_eq!(filter(&all, "  Tylenol  ").len(), 1);
    }

    #[test]
    fn containment_law() {
        let all = items();
        for q in ["a", "mg", "00", "-", "cap 1000", "zzz"] {
            let found = filter(&all, q);
            for item in &all {
                let hit = item.search_key().contains(&q.to_lowercase());
                assert_eq!(found.iter().any(|f| std::ptr::eq(*f, item)), hit, "query {:?}", q);
            }
        }
    }

    #[test]
    fn no_match_and_regex_metacharacters() {
        let all = items();
        assert!(filter(&all, "999").is_empty());
        assert!(filter(&all, ".*").is_empty());
        assert!(filter(&all, "[").is_empty());
    }
}
