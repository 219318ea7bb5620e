use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;
use medstock_core::filter::filter;
use medstock_core::models::{Dataset, InventoryItem};

use crate::config::Config;
use crate::format::{format_count, render_card, ItemView};
use crate::load;

/// One page of filtered results.
#[derive(Debug)]
pub struct SearchPage<'a> {
    /// Rows in the dataset.
    pub total: usize,
    /// Rows matching the query, before truncation.
    pub matched: usize,
    /// The first `limit` matches, in dataset order.
    pub items: Vec<&'a InventoryItem>,
}

impl SearchPage<'_> {
    pub fn truncated(&self) -> bool {
        self.items.len() < self.matched
    }
}

pub fn search_page<'a>(dataset: &'a Dataset, query: &str, limit: usize) -> SearchPage<'a> {
    let mut items = filter(&dataset.items, query);
    let matched = items.len();
    items.truncate(limit);
    SearchPage {
        total: dataset.len(),
        matched,
        items,
    }
}

pub fn item_views<'a>(items: &[&'a InventoryItem], config: &Config, today: NaiveDate) -> Vec<ItemView<'a>> {
    items
        .iter()
        .map(|&item| {
            ItemView::new(
                item,
                today,
                &config.display.date_format,
                config.display.expiring_days,
            )
        })
        .collect()
}

pub fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    json: bool,
    file: Option<&Path>,
) -> Result<()> {
    let path = file.unwrap_or(&config.dataset.path);
    let loaded = match load::load_file(path, config)? {
        Some(loaded) => loaded,
        None => {
            println!("No data available: {} not found.", path.display());
            return Ok(());
        }
    };

    let limit = limit.unwrap_or(config.display.limit).max(1);
    let page = search_page(&loaded.dataset, query, limit);
    let today = chrono::Local::now().date_naive();
    let views = item_views(&page.items, config, today);

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if page.matched == 0 {
        println!("No results.");
        return Ok(());
    }

    println!("Results: {} items", format_count(page.matched));
    if page.truncated() {
        println!("showing first {}", format_count(page.items.len()));
    }
    println!();
    for view in &views {
        println!("{}", render_card(view));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medstock_core::models::{CellValue, RawTable};
    use medstock_core::normalize::normalize;

    fn dataset(n: usize) -> Dataset {
        let rows = (0..n)
            .map(|i| {
                vec![
                    CellValue::Number(i as f64),
                    CellValue::Text(if i % 2 == 0 { "Zinc" } else { "Iron" }.into()),
                    CellValue::Number(1.0),
                    CellValue::Number(1.0),
                ]
            })
            .collect();
        normalize(&RawTable::with_rows(["CODE1", "NAME1", "Amount1", "minofLotPack"], rows)).unwrap()
    }

    #[test]
    fn page_counts_before_truncation() {
        let ds = dataset(10);
        let page = search_page(&ds, "zinc", 3);
        assert_eq!(page.total, 10);
        assert_eq!(page.matched, 5);
        assert_eq!(page.items.len(), 3);
        assert!(page.truncated());
        let codes: Vec<&str> = page.items.iter().map(|i| i.code()).collect();
        assert_eq!(codes, vec!["0", "2", "4"]);
    }

    #[test]
    fn empty_query_pages_everything() {
        let ds = dataset(4);
        let page = search_page(&ds, "  ", 100);
        assert_eq!(page.matched, 4);
        assert!(!page.truncated());
    }
}
