//! Presentation helpers shared by the CLI and the HTTP API.
//!
//! Normalized values carry no display formatting; thousands separators,
//! date patterns, and expiry status are applied here, at the edge.

use std::fmt::Write;

use chrono::NaiveDate;
use medstock_core::models::InventoryItem;
use serde::Serialize;

/// Insert `,` every three digits of a non-negative integer string.
fn group_thousands(digits: &str) -> String {
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Two decimals with thousands separators: `1234.5` -> `"1,234.50"`.
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
}

/// Integer with thousands separators: `1234567` -> `"1,234,567"`.
pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// Expiry date in `pattern`, or `"-"` when unknown or when `pattern`
/// needs fields a plain date does not have (`%H`, `%z`, ...).
pub fn format_expiry(date: Option<NaiveDate>, pattern: &str) -> String {
    date.and_then(|d| render_date(d, pattern))
        .unwrap_or_else(|| "-".to_string())
}

/// `date` in `pattern`, or `None` when chrono cannot render it.
pub fn render_date(date: NaiveDate, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).ok()?;
    Some(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    /// Expires within the configured warning window.
    Expiring,
    Valid,
    Unknown,
}

impl ExpiryStatus {
    /// Classify `date` relative to `today`. A date equal to today is not yet expired.
    pub fn of(date: Option<NaiveDate>, today: NaiveDate, expiring_days: i64) -> Self {
        match date {
            None => ExpiryStatus::Unknown,
            Some(d) if d < today => ExpiryStatus::Expired,
            Some(d) if (d - today).num_days() <= expiring_days => ExpiryStatus::Expiring,
            Some(_) => ExpiryStatus::Valid,
        }
    }
}

/// One item rendered for output, as produced by `search --json` and `GET /items`.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView<'a> {
    pub code: &'a str,
    pub display_name: &'a str,
    pub trade_name: &'a str,
    pub lot_no: &'a str,
    pub quantity: &'a str,
    pub price: f64,
    pub price_display: String,
    pub expiry_date: Option<NaiveDate>,
    pub expiry_display: String,
    pub expiry_status: ExpiryStatus,
}

impl<'a> ItemView<'a> {
    pub fn new(item: &'a InventoryItem, today: NaiveDate, date_format: &str, expiring_days: i64) -> Self {
        Self {
            code: item.code(),
            display_name: item.display_name(),
            trade_name: item.trade_name(),
            lot_no: item.lot_no(),
            quantity: item.quantity_display(),
            price: item.price(),
            price_display: format_price(item.price()),
            expiry_date: item.expiry_date(),
            expiry_display: format_expiry(item.expiry_date(), date_format),
            expiry_status: ExpiryStatus::of(item.expiry_date(), today, expiring_days),
        }
    }
}

/// Plain-text card for one item:
///
/// ```text
/// Amoxycillin 500 mg cap                                     EXP 31/12/2026
///   Code: 1000317 | Trade name: -
///   Qty: 33 x 500 | Price: 0.00 | Lot: -
/// ```
pub fn render_card(view: &ItemView<'_>) -> String {
    let tag = match view.expiry_status {
        ExpiryStatus::Expired => " [EXPIRED]",
        ExpiryStatus::Expiring => " [EXPIRING]",
        _ => "",
    };
    let exp = format!("EXP {}{}", view.expiry_display, tag);
    let width = 72usize.saturating_sub(exp.chars().count()).max(1);
    format!(
        "{:<width$} {}\n  Code: {} | Trade name: {}\n  Qty: {} | Price: {} | Lot: {}\n",
        view.display_name,
        exp,
        view.code,
        view.trade_name,
        view.quantity,
        view.price_display,
        view.lot_no,
        width = width
    )
}
