//! Core data models: the raw table a provider hands in, and the canonical
//! records the normalizer hands out.
//!
//! [`RawTable`] is deliberately loose (ragged rows, arbitrary headers).
//! [`InventoryItem`] is the opposite: every field is always present, and the
//! composite search key is fixed at construction time.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aliases::{ColumnMap, LogicalField};

/// A single spreadsheet cell as delivered by the input provider.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    Blank,
}

impl CellValue {
    /// True for `Blank` and for text that is empty after trimming.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Blank => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Render the cell as text, or `None` when it is blank.
    ///
    /// Numbers use their natural decimal form (`33.0` -> `"33"`), with no
    /// thousands separators and no exponent notation.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Blank => None,
            CellValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(t.to_string())
                }
            }
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

static BLANK: CellValue = CellValue::Blank;

/// Natural decimal text of a spreadsheet number.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    // f64's Display never uses exponent notation and drops a zero fraction.
    let s = n.to_string();
    if s == "-0" {
        "0".to_string()
    } else {
        s
    }
}

/// As-loaded spreadsheet: one header row plus positional data rows.
///
/// Rows may be shorter or longer than `headers`; a cell past the end of a
/// row reads as [`CellValue::Blank`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from header names and rows of cells.
    pub fn with_rows<H: Into<String>>(
        headers: impl IntoIterator<Item = H>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows,
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (`row`, `col`), `Blank` when the row is ragged.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&BLANK)
    }
}

/// One normalized inventory row.
///
/// Fields are only settable through the normalizer so that `search_key`
/// always agrees with the fields it was derived from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryItem {
    code: String,
    display_name: String,
    trade_name: String,
    lot_no: String,
    price: f64,
    quantity_display: String,
    expiry_date: Option<NaiveDate>,
    #[serde(skip)]
    search_key: String,
}

impl InventoryItem {
    pub(crate) fn new(
        code: String,
        display_name: String,
        trade_name: String,
        lot_no: String,
        price: f64,
        quantity_display: String,
        expiry_date: Option<NaiveDate>,
    ) -> Self {
        let search_key = format!("{} {} {} {}", display_name, code, trade_name, lot_no).to_lowercase();
        Self {
            code,
            display_name,
            trade_name,
            lot_no,
            price,
            quantity_display,
            expiry_date,
            search_key,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn trade_name(&self) -> &str {
        &self.trade_name
    }

    pub fn lot_no(&self) -> &str {
        &self.lot_no
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn quantity_display(&self) -> &str {
        &self.quantity_display
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    /// Lowercase `display_name code trade_name lot_no`.
    pub fn search_key(&self) -> &str {
        &self.search_key
    }
}

/// Which kind of value a cell failed to parse as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    Date,
    Number,
}

/// A non-fatal per-cell parse failure. The affected field fell back to its
/// default and normalization carried on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellParseWarning {
    /// Zero-based index into the item sequence.
    pub row: usize,
    pub field: LogicalField,
    pub value: String,
    pub kind: WarningKind,
}

impl std::fmt::Display for CellParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let expected = match self.kind {
            WarningKind::Date => "a date",
            WarningKind::Number => "a number",
        };
        write!(
            f,
            "row {}: {} value {:?} is not {}",
            self.row + 1,
            self.field,
            self.value,
            expected
        )
    }
}

/// Result of a successful normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub items: Vec<InventoryItem>,
    pub warnings: Vec<CellParseWarning>,
    /// First parsable value of the optional report-date column.
    pub report_date: Option<NaiveDate>,
    /// Column index that satisfied each logical field.
    pub columns: ColumnMap,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
