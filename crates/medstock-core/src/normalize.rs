//! Record normalizer: [`RawTable`] in, [`Dataset`] out.
//!
//! # Pipeline
//!
//! 1. Resolve header aliases once into a [`ColumnMap`].
//! 2. Fail with [`MissingColumnError`] if any required field (`code`,
//!    `name`, `amount`, `pack_size`) has no column. Every gap is reported.
//! 3. For each row, read each field through [`FIELD_DEFAULTS`], so a blank
//!    cell and an absent optional column degrade the same way.
//! 4. Parse price and expiry leniently; failures become
//!    [`CellParseWarning`]s and the field takes its default.
//!
//! The output has exactly one item per input row, in input order.
//!
//! ```rust
//! use medstock_core::models::{CellValue, RawTable};
//! use medstock_core::normalize::normalize;
//!
//! let t = |s: &str| CellValue::Text(s.to_string());
//! let table = RawTable::with_rows(
//!     ["NAME1", "CONTENT", "TYPE", "CODE1", "Amount1", "minofLotPack"],
//!     vec![vec![t("Amoxycillin"), t("500 mg"), t("cap"), t("1000317"), t("33"), t("500")]],
//! );
//! let dataset = normalize(&table).unwrap();
//! assert_eq!(dataset.items[0].display_name(), "Amoxycillin 500 mg cap");
//! assert_eq!(dataset.items[0].quantity_display(), "33 x 500");
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::aliases::{ColumnAliases, ColumnMap, LogicalField};
use crate::models::{CellParseWarning, CellValue, Dataset, InventoryItem, RawTable, WarningKind};
use crate::parse::{parse_date, parse_number};

/// Text used when a text field's cell is blank or its optional column is absent.
pub const FIELD_DEFAULTS: &[(LogicalField, &str)] = &[
    (LogicalField::Code, ""),
    (LogicalField::Name, ""),
    (LogicalField::Content, ""),
    (LogicalField::Type, ""),
    (LogicalField::Amount, "0"),
    (LogicalField::PackSize, "0"),
    (LogicalField::TradeName, "-"),
    (LogicalField::Lot, "-"),
];

/// Price when the cell is blank, unparsable, or the column is absent.
pub const DEFAULT_PRICE: f64 = 0.0;

/// One or more required columns could not be matched to any header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required column(s): {}", join_fields(.columns))]
pub struct MissingColumnError {
    pub columns: Vec<LogicalField>,
}

impl MissingColumnError {
    pub fn names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.as_str()).collect()
    }
}

fn join_fields(fields: &[LogicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Knobs for [`normalize_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub aliases: ColumnAliases,
    /// Read ambiguous `01/02/2026` style dates as day/month.
    pub day_first: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            aliases: ColumnAliases::default(),
            day_first: true,
        }
    }
}

/// Normalize with the built-in aliases and day-first dates.
pub fn normalize(table: &RawTable) -> Result<Dataset, MissingColumnError> {
    normalize_with(table, &NormalizeOptions::default())
}

pub fn normalize_with(
    table: &RawTable,
    options: &NormalizeOptions,
) -> Result<Dataset, MissingColumnError> {
    let columns = options.aliases.resolve(&table.headers);

    let missing = columns.missing_required();
    if !missing.is_empty() {
        return Err(MissingColumnError { columns: missing });
    }

    let mut warnings = Vec::new();
    let items = (0..table.len())
        .map(|row| {
            let reader = RowReader {
                table,
                columns: &columns,
                row,
            };
            build_item(&reader, options.day_first, &mut warnings)
        })
        .collect();

    let report_date = columns.index(LogicalField::ReportDate).and_then(|col| {
        (0..table.len()).find_map(|row| parse_date(table.cell(row, col), options.day_first))
    });

    Ok(Dataset {
        items,
        warnings,
        report_date,
        columns,
    })
}

/// Positional access to one row through the resolved column map.
struct RowReader<'a> {
    table: &'a RawTable,
    columns: &'a ColumnMap,
    row: usize,
}

impl RowReader<'_> {
    /// `None` when the field's column is absent.
    fn cell(&self, field: LogicalField) -> Option<&CellValue> {
        self.columns
            .index(field)
            .map(|col| self.table.cell(self.row, col))
    }

    /// Cell text, or the field's entry in [`FIELD_DEFAULTS`].
    fn text(&self, field: LogicalField) -> String {
        self.cell(field)
            .and_then(CellValue::as_text)
            .unwrap_or_else(|| default_text(field).to_string())
    }
}

fn default_text(field: LogicalField) -> &'static str {
    FIELD_DEFAULTS
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, d)| *d)
        .unwrap_or("")
}

fn build_item(
    reader: &RowReader<'_>,
    day_first: bool,
    warnings: &mut Vec<CellParseWarning>,
) -> InventoryItem {
    let display_name = format!(
        "{} {} {}",
        reader.text(LogicalField::Name),
        reader.text(LogicalField::Content),
        reader.text(LogicalField::Type)
    )
    .trim()
    .to_string();

    let quantity_display = format!(
        "{} x {}",
        reader.text(LogicalField::Amount),
        reader.text(LogicalField::PackSize)
    );

    let price = read_price(reader, warnings);
    let expiry_date = read_expiry(reader, day_first, warnings);

    InventoryItem::new(
        reader.text(LogicalField::Code),
        display_name,
        reader.text(LogicalField::TradeName),
        reader.text(LogicalField::Lot),
        price,
        quantity_display,
        expiry_date,
    )
}

fn read_price(reader: &RowReader<'_>, warnings: &mut Vec<CellParseWarning>) -> f64 {
    let cell = match reader.cell(LogicalField::Price) {
        Some(cell) if !cell.is_blank() => cell,
        _ => return DEFAULT_PRICE,
    };
    parse_number(cell).unwrap_or_else(|| {
        warnings.push(warning(reader, LogicalField::Price, cell, WarningKind::Number));
        DEFAULT_PRICE
    })
}

fn read_expiry(
    reader: &RowReader<'_>,
    day_first: bool,
    warnings: &mut Vec<CellParseWarning>,
) -> Option<NaiveDate> {
    let cell = reader.cell(LogicalField::Expiry).filter(|c| !c.is_blank())?;
    let parsed = parse_date(cell, day_first);
    if parsed.is_none() {
        warnings.push(warning(reader, LogicalField::Expiry, cell, WarningKind::Date));
    }
    parsed
}

fn warning(
    reader: &RowReader<'_>,
    field: LogicalField,
    cell: &CellValue,
    kind: WarningKind,
) -> CellParseWarning {
    CellParseWarning {
        row: reader.row,
        field,
        value: cell.as_text().unwrap_or_default(),
        kind,
    }
}
