//! Header alias resolution.
//!
//! Real exports label the same column differently (`CODE1` vs `Code`,
//! `minofLotPack` vs `PackSize`). [`ColumnAliases`] is a declarative table
//! from each [`LogicalField`] to an ordered list of accepted header
//! spellings. It is resolved once per load into a [`ColumnMap`] of column
//! indices, so rows are read positionally with no per-row string matching.
//!
//! Matching trims surrounding whitespace and ignores ASCII/Unicode case.
//! For each field the first alias (in list order) that matches any header
//! wins; among duplicate headers the leftmost column wins.

use serde::{Deserialize, Serialize};

/// A column the normalizer knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalField {
    Code,
    Name,
    Content,
    Type,
    Amount,
    PackSize,
    Price,
    Lot,
    TradeName,
    Expiry,
    ReportDate,
}

impl LogicalField {
    pub const ALL: [LogicalField; 11] = [
        LogicalField::Code,
        LogicalField::Name,
        LogicalField::Content,
        LogicalField::Type,
        LogicalField::Amount,
        LogicalField::PackSize,
        LogicalField::Price,
        LogicalField::Lot,
        LogicalField::TradeName,
        LogicalField::Expiry,
        LogicalField::ReportDate,
    ];

    /// Fields without which a table cannot be normalized.
    pub const REQUIRED: [LogicalField; 4] = [
        LogicalField::Code,
        LogicalField::Name,
        LogicalField::Amount,
        LogicalField::PackSize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::Code => "code",
            LogicalField::Name => "name",
            LogicalField::Content => "content",
            LogicalField::Type => "type",
            LogicalField::Amount => "amount",
            LogicalField::PackSize => "pack_size",
            LogicalField::Price => "price",
            LogicalField::Lot => "lot",
            LogicalField::TradeName => "trade_name",
            LogicalField::Expiry => "expiry",
            LogicalField::ReportDate => "report_date",
        }
    }

    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }

    fn slot(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for LogicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepted header spellings per logical field.
///
/// Deserializes from a `[columns]` TOML table; any field left out keeps its
/// built-in aliases.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnAliases {
    #[serde(default = "default_code")]
    pub code: Vec<String>,
    #[serde(default = "default_name")]
    pub name: Vec<String>,
    #[serde(default = "default_content")]
    pub content: Vec<String>,
    #[serde(default = "default_type")]
    pub r#type: Vec<String>,
    #[serde(default = "default_amount")]
    pub amount: Vec<String>,
    #[serde(default = "default_pack_size")]
    pub pack_size: Vec<String>,
    #[serde(default = "default_price")]
    pub price: Vec<String>,
    #[serde(default = "default_lot")]
    pub lot: Vec<String>,
    #[serde(default = "default_trade_name")]
    pub trade_name: Vec<String>,
    #[serde(default = "default_expiry")]
    pub expiry: Vec<String>,
    #[serde(default = "default_report_date")]
    pub report_date: Vec<String>,
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn default_code() -> Vec<String> {
    strings(&["CODE1", "CODE", "DrugCode"])
}
fn default_name() -> Vec<String> {
    strings(&["NAME1", "NAME", "DrugName"])
}
fn default_content() -> Vec<String> {
    strings(&["CONTENT", "Strength"])
}
fn default_type() -> Vec<String> {
    strings(&["TYPE", "DosageForm"])
}
fn default_amount() -> Vec<String> {
    strings(&["Amount1", "Amount", "Qty", "Quantity"])
}
fn default_pack_size() -> Vec<String> {
    strings(&["minofLotPack", "PackSize", "Pack"])
}
fn default_price() -> Vec<String> {
    strings(&["price", "UnitPrice"])
}
fn default_lot() -> Vec<String> {
    strings(&["LotNo", "Lot"])
}
fn default_trade_name() -> Vec<String> {
    strings(&["TradeName", "Brand"])
}
fn default_expiry() -> Vec<String> {
    strings(&["ExpDate", "Expiry", "ExpiryDate"])
}
fn default_report_date() -> Vec<String> {
    strings(&["ReportDate", "AsOf"])
}

impl Default for ColumnAliases {
    fn default() -> Self {
        Self {
            code: default_code(),
            name: default_name(),
            content: default_content(),
            r#type: default_type(),
            amount: default_amount(),
            pack_size: default_pack_size(),
            price: default_price(),
            lot: default_lot(),
            trade_name: default_trade_name(),
            expiry: default_expiry(),
            report_date: default_report_date(),
        }
    }
}

impl ColumnAliases {
    pub fn for_field(&self, field: LogicalField) -> &[String] {
        match field {
            LogicalField::Code => &self.code,
            LogicalField::Name => &self.name,
            LogicalField::Content => &self.content,
            LogicalField::Type => &self.r#type,
            LogicalField::Amount => &self.amount,
            LogicalField::PackSize => &self.pack_size,
            LogicalField::Price => &self.price,
            LogicalField::Lot => &self.lot,
            LogicalField::TradeName => &self.trade_name,
            LogicalField::Expiry => &self.expiry,
            LogicalField::ReportDate => &self.report_date,
        }
    }

    /// Fields whose alias list is empty or only whitespace.
    pub fn empty_fields(&self) -> Vec<LogicalField> {
        LogicalField::ALL
            .into_iter()
            .filter(|f| self.for_field(*f).iter().all(|a| a.trim().is_empty()))
            .collect()
    }

    /// Map every logical field to the header that satisfies it, if any.
    pub fn resolve(&self, headers: &[String]) -> ColumnMap {
        let folded: Vec<String> = headers.iter().map(|h| fold(h)).collect();
        let mut map = ColumnMap::default();

        for field in LogicalField::ALL {
            let hit = self.for_field(field).iter().find_map(|alias| {
                let alias = fold(alias);
                if alias.is_empty() {
                    return None;
                }
                folded.iter().position(|h| *h == alias)
            });
            if let Some(index) = hit {
                map.slots[field.slot()] = Some(ResolvedColumn {
                    index,
                    header: headers[index].trim().to_string(),
                });
            }
        }

        map
    }
}

fn fold(s: &str) -> String {
    s.trim().to_lowercase()
}

/// The table column chosen for a logical field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub index: usize,
    /// Header text as it appeared in the table (trimmed).
    pub header: String,
}

/// Fixed lookup from logical field to resolved column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    slots: [Option<ResolvedColumn>; 11],
}

impl ColumnMap {
    pub fn get(&self, field: LogicalField) -> Option<&ResolvedColumn> {
        self.slots[field.slot()].as_ref()
    }

    pub fn index(&self, field: LogicalField) -> Option<usize> {
        self.get(field).map(|c| c.index)
    }

    /// Required fields with no matching column, in [`LogicalField::REQUIRED`] order.
    pub fn missing_required(&self) -> Vec<LogicalField> {
        LogicalField::REQUIRED
            .into_iter()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogicalField, Option<&ResolvedColumn>)> + '_ {
        LogicalField::ALL.into_iter().map(move |f| (f, self.get(f)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        strings(list)
    }

    #[test]
    fn slots_follow_declaration_order() {
        for (i, f) in LogicalField::ALL.iter().enumerate() {
            assert_eq!(f.slot(), i);
        }
    }

    #[test]
    fn resolves_trimmed_case_insensitive_headers() {
        let map = ColumnAliases::default().resolve(&headers(&[
            " code1 ",
            "Name1",
            "AMOUNT1",
            "MinOfLotPack",
        ]));
        assert_eq!(map.index(LogicalField::Code), Some(0));
        assert_eq!(map.get(LogicalField::Code).unwrap().header, "code1");
        assert_eq!(map.index(LogicalField::Name), Some(1));
        assert_eq!(map.index(LogicalField::Amount), Some(2));
        assert_eq!(map.index(LogicalField::PackSize), Some(3));
        assert!(map.missing_required().is_empty());
        assert_eq!(map.index(LogicalField::TradeName), None);
    }

    #[test]
    fn earlier_alias_wins_over_earlier_column() {
        // "Qty" appears first in the sheet, but "Amount1" is the preferred alias.
        let map = ColumnAliases::default().resolve(&headers(&["Qty", "Amount1"]));
        assert_eq!(map.index(LogicalField::Amount), Some(1));
    }

    #[test]
    fn duplicate_headers_take_leftmost() {
        let map = ColumnAliases::default().resolve(&headers(&["LotNo", "x", "LotNo"]));
        assert_eq!(map.index(LogicalField::Lot), Some(0));
    }

    #[test]
    fn missing_required_lists_every_gap_in_order() {
        let map = ColumnAliases::default().resolve(&headers(&["NAME1", "price"]));
        assert_eq!(
            map.missing_required(),
            vec![
                LogicalField::Code,
                LogicalField::Amount,
                LogicalField::PackSize
            ]
        );
    }

    #[test]
    fn empty_alias_never_matches_empty_header() {
        let aliases = ColumnAliases {
            lot: vec![String::new()],
            ..ColumnAliases::default()
        };
        let map = aliases.resolve(&headers(&["", "CODE1"]));
        assert_eq!(map.index(LogicalField::Lot), None);
        assert_eq!(aliases.empty_fields(), vec![LogicalField::Lot]);
    }

    #[test]
    fn overrides_replace_builtin_list() {
        let aliases = ColumnAliases {
            amount: strings(&["On Hand"]),
            ..ColumnAliases::default()
        };
        let map = aliases.resolve(&headers(&["Amount1", "on hand"]));
        assert_eq!(map.index(LogicalField::Amount), Some(1));
    }
}
