//! Lenient cell parsers for the numeric and date fields.
//!
//! Both return `None` for a value they cannot interpret; the caller decides
//! the default and records the warning.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

use crate::models::CellValue;

/// Largest serial day Excel can represent (9999-12-31).
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a price cell. Thousands separators in text are tolerated.
/// Non-finite results count as unparsable.
pub fn parse_number(cell: &CellValue) -> Option<f64> {
    let n = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => {
            let t = s.trim();
            t.parse::<f64>()
                .or_else(|_| t.replace(',', "").parse::<f64>())
                .ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Parse an expiry/report date cell.
///
/// Numbers are Excel serial days (1900 system). Text is tried as ISO first,
/// then as a slash/dash/dot date in the preferred order, then the other
/// order.
pub fn parse_date(cell: &CellValue, day_first: bool) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(d) => Some(*d),
        CellValue::Number(n) => excel_serial_to_date(*n),
        CellValue::Text(s) => parse_date_text(s.trim(), day_first),
        _ => None,
    }
}

/// Days since 1899-12-30, ignoring any time-of-day fraction.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..=EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

fn parse_date_text(s: &str, day_first: bool) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }

    for fmt in ISO_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ISO_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    let (preferred, fallback) = if day_first {
        (DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS)
    } else {
        (MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS)
    };
    preferred
        .iter()
        .chain(fallback.iter())
        .find_map(|fmt| parse_date_or_datetime(s, fmt))
}

fn parse_date_or_datetime(s: &str, fmt: &str) -> Option<NaiveDate> {
    if fmt.contains("%H") {
        NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date())
    } else {
        NaiveDate::parse_from_str(s, fmt).ok()
    }
}
