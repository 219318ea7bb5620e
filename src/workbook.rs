//! Spreadsheet decoding: raw file bytes to a [`RawTable`].
//!
//! The format is sniffed from content, not from the file name, so uploads
//! and renamed files behave the same:
//!
//! | Magic | Format |
//! |-------|--------|
//! | `PK\x03\x04` | OOXML workbook (`.xlsx`, `.xlsm`) |
//! | `D0 CF 11 E0` | legacy BIFF `.xls`, rejected |
//! | anything else | CSV |
//!
//! The first row with any non-blank cell becomes the header row; fully blank
//! rows are skipped. Cell text is passed through verbatim (no trimming, no
//! encoding repair).

use std::io::Read;

use chrono::NaiveDate;
use medstock_core::models::{CellValue, RawTable};
use thiserror::Error;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;
/// Maximum cells decoded from one worksheet.
const MAX_CELLS_PER_SHEET: usize = 2_000_000;
/// Columns in an Excel worksheet (`A` through `XFD`).
const MAX_COLUMNS: usize = 16_384;

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE2_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Xlsx,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// 1-based worksheet number (xlsx only).
    pub sheet: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { sheet: 1 }
    }
}

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("xlsx decoding failed: {0}")]
    Xlsx(String),
    #[error("csv decoding failed: {0}")]
    Csv(String),
    #[error("worksheet {0} not found")]
    SheetNotFound(usize),
    #[error("no header row found (file is empty)")]
    Empty,
}

/// Identify the format of `bytes`.
pub fn sniff_format(bytes: &[u8]) -> Result<SheetFormat, ReadError> {
    if bytes.starts_with(ZIP_MAGIC) {
        Ok(SheetFormat::Xlsx)
    } else if bytes.starts_with(OLE2_MAGIC) {
        Err(ReadError::UnsupportedFormat(
            "legacy .xls workbooks are not supported; save as .xlsx or .csv".to_string(),
        ))
    } else {
        Ok(SheetFormat::Csv)
    }
}

/// Decode a workbook or CSV file into a [`RawTable`].
pub fn read_table(bytes: &[u8], options: &ReadOptions) -> Result<RawTable, ReadError> {
    let grid = match sniff_format(bytes)? {
        SheetFormat::Xlsx => read_xlsx_grid(bytes, options.sheet)?,
        SheetFormat::Csv => read_csv_grid(bytes)?,
    };
    grid_to_table(grid)
}

/// Split a grid into header row and data rows, dropping blank rows.
fn grid_to_table(grid: Vec<Vec<CellValue>>) -> Result<RawTable, ReadError> {
    let mut rows = grid
        .into_iter()
        .filter(|row| row.iter().any(|c| !c.is_blank()));

    let header_row = rows.next().ok_or(ReadError::Empty)?;
    let headers = header_row
        .iter()
        .map(|c| c.as_text().unwrap_or_default())
        .collect();

    Ok(RawTable {
        headers,
        rows: rows.collect(),
    })
}

// ============ CSV ============

fn read_csv_grid(bytes: &[u8]) -> Result<Vec<Vec<CellValue>>, ReadError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|e| ReadError::Csv(e.to_string()))?;
        let row = record
            .iter()
            .map(|field| {
                let text = String::from_utf8_lossy(field);
                if text.trim().is_empty() {
                    CellValue::Blank
                } else {
                    CellValue::Text(text.into_owned())
                }
            })
            .collect();
        grid.push(row);
    }
    Ok(grid)
}

// ============ XLSX ============

type Archive<'a> = zip::ZipArchive<std::io::Cursor<&'a [u8]>>;

fn read_xlsx_grid(bytes: &[u8], sheet: usize) -> Result<Vec<Vec<CellValue>>, ReadError> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).map_err(|e| ReadError::Xlsx(e.to_string()))?;

    let has_shared_strings = archive.file_names().any(|n| n == "xl/sharedStrings.xml");
    let shared_strings = if has_shared_strings {
        let xml = read_zip_entry_bounded(&mut archive, "xl/sharedStrings.xml", MAX_XML_ENTRY_BYTES)?;
        read_shared_strings(&xml)?
    } else {
        Vec::new()
    };

    let sheet_names = list_worksheet_names(&archive);
    let name = sheet
        .checked_sub(1)
        .and_then(|i| sheet_names.get(i))
        .ok_or(ReadError::SheetNotFound(sheet))?
        .clone();

    let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
    read_sheet_cells(&xml, &shared_strings)
}

fn read_zip_entry_bounded(
    archive: &mut Archive<'_>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ReadError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ReadError::Xlsx(format!("{}: {}", name, e)))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ReadError::Xlsx(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ReadError::Xlsx(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

/// Worksheet part names ordered by their sheet number.
fn list_worksheet_names(archive: &Archive<'_>) -> Vec<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
}

/// Shared string table. Rich-text runs are concatenated; phonetic
/// (`rPh`) runs are skipped.
fn read_shared_strings(xml: &[u8]) -> Result<Vec<String>, ReadError> {
    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current: Option<String> = None;
    let mut in_t = false;
    let mut in_phonetic = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" if !in_phonetic => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Empty(e)) => {
                if e.local_name().as_ref() == b"si" {
                    strings.push(String::new());
                }
            }
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                if let Some(s) = current.as_mut() {
                    let text = te.unescape().map_err(|e| ReadError::Xlsx(e.to_string()))?;
                    s.push_str(&text);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_t = false,
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ReadError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cell being assembled while its `<c>` element is open.
#[derive(Default)]
struct PendingCell {
    column: usize,
    kind: Option<String>,
    value: String,
}

impl PendingCell {
    fn finish(self, shared_strings: &[String]) -> CellValue {
        let v = self.value;
        match self.kind.as_deref() {
            Some("s") => v
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared_strings.get(i))
                .map(|s| text_cell(s.clone()))
                .unwrap_or(CellValue::Blank),
            Some("inlineStr") | Some("str") => text_cell(v),
            Some("b") => match v.trim() {
                "1" => CellValue::Bool(true),
                "0" => CellValue::Bool(false),
                _ => CellValue::Blank,
            },
            Some("e") => CellValue::Blank,
            Some("d") => parse_iso_date(v.trim())
                .map(CellValue::Date)
                .unwrap_or_else(|| text_cell(v)),
            _ => {
                if v.trim().is_empty() {
                    CellValue::Blank
                } else {
                    v.trim()
                        .parse::<f64>()
                        .map(CellValue::Number)
                        .unwrap_or_else(|_| text_cell(v))
                }
            }
        }
    }
}

fn text_cell(s: String) -> CellValue {
    if s.is_empty() {
        CellValue::Blank
    } else {
        CellValue::Text(s)
    }
}

fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Zero-based column index from an A1-style reference (`"AB12"` -> 27).
/// Saturates instead of overflowing on absurdly long references.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut n = 0usize;
    for b in letters {
        n = n
            .saturating_mul(26)
            .saturating_add((b.to_ascii_uppercase() - b'A' + 1) as usize);
    }
    Some(n - 1)
}

fn read_sheet_cells(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<CellValue>>, ReadError> {
    use quick_xml::events::Event;

    let mut grid: Vec<Vec<CellValue>> = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut row: Option<Vec<CellValue>> = None;
    let mut cell: Option<PendingCell> = None;
    let mut next_column = 0usize;
    let mut in_value = false;
    let mut cell_count = 0usize;

    loop {
        if cell_count >= MAX_CELLS_PER_SHEET {
            return Err(ReadError::Xlsx(format!(
                "worksheet exceeds {} cells",
                MAX_CELLS_PER_SHEET
            )));
        }
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => {
                    row = Some(Vec::new());
                    next_column = 0;
                }
                b"c" => {
                    let mut pending = PendingCell {
                        column: next_column,
                        ..PendingCell::default()
                    };
                    for attr in e.attributes().flatten() {
                        let value = attr
                            .unescape_value()
                            .map_err(|e| ReadError::Xlsx(e.to_string()))?;
                        match attr.key.local_name().as_ref() {
                            b"r" => {
                                if let Some(i) = column_index(&value) {
                                    pending.column = i;
                                }
                            }
                            b"t" => pending.kind = Some(value.into_owned()),
                            _ => {}
                        }
                    }
                    if pending.column >= MAX_COLUMNS {
                        return Err(ReadError::Xlsx(format!(
                            "cell column {} is beyond the last worksheet column ({})",
                            pending.column + 1,
                            MAX_COLUMNS
                        )));
                    }
                    cell = Some(pending);
                }
                b"v" | b"t" if cell.is_some() => in_value = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"row" {
                    grid.push(Vec::new());
                } else if e.local_name().as_ref() == b"c" {
                    // Styled but empty cell; only advances the column cursor.
                    for attr in e.attributes().flatten() {
                        if attr.key.local_name().as_ref() == b"r" {
                            if let Some(i) = attr.unescape_value().ok().and_then(|v| column_index(&v)) {
                                next_column = i.min(MAX_COLUMNS);
                            }
                        }
                    }
                    next_column += 1;
                }
            }
            Ok(Event::Text(te)) if in_value => {
                if let Some(pending) = cell.as_mut() {
                    let text = te.unescape().map_err(|e| ReadError::Xlsx(e.to_string()))?;
                    pending.value.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(pending), Some(cells)) = (cell.take(), row.as_mut()) {
                        let column = pending.column;
                        let value = pending.finish(shared_strings);
                        if cells.len() <= column {
                            cells.resize(column + 1, CellValue::Blank);
                        }
                        cells[column] = value;
                        next_column = column + 1;
                        cell_count += 1;
                    }
                }
                b"row" => {
                    if let Some(cells) = row.take() {
                        grid.push(cells);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ReadError::Xlsx(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(grid)
}
