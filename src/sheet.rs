//! Per-movie output sheets: the metadata block followed by the weekend
//! performance table.
//!
//! Sheets are assembled in memory and handed to `output::write_workbook`,
//! so nothing touches disk until every sheet is ready.

use std::collections::HashSet;

use log::warn;
use serde_json::Value;

use crate::error::SheetNameCollision;
use crate::types::{MetadataRecord, WeeklyRankRow};

/// Longest sheet name the xlsx format accepts.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const ILLEGAL_SHEET_CHARS: [char; 11] = ['\\', '/', '?', '*', ':', '|', '"', '<', '>', '[', ']'];

/// Excel refuses a user sheet with this name.
const RESERVED_SHEET_NAME: &str = "history";

const FALLBACK_SHEET_NAME: &str = "Sheet";

pub const SECTION_TITLE: &str = "Weekend Box Office Performance";

pub const HISTORY_HEADERS: [&str; 7] = [
    "Weeks on release",
    "Weekend Date Range",
    "Weekend Gross",
    "Percentage change on last week",
    "Number of screens",
    "Site Average",
    "Total Gross to date",
];

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetRow {
    pub cells: Vec<CellValue>,
    pub bold: bool,
}

impl SheetRow {
    fn plain(cells: Vec<CellValue>) -> Self {
        Self { cells, bold: false }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSheet {
    pub name: String,
    pub canonical_title: String,
    pub rows: Vec<SheetRow>,
    /// Index in `rows` of the performance table's column headers.
    pub history_header: Option<usize>,
}

impl OutputSheet {
    /// The data rows under the performance table header.
    pub fn history_section(&self) -> &[SheetRow] {
        match self.history_header {
            Some(pos) => self.rows.get(pos + 1..).unwrap_or(&[]),
            None => &[],
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Drop characters a sheet name may not contain and cut it to 31 characters.
pub fn sanitize_sheet_name(raw_title: &str) -> String {
    let cleaned: String = raw_title
        .chars()
        .filter(|c| !ILLEGAL_SHEET_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'');
    let truncated = truncate_chars(cleaned, MAX_SHEET_NAME_CHARS);
    let name = truncated.trim_end_matches('\'');
    if name.trim().is_empty() {
        FALLBACK_SHEET_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Hands out sheet names that are unique within one workbook.
///
/// Names compare case-insensitively, as spreadsheet applications do. A title
/// whose sanitized name is already taken gets a ` (n)` suffix, with the stem
/// shortened so the result still fits.
#[derive(Debug)]
pub struct SheetNamer {
    taken: HashSet<String>,
    collisions: Vec<SheetNameCollision>,
}

impl Default for SheetNamer {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetNamer {
    pub fn new() -> Self {
        let mut taken = HashSet::new();
        taken.insert(RESERVED_SHEET_NAME.to_string());
        Self {
            taken,
            collisions: Vec::new(),
        }
    }

    pub fn assign(&mut self, raw_title: &str) -> String {
        let base = sanitize_sheet_name(raw_title);
        if self.taken.insert(base.to_lowercase()) {
            return base;
        }
        let mut n = 2usize;
        loop {
            let suffix = format!(" ({n})");
            let room = MAX_SHEET_NAME_CHARS.saturating_sub(suffix.chars().count());
            let stem = truncate_chars(&base, room);
            let candidate = format!("{}{}", stem.trim_end(), suffix);
            if self.taken.insert(candidate.to_lowercase()) {
                let collision = SheetNameCollision {
                    title: raw_title.to_string(),
                    name: base,
                    resolved: candidate.clone(),
                };
                warn!("{}", collision);
                self.collisions.push(collision);
                return candidate;
            }
            n += 1;
        }
    }

    pub fn collisions(&self) -> &[SheetNameCollision] {
        &self.collisions
    }
}

fn metadata_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Number(n) => n
            .as_f64()
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(n.to_string())),
        Value::Bool(b) => CellValue::Text(if *b { "True" } else { "False" }.to_string()),
        // Ratings and other nested values stay readable as compact JSON.
        nested => CellValue::Text(nested.to_string()),
    }
}

fn optional_number(value: Option<f64>) -> CellValue {
    value.map(CellValue::Number).unwrap_or(CellValue::Empty)
}

fn history_cells(row: &WeeklyRankRow) -> Vec<CellValue> {
    vec![
        CellValue::Number(f64::from(row.weeks_on_release)),
        CellValue::Text(row.report_date.token().to_string()),
        optional_number(row.weekend_gross),
        optional_number(row.change_pct),
        CellValue::Number(f64::from(row.screens)),
        optional_number(row.site_average),
        optional_number(row.total_gross_to_date),
    ]
}

/// Build one movie sheet.
///
/// Layout: one `field | value` row per metadata field, a blank row, the bold
/// section title, the column headers, then the weekend rows oldest first.
pub fn assemble(
    name: String,
    canonical_title: &str,
    metadata: &MetadataRecord,
    history: &[&WeeklyRankRow],
) -> OutputSheet {
    let mut rows: Vec<SheetRow> = metadata
        .fields()
        .map(|(field, value)| SheetRow::plain(vec![CellValue::Text(field.clone()), metadata_cell(value)]))
        .collect();

    rows.push(SheetRow::default());
    rows.push(SheetRow {
        cells: vec![CellValue::Text(SECTION_TITLE.to_string())],
        bold: true,
    });
    let history_header = rows.len();
    rows.push(SheetRow::plain(
        HISTORY_HEADERS
            .iter()
            .map(|h| CellValue::Text(h.to_string()))
            .collect(),
    ));

    let mut ordered: Vec<&WeeklyRankRow> = history.to_vec();
    ordered.sort_by(|a, b| a.report_date.cmp(&b.report_date));
    rows.extend(ordered.into_iter().map(|row| SheetRow::plain(history_cells(row))));

    OutputSheet {
        name,
        canonical_title: canonical_title.to_string(),
        rows,
        history_header: Some(history_header),
    }
}
