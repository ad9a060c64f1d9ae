use crate::error::{PipelineError, ReportError, RowError};
use crate::types::{RankedTitle, ReportDate, WeeklyRankRow};
use crate::util::{cell_number, cell_text, is_numeric_cell, whole_number};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Rows 0 and 1 of every weekly report are headers.
pub const FIRST_DATA_ROW: u32 = 2;
/// Exclusive bound of the scanned row window.
pub const ROW_WINDOW_END: u32 = 18;
pub const MAX_RANKED_ROWS: usize = 15;

const COLUMNS: [&str; 10] = [
    "rank",
    "title",
    "territory",
    "weekend_gross",
    "distributor",
    "change_pct",
    "weeks_on_release",
    "screens",
    "site_average",
    "total_gross_to_date",
];

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2})-(\d{2})").expect("date token pattern is valid")
});

#[derive(Debug, Clone)]
pub struct ParsedReport {
    pub source: PathBuf,
    pub report_date: ReportDate,
    /// Every row that passed the rank check, in sheet order.
    pub ranked: Vec<RankedTitle>,
    /// Fully coerced rows, the ones that go into the history.
    pub rows: Vec<WeeklyRankRow>,
    pub row_errors: Vec<RowError>,
}

/// Result of scanning one sheet's row window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedRows {
    pub ranked: Vec<RankedTitle>,
    pub rows: Vec<WeeklyRankRow>,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub files_skipped: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// Extract the weekend token (`YYYY-MM-DD-DD`) from a report file name.
pub fn report_date_from_name(name: &str) -> Result<ReportDate, ReportError> {
    let malformed = || ReportError::MalformedSourceName {
        name: name.to_string(),
    };
    let caps = DATE_TOKEN.captures(name).ok_or_else(malformed)?;
    let year: i32 = caps[1].parse().map_err(|_| malformed())?;
    let month: u32 = caps[2].parse().map_err(|_| malformed())?;
    let day: u32 = caps[3].parse().map_err(|_| malformed())?;
    let end_day: u32 = caps[4].parse().map_err(|_| malformed())?;
    let start = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(malformed)?;
    if !(1..=31).contains(&end_day) {
        return Err(malformed());
    }
    Ok(ReportDate::new(&caps[0], start))
}

/// Scan the fixed row window of a report sheet.
///
/// Cell positions are absolute, so a sheet whose first used row is not row 0
/// still lines up with the fixed layout. Rows whose first cell is not a number
/// (blank lines, footers) are ignored. A ranked row always counts towards the
/// ranked titles; it only reaches `rows` when its count columns coerce and
/// its rank is not a repeat.
pub fn parse_rows(range: &Range<Data>, report_date: &ReportDate) -> ParsedRows {
    let empty = Data::Empty;
    let mut parsed = ParsedRows::default();
    let mut ranks: HashSet<u32> = HashSet::new();

    for row in FIRST_DATA_ROW..ROW_WINDOW_END {
        if parsed.ranked.len() >= MAX_RANKED_ROWS {
            break;
        }
        let cells: Vec<&Data> = (0..COLUMNS.len() as u32)
            .map(|col| range.get_value((row, col)).unwrap_or(&empty))
            .collect();
        if !is_numeric_cell(cells[0]) {
            continue;
        }
        // Errors report the 1-based row number a spreadsheet user sees.
        let line = row as usize + 1;
        let rank = match parse_rank(line, cells[0]) {
            Ok(rank) => rank,
            Err(e) => {
                parsed.errors.push(e);
                continue;
            }
        };
        parsed.ranked.push(RankedTitle {
            rank,
            title: cell_text(cells[1]),
        });
        if !ranks.insert(rank) {
            parsed.errors.push(RowError::DuplicateRank { row: line, rank });
            continue;
        }
        match parse_row(line, rank, &cells, report_date) {
            Ok(r) => parsed.rows.push(r),
            Err(e) => parsed.errors.push(e),
        }
    }
    parsed
}

fn parse_rank(row: usize, cell: &Data) -> Result<u32, RowError> {
    match count(row, 0, cell)? {
        0 => Err(RowError::NotWhole {
            row,
            column: COLUMNS[0],
            value: cell_text(cell),
        }),
        rank => Ok(rank),
    }
}

fn parse_row(
    row: usize,
    rank: u32,
    cells: &[&Data],
    report_date: &ReportDate,
) -> Result<WeeklyRankRow, RowError> {
    // Money columns may hold `-` or nothing; only the counts are mandatory.
    Ok(WeeklyRankRow {
        rank,
        title: cell_text(cells[1]),
        territory: cell_text(cells[2]),
        weekend_gross: cell_number(cells[3]),
        distributor: cell_text(cells[4]),
        change_pct: cell_number(cells[5]),
        weeks_on_release: count(row, 6, cells[6])?,
        screens: count(row, 7, cells[7])?,
        site_average: cell_number(cells[8]),
        total_gross_to_date: cell_number(cells[9]),
        report_date: report_date.clone(),
    })
}

fn count(row: usize, col: usize, cell: &Data) -> Result<u32, RowError> {
    cell_number(cell)
        .and_then(whole_number)
        .ok_or_else(|| RowError::NotWhole {
            row,
            column: COLUMNS[col],
            value: cell_text(cell),
        })
}

/// Read the first worksheet of one report file (`.xls` or `.xlsx`).
///
/// The file name is checked before the workbook is opened: a report without
/// a weekend token cannot be placed in the history.
pub fn load_report(path: &Path) -> Result<ParsedReport, ReportError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let report_date = report_date_from_name(&name)?;

    let mut workbook = open_workbook_auto(path).map_err(|source| ReportError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::EmptyWorkbook {
            path: path.to_path_buf(),
        })?
        .map_err(|source| ReportError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;

    let parsed = parse_rows(&range, &report_date);
    for e in &parsed.errors {
        warn!("{}: skipped {}", name, e);
    }
    debug!(
        "{}: {} ranked rows, {} indexed, for {}",
        name,
        parsed.ranked.len(),
        parsed.rows.len(),
        report_date
    );
    Ok(ParsedReport {
        source: path.to_path_buf(),
        report_date,
        ranked: parsed.ranked,
        rows: parsed.rows,
        row_errors: parsed.errors,
    })
}

/// Spreadsheet files in `dir`, sorted by file name.
pub fn discover_reports(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_sheet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("xlsx"));
        // Lock files left behind by spreadsheet editors.
        let is_lock = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("~$"));
        if is_sheet && !is_lock {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load every report in `dir`. Unreadable or badly named files are logged
/// and counted, never fatal.
pub fn load_directory(dir: &Path) -> Result<(Vec<ParsedReport>, LoadReport), PipelineError> {
    let files = discover_reports(dir).map_err(|source| PipelineError::DataDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut report = LoadReport {
        files_seen: files.len(),
        ..LoadReport::default()
    };
    let mut parsed: Vec<ParsedReport> = Vec::new();
    for path in files {
        match load_report(&path) {
            Ok(r) => {
                report.files_loaded += 1;
                report.rows_loaded += r.rows.len();
                report.rows_skipped += r.row_errors.len();
                parsed.push(r);
            }
            Err(e) => {
                warn!("skipping report: {}", e);
                report.files_skipped += 1;
            }
        }
    }
    Ok((parsed, report))
}
