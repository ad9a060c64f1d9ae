// Fixture builders shared by the unit tests.
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ReportFixtureRow {
    pub rank: u32,
    pub title: String,
    pub weekend_gross: f64,
    pub change_pct: Option<f64>,
    pub weeks_on_release: u32,
    pub screens: u32,
    /// Text written instead of the site average, e.g. `-`.
    pub site_average_text: Option<&'static str>,
    /// Text written instead of the weeks on release.
    pub weeks_text: Option<&'static str>,
}

impl ReportFixtureRow {
    pub fn new(rank: u32, title: &str, weeks_on_release: u32, screens: u32) -> Self {
        Self {
            rank,
            title: title.to_string(),
            weekend_gross: 100_000.0 * f64::from(16 - rank.min(15)),
            change_pct: Some(-25.0),
            weeks_on_release,
            screens,
            site_average_text: None,
            weeks_text: None,
        }
    }

    pub fn site_average_text(mut self, text: &'static str) -> Self {
        self.site_average_text = Some(text);
        self
    }

    pub fn weeks_text(mut self, text: &'static str) -> Self {
        self.weeks_text = Some(text);
        self
    }

    pub fn gross(mut self, weekend_gross: f64) -> Self {
        self.weekend_gross = weekend_gross;
        self
    }
}

/// Write a report in the weekly layout: two header rows, ranked rows from
/// row 2, then a footer line.
pub fn write_report(dir: &Path, file_name: &str, rows: &[ReportFixtureRow]) -> PathBuf {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "Weekend box office figures").unwrap();
    let headers = [
        "Rank",
        "Film",
        "Country of Origin",
        "Weekend Gross",
        "Distributor",
        "% change on last week",
        "Weeks on release",
        "Number of cinemas",
        "Site average",
        "Total Gross to date",
    ];
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(1, col as u16, *header).unwrap();
    }

    let mut next_row = 2u32;
    for row in rows {
        let screens = f64::from(row.screens.max(1));
        sheet.write_number(next_row, 0, f64::from(row.rank)).unwrap();
        sheet.write_string(next_row, 1, row.title.as_str()).unwrap();
        sheet.write_string(next_row, 2, "USA").unwrap();
        sheet.write_number(next_row, 3, row.weekend_gross).unwrap();
        sheet.write_string(next_row, 4, "Walt Disney").unwrap();
        match row.change_pct {
            Some(change) => sheet.write_number(next_row, 5, change).unwrap(),
            None => sheet.write_string(next_row, 5, "-").unwrap(),
        };
        match row.weeks_text {
            Some(text) => sheet.write_string(next_row, 6, text).unwrap(),
            None => sheet
                .write_number(next_row, 6, f64::from(row.weeks_on_release))
                .unwrap(),
        };
        sheet.write_number(next_row, 7, f64::from(row.screens)).unwrap();
        match row.site_average_text {
            Some(text) => sheet.write_string(next_row, 8, text).unwrap(),
            None => sheet
                .write_number(next_row, 8, (row.weekend_gross / screens).round())
                .unwrap(),
        };
        sheet
            .write_number(next_row, 9, row.weekend_gross * 4.0)
            .unwrap();
        next_row += 1;
    }
    sheet
        .write_string(next_row + 1, 0, "Source: comScore")
        .unwrap();

    let path = dir.join(file_name);
    workbook.save(&path).unwrap();
    path
}
