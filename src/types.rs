use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::Tabled;

/// The weekend a report covers, as spelled in its file name (`2024-08-23-25`).
///
/// Ordering follows the weekend start date, which agrees with the lexical
/// order of the token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportDate {
    weekend_start: NaiveDate,
    token: String,
}

impl ReportDate {
    pub fn new(token: impl Into<String>, weekend_start: NaiveDate) -> Self {
        Self {
            weekend_start,
            token: token.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn weekend_start(&self) -> NaiveDate {
        self.weekend_start
    }
}

impl fmt::Display for ReportDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// One ranked row of one weekly report.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyRankRow {
    pub rank: u32,
    pub title: String,
    pub territory: String,
    pub weekend_gross: Option<f64>,
    pub distributor: String,
    pub change_pct: Option<f64>,
    pub weeks_on_release: u32,
    pub screens: u32,
    pub site_average: Option<f64>,
    pub total_gross_to_date: Option<f64>,
    pub report_date: ReportDate,
}

/// A row of a report that passed the numeric-rank check, whether or not the
/// rest of the row coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedTitle {
    pub rank: u32,
    pub title: String,
}

/// A title picked from the target week, in rank order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionEntry {
    pub rank: u32,
    pub raw_title: String,
    pub canonical_title: String,
    pub query: String,
}

/// Field/value pairs returned by the metadata service, in response order.
///
/// A failed lookup is represented the way the service itself reports a miss:
/// `Response: "False"` plus an `Error` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: Map<String, Value>,
}

impl MetadataRecord {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("Response".to_string(), Value::from("False"));
        fields.insert("Error".to_string(), Value::from(message.into()));
        Self { fields }
    }

    pub fn is_failure(&self) -> bool {
        let negative = self
            .fields
            .get("Response")
            .and_then(Value::as_str)
            .is_some_and(|r| r.eq_ignore_ascii_case("false"));
        negative || self.fields.contains_key("Error")
    }

    pub fn error_message(&self) -> Option<&str> {
        self.fields.get("Error").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Console preview of the selection set.
#[derive(Debug, Tabled, Clone)]
pub struct SelectionPreviewRow {
    #[tabled(rename = "Rank")]
    pub rank: u32,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Query")]
    pub query: String,
    #[tabled(rename = "Weekend Gross")]
    pub weekend_gross: String,
    #[tabled(rename = "Weeks")]
    pub weeks_on_release: String,
}

/// One line of the history index CSV export.
#[derive(Debug, Serialize, Clone)]
pub struct HistoryCsvRow {
    #[serde(rename = "CanonicalTitle")]
    pub canonical_title: String,
    #[serde(rename = "WeekendDateRange")]
    pub weekend_date_range: String,
    #[serde(rename = "Rank")]
    pub rank: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Territory")]
    pub territory: String,
    #[serde(rename = "WeekendGross")]
    pub weekend_gross: Option<f64>,
    #[serde(rename = "Distributor")]
    pub distributor: String,
    #[serde(rename = "ChangePct")]
    pub change_pct: Option<f64>,
    #[serde(rename = "WeeksOnRelease")]
    pub weeks_on_release: u32,
    #[serde(rename = "Screens")]
    pub screens: u32,
    #[serde(rename = "SiteAverage")]
    pub site_average: Option<f64>,
    #[serde(rename = "TotalGrossToDate")]
    pub total_gross_to_date: Option<f64>,
}

#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub target_weekend: String,
    pub reports_indexed: usize,
    pub reports_skipped: usize,
    pub rows_indexed: usize,
    pub rows_skipped: usize,
    pub duplicate_keys: usize,
    pub sheets_written: usize,
    pub lookup_failures: usize,
    pub renamed_sheets: usize,
    pub earliest_weekend: Option<NaiveDate>,
    pub latest_weekend: Option<NaiveDate>,
}
