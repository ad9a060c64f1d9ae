use crate::error::DuplicateHistoryKey;
use crate::loader::ParsedReport;
use crate::title::canonicalize;
use crate::types::{HistoryCsvRow, ReportDate, WeeklyRankRow};
use chrono::NaiveDate;
use log::warn;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HistoryKey {
    pub canonical_title: String,
    pub report_date: ReportDate,
}

/// Every ranked row seen across the weekly reports, keyed by canonical title
/// and weekend. Keys sort by title, then by weekend.
#[derive(Debug, Clone, Default)]
pub struct HistoryIndex {
    entries: BTreeMap<HistoryKey, WeeklyRankRow>,
}

impl HistoryIndex {
    /// Index all rows of `reports`. Rows that collide with an existing key are
    /// reported and dropped; the first occurrence stays.
    pub fn build<'a, I>(reports: I) -> (Self, Vec<DuplicateHistoryKey>)
    where
        I: IntoIterator<Item = &'a ParsedReport>,
    {
        let mut index = Self::default();
        let mut duplicates: Vec<DuplicateHistoryKey> = Vec::new();
        for report in reports {
            for row in &report.rows {
                if let Err(dup) = index.insert(row.clone()) {
                    warn!("{}: {}", report.source.display(), dup);
                    duplicates.push(dup);
                }
            }
        }
        (index, duplicates)
    }

    pub fn insert(&mut self, row: WeeklyRankRow) -> Result<(), DuplicateHistoryKey> {
        let key = HistoryKey {
            canonical_title: canonicalize(&row.title),
            report_date: row.report_date.clone(),
        };
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(row);
                Ok(())
            }
            Entry::Occupied(existing) => Err(DuplicateHistoryKey {
                title: existing.key().canonical_title.clone(),
                report_date: existing.key().report_date.to_string(),
            }),
        }
    }

    /// All weekends recorded for one canonical title, oldest first.
    pub fn rows_for(&self, canonical_title: &str) -> Vec<&WeeklyRankRow> {
        let start = HistoryKey {
            canonical_title: canonical_title.to_string(),
            report_date: ReportDate::new("", NaiveDate::MIN),
        };
        self.entries
            .range(start..)
            .take_while(|(key, _)| key.canonical_title == canonical_title)
            .map(|(_, row)| row)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest and latest weekend present in the index.
    pub fn weekend_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.entries.keys().map(|k| k.report_date.weekend_start());
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    pub fn csv_rows(&self) -> Vec<HistoryCsvRow> {
        self.entries
            .iter()
            .map(|(key, row)| HistoryCsvRow {
                canonical_title: key.canonical_title.clone(),
                weekend_date_range: key.report_date.token().to_string(),
                rank: row.rank,
                title: row.title.clone(),
                territory: row.territory.clone(),
                weekend_gross: row.weekend_gross,
                distributor: row.distributor.clone(),
                change_pct: row.change_pct,
                weeks_on_release: row.weeks_on_release,
                screens: row.screens,
                site_average: row.site_average,
                total_gross_to_date: row.total_gross_to_date,
            })
            .collect()
    }
}
