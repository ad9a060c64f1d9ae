use crate::history::HistoryIndex;
use crate::loader::{LoadReport, ParsedReport, MAX_RANKED_ROWS};
use crate::title::{canonicalize, to_query};
use crate::types::{MetadataRecord, RankedTitle, RunSummary, SelectionEntry, SelectionPreviewRow};
use crate::util::format_number;

/// The titles of the target week, rank ascending, top 15 at most.
///
/// Built from every row that passed the rank check, so a title still gets
/// a sheet when the rest of its row was unusable.
pub fn select_titles(target: &ParsedReport) -> Vec<SelectionEntry> {
    ranked(target)
        .into_iter()
        .map(|entry| SelectionEntry {
            rank: entry.rank,
            raw_title: entry.title.clone(),
            canonical_title: canonicalize(&entry.title),
            query: to_query(&entry.title),
        })
        .collect()
}

pub fn selection_preview(target: &ParsedReport) -> Vec<SelectionPreviewRow> {
    ranked(target)
        .into_iter()
        .map(|entry| {
            let row = target
                .rows
                .iter()
                .find(|r| r.rank == entry.rank && r.title == entry.title);
            SelectionPreviewRow {
                rank: entry.rank,
                title: entry.title.clone(),
                query: to_query(&entry.title),
                weekend_gross: row
                    .and_then(|r| r.weekend_gross)
                    .map(|g| format_number(g, 0))
                    .unwrap_or_else(|| "-".to_string()),
                weeks_on_release: row
                    .map(|r| r.weeks_on_release.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            }
        })
        .collect()
}

fn ranked(target: &ParsedReport) -> Vec<&RankedTitle> {
    let mut entries: Vec<&RankedTitle> = target.ranked.iter().collect();
    entries.sort_by_key(|e| e.rank);
    entries.truncate(MAX_RANKED_ROWS);
    entries
}

pub struct SummaryInputs<'a> {
    pub target: &'a ParsedReport,
    pub load: &'a LoadReport,
    pub index: &'a HistoryIndex,
    pub duplicate_keys: usize,
    pub metadata: &'a [MetadataRecord],
    pub sheets_written: usize,
    pub renamed_sheets: usize,
}

pub fn generate_summary(inputs: &SummaryInputs<'_>) -> RunSummary {
    let span = inputs.index.weekend_span();
    RunSummary {
        target_weekend: inputs.target.report_date.token().to_string(),
        reports_indexed: inputs.load.files_loaded,
        reports_skipped: inputs.load.files_skipped,
        rows_indexed: inputs.index.len(),
        rows_skipped: inputs.load.rows_skipped,
        duplicate_keys: inputs.duplicate_keys,
        sheets_written: inputs.sheets_written,
        lookup_failures: inputs.metadata.iter().filter(|m| m.is_failure()).count(),
        renamed_sheets: inputs.renamed_sheets,
        earliest_weekend: span.map(|(lo, _)| lo),
        latest_weekend: span.map(|(_, hi)| hi),
    }
}
