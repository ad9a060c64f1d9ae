// Orchestration: reports -> history index -> selection -> metadata -> sheets.
//
// Everything is read and assembled before the workbook is opened for
// writing, so a fatal error never leaves a half-written output behind.
use crate::config::Config;
use crate::error::{DuplicateHistoryKey, PipelineError, SheetNameCollision};
use crate::history::HistoryIndex;
use crate::loader::{self, LoadReport, ParsedReport};
use crate::metadata::{self, MetadataLookup};
use crate::output;
use crate::reports::{self, SummaryInputs};
use crate::sheet::{self, OutputSheet, SheetNamer};
use crate::types::{MetadataRecord, RunSummary, SelectionEntry};
use log::{debug, info};
use std::path::Path;

pub struct Assembled {
    pub target: ParsedReport,
    pub load: LoadReport,
    pub index: HistoryIndex,
    pub duplicate_keys: Vec<DuplicateHistoryKey>,
    pub selection: Vec<SelectionEntry>,
    pub metadata: Vec<MetadataRecord>,
    pub sheets: Vec<OutputSheet>,
    pub collisions: Vec<SheetNameCollision>,
}

impl Assembled {
    pub fn summary(&self) -> RunSummary {
        reports::generate_summary(&SummaryInputs {
            target: &self.target,
            load: &self.load,
            index: &self.index,
            duplicate_keys: self.duplicate_keys.len(),
            metadata: &self.metadata,
            sheets_written: self.sheets.len(),
            renamed_sheets: self.collisions.len(),
        })
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Read every report, resolve metadata and build the sheets in memory.
pub fn assemble_workbook<L>(config: &Config, lookup: &L) -> Result<Assembled, PipelineError>
where
    L: MetadataLookup + ?Sized,
{
    let target = loader::load_report(&config.target_report).map_err(|source| {
        PipelineError::TargetReport {
            path: config.target_report.clone(),
            source,
        }
    })?;
    info!(
        "target report {} covers {}",
        config.target_report.display(),
        target.report_date
    );

    let (mut reports, mut load) = loader::load_directory(&config.data_dir)?;
    if !reports.iter().any(|r| same_file(&r.source, &target.source)) {
        debug!(
            "target report is outside {}, indexing it too",
            config.data_dir.display()
        );
        load.files_seen += 1;
        load.files_loaded += 1;
        load.rows_loaded += target.rows.len();
        load.rows_skipped += target.row_errors.len();
        reports.push(target.clone());
    }
    let (index, duplicate_keys) = HistoryIndex::build(&reports);
    info!(
        "history index: {} rows from {} reports",
        index.len(),
        load.files_loaded
    );

    let selection = reports::select_titles(&target);
    if selection.is_empty() {
        return Err(PipelineError::EmptySelection {
            path: config.target_report.clone(),
        });
    }

    let metadata = metadata::resolve_all(
        lookup,
        &selection,
        &config.year_policy(),
        config.lookup.workers,
    );

    let mut namer = SheetNamer::new();
    let sheets: Vec<OutputSheet> = selection
        .iter()
        .zip(&metadata)
        .map(|(entry, record)| {
            let name = namer.assign(&entry.raw_title);
            let history = index.rows_for(&entry.canonical_title);
            debug!("sheet {:?}: {} weekends", name, history.len());
            sheet::assemble(name, &entry.canonical_title, record, &history)
        })
        .collect();
    let collisions = namer.collisions().to_vec();

    Ok(Assembled {
        target,
        load,
        index,
        duplicate_keys,
        selection,
        metadata,
        sheets,
        collisions,
    })
}

/// Write the workbook and whichever exports the config asks for.
pub fn write_outputs(config: &Config, assembled: &Assembled) -> Result<RunSummary, PipelineError> {
    output::write_workbook(&config.output_path, &assembled.sheets)?;
    info!(
        "wrote {} sheets to {}",
        assembled.sheets.len(),
        config.output_path.display()
    );
    if let Some(path) = &config.history_csv {
        output::write_csv(path, &assembled.index.csv_rows())?;
    }
    let summary = assembled.summary();
    if let Some(path) = &config.summary_json {
        output::write_json(path, &summary)?;
    }
    Ok(summary)
}

pub fn run<L>(config: &Config, lookup: &L) -> Result<(Assembled, RunSummary), PipelineError>
where
    L: MetadataLookup + ?Sized,
{
    let assembled = assemble_workbook(config, lookup)?;
    let summary = write_outputs(config, &assembled)?;
    Ok((assembled, summary))
}
