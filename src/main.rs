// Entry point and command-line flow.
//
// A run is a single batch:
// - index every weekly report in the data directory,
// - take the ranked titles of the target weekend,
// - look each title up on OMDb,
// - write one sheet per title with its weekend history underneath.
mod config;
mod error;
mod history;
mod loader;
mod metadata;
mod output;
mod pipeline;
mod reports;
mod sheet;
#[cfg(test)]
mod test_support;
mod title;
mod types;
mod util;

use clap::Parser;
use config::Config;
use error::PipelineError;
use log::error;
use metadata::{ApiKey, OmdbClient};
use pipeline::Assembled;
use std::path::PathBuf;
use std::process::ExitCode;
use types::RunSummary;

#[derive(Parser)]
#[command(about = "Build a per-movie workbook from weekly UK box office reports.")]
struct Args {
    /// TOML config file. Built-in defaults apply when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding the weekly report files.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Report whose ranked titles get a sheet each.
    #[arg(long, value_name = "PATH")]
    target: Option<PathBuf>,

    /// Output workbook.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also export the full history index as CSV.
    #[arg(long, value_name = "PATH")]
    history_csv: Option<PathBuf>,

    /// Also write a JSON run summary.
    #[arg(long, value_name = "PATH")]
    summary_json: Option<PathBuf>,

    /// Number of concurrent metadata lookups.
    #[arg(long)]
    workers: Option<usize>,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Command-line values win over the config file.
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(target) = &self.target {
            config.target_report = target.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if self.history_csv.is_some() {
            config.history_csv = self.history_csv.clone();
        }
        if self.summary_json.is_some() {
            config.summary_json = self.summary_json.clone();
        }
        if let Some(workers) = self.workers {
            config.lookup.workers = workers.max(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let mut clog = colog::default_builder();
    clog.filter(
        None,
        if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        },
    );
    clog.init();
}

fn print_load_summary(assembled: &Assembled) {
    let load = &assembled.load;
    println!(
        "Processing reports... ({} files found, {} indexed, {} history rows)",
        util::format_int(load.files_seen),
        util::format_int(load.files_loaded),
        util::format_int(assembled.index.len())
    );
    if load.files_skipped > 0 || load.rows_skipped > 0 {
        println!(
            "Note: {} files and {} rows skipped due to parse errors.",
            util::format_int(load.files_skipped),
            util::format_int(load.rows_skipped)
        );
    }
    if assembled.index.is_empty() {
        println!("Note: no history rows were indexed.");
    }
    if !assembled.duplicate_keys.is_empty() {
        println!(
            "Note: {} duplicate title/weekend rows ignored (first occurrence kept).",
            util::format_int(assembled.duplicate_keys.len())
        );
    }
    if let Some((first, last)) = assembled.index.weekend_span() {
        println!("History covers weekends {} to {}.", first, last);
    }
    println!();
}

fn print_selection(assembled: &Assembled) {
    println!(
        "Top {} titles for weekend {}\n",
        assembled.selection.len(),
        assembled.target.report_date
    );
    let preview = reports::selection_preview(&assembled.target);
    output::preview_table_rows(&preview, loader::MAX_RANKED_ROWS);
}

fn print_run_summary(assembled: &Assembled, summary: &RunSummary, output_path: &std::path::Path) {
    for (entry, sheet) in assembled.selection.iter().zip(&assembled.sheets) {
        println!(
            "  #{:<2} {:<32} {} weekends",
            entry.rank,
            sheet.name,
            sheet.history_section().len()
        );
    }
    println!();
    if summary.lookup_failures > 0 {
        println!(
            "Note: metadata unavailable for {} of {} titles; their sheets hold the error instead.",
            summary.lookup_failures, summary.sheets_written
        );
    }
    println!(
        "Task output file created successfully: {} ({} sheets)",
        output_path.display(),
        summary.sheets_written
    );
}

fn run(args: &Args) -> Result<(), PipelineError> {
    let mut config = Config::load(args.config.as_deref())?;
    args.apply(&mut config);

    // Fail before touching any report when the key is missing.
    let api_key = ApiKey::from_env(&config.lookup.api_key_env)?;
    let client = OmdbClient::new(&config.lookup.base_url, api_key, config.lookup_timeout());

    let (assembled, summary) = pipeline::run(&config, &client)?;
    print_load_summary(&assembled);
    print_selection(&assembled);
    print_run_summary(&assembled, &summary, &config.output_path);
    if let Some(path) = &config.history_csv {
        println!("(History index exported to {})", path.display());
    }
    if let Some(path) = &config.summary_json {
        println!("(Run summary exported to {})", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
