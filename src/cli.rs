//! Command-line dashboard surface (clap derive).
//!
//! The commands read engine outputs and render plain-text tables; no
//! decision logic lives here.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;

use crate::backup::BackupClient;
use crate::config;
use crate::engine::{improvement_trends, score_of, type_metrics};
use crate::export::{export_file_name, merge_file_name, ExportError};
use crate::models::TestRecord;
use crate::state::DashboardState;
use crate::store::{Store, StoreError};

#[derive(Parser)]
#[command(name = "mindmetric", about = "MCCB test-battery analytics dashboard", version)]
pub struct Cli {
    /// Store file path (defaults to ~/Mindmetric/dashboard.db)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Base URL of the optional backup service
    #[arg(long, default_value = config::DEFAULT_BACKUP_URL)]
    pub backup_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import XML result files into the dashboard
    Import {
        /// Result files to import
        files: Vec<PathBuf>,
        /// Skip the best-effort push to the backup service
        #[arg(long)]
        no_backup: bool,
    },
    /// Show the dashboard summary
    Summary,
    /// List individual administrations
    List {
        /// Only show one test type (exact display name)
        #[arg(long)]
        test_type: Option<String>,
        #[arg(long, value_enum, default_value = "date-desc")]
        sort: SortBy,
    },
    /// Export the full state as MCCB_Exported_Results XML
    Export {
        /// Output path (defaults to a timestamped file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Merge all records into one MCCB_Merged_Results XML, preferring the
    /// backup service and falling back to a local file
    Merge {
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write locally without trying the backup service
        #[arg(long)]
        local: bool,
    },
    /// Set the display name stored with exports
    SetName { name: String },
    /// Clear all imported data
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    DateDesc,
    DateAsc,
    ScoreDesc,
    ScoreAsc,
    Type,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    let store_path = cli.store.clone().unwrap_or_else(config::store_path);
    let store = Store::open(&store_path)?;
    let mut state = DashboardState::load(&store);
    let backup = BackupClient::new(&cli.backup_url);

    match cli.command {
        Commands::Import { files, no_backup } => {
            let summary = state.import_files(&files);
            state.persist(&store)?;
            println!(
                "Imported {} test(s) from {} file(s), {} file(s) failed",
                summary.tests_added, summary.files_processed, summary.files_failed
            );
            println!("Collection now holds {} test(s)", state.records().len());
            if !no_backup && !state.is_empty() {
                backup.save_data_best_effort(state.user_name(), state.records(), Utc::now());
            }
        }
        Commands::Summary => print_summary(&state),
        Commands::List { test_type, sort } => print_list(&state, test_type.as_deref(), sort),
        Commands::Export { output } => {
            let now = Utc::now();
            let xml = state.export_xml(now)?;
            let path = output
                .unwrap_or_else(|| PathBuf::from(export_file_name(state.user_name(), now)));
            std::fs::write(&path, xml)?;
            println!("Data exported as {}", path.display());
        }
        Commands::Merge { output, local } => {
            let now = Utc::now();
            let xml = state.merge_xml(now)?;
            let file_name = merge_file_name(state.user_name(), now);
            if !local {
                match backup.save_merged_xml(&xml, &file_name) {
                    Ok(()) => {
                        println!("Merged XML saved to backup service as {file_name}");
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Backup service unavailable, writing locally");
                    }
                }
            }
            let path = output.unwrap_or_else(|| PathBuf::from(&file_name));
            std::fs::write(&path, xml)?;
            println!("Merged XML written to {}", path.display());
        }
        Commands::SetName { name } => {
            state.set_user_name(&name);
            state.persist(&store)?;
            println!("Display name set to {}", state.user_name());
        }
        Commands::Clear { yes } => {
            if !yes {
                println!("This removes all imported data; re-run with --yes to confirm");
                return Ok(());
            }
            state.clear();
            state.persist(&store)?;
            println!("All imported data cleared");
        }
    }

    Ok(())
}

fn print_summary(state: &DashboardState) {
    if state.is_empty() {
        println!("No test data available");
        return;
    }

    let summary = state.summary();
    println!("Tests:        {}", summary.total_tests);
    println!("Test types:   {}", summary.distinct_types);
    if let (Some(earliest), Some(latest)) =
        (&summary.date_range.earliest, &summary.date_range.latest)
    {
        println!("Date range:   {earliest} - {latest}");
    }
    println!("Sessions:     {} complete", summary.complete_count);
    println!("Improvement:  {} tracked administrations", summary.improvement_count);
    println!();
    println!("Unifying score: {}", summary.unifying_score);
    println!("  {}", summary.interpretation);
    println!(
        "Performance bands: {} failed / {} low / {} acceptable",
        summary.bands.failed, summary.bands.low, summary.bands.acceptable
    );

    let metrics = type_metrics(state.records());
    if !metrics.is_empty() {
        println!();
        println!(
            "{:<22} {:>5} {:>7} {:>7} {:>7} {:>7} {:>7}  {}",
            "Test type", "Count", "Mean", "Median", "Min", "Max", "Latest", "Trend"
        );
        for m in &metrics {
            println!(
                "{:<22} {:>5} {:>7.1} {:>7.1} {:>7.1} {:>7.1} {:>7.1}  {}",
                m.test_type.as_str(),
                m.count,
                m.mean,
                m.median,
                m.min,
                m.max,
                m.latest,
                m.trend.as_str()
            );
        }
    }

    let trends = improvement_trends(state.improvement());
    if !trends.is_empty() {
        println!();
        println!(
            "{:<22} {:>7} {:>7} {:>12} {:>6}",
            "Improvement", "First", "Last", "Change", "Tests"
        );
        for t in &trends {
            println!(
                "{:<22} {:>7.1} {:>7.1} {:>11.1}% {:>6}",
                t.test_type.as_str(),
                t.first_score,
                t.last_score,
                t.improvement_percent,
                t.test_count
            );
        }
    }
}

fn print_list(state: &DashboardState, test_type: Option<&str>, sort: SortBy) {
    let mut records: Vec<&TestRecord> = state
        .records()
        .iter()
        .filter(|r| test_type.map_or(true, |t| r.test_type.as_str() == t))
        .collect();

    if records.is_empty() {
        println!("No tests match current filters");
        return;
    }

    match sort {
        SortBy::DateDesc => records.sort_by(|a, b| b.date.cmp(&a.date)),
        SortBy::DateAsc => records.sort_by(|a, b| a.date.cmp(&b.date)),
        SortBy::ScoreDesc => {
            records.sort_by(|a, b| score_of(b).total_cmp(&score_of(a)))
        }
        SortBy::ScoreAsc => records.sort_by(|a, b| score_of(a).total_cmp(&score_of(b))),
        SortBy::Type => records.sort_by(|a, b| a.test_type.as_str().cmp(b.test_type.as_str())),
    }

    println!(
        "{:<12} {:<10} {:<22} {:>7}  {}",
        "Date", "Time", "Type", "Score", "Source"
    );
    for record in records {
        println!(
            "{:<12} {:<10} {:<22} {:>7.1}  {}",
            record.date,
            record.timestamp,
            record.test_type.as_str(),
            score_of(record),
            record.metadata.file_name
        );
    }
}
