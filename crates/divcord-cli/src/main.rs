//! Divcord CLI
//!
//! Command-line driver for parsing divcord sheet payloads, validating and
//! diffing record snapshots, and maintaining the change timeline.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use divcord_core::{
    aggregate_by_card, assemble_with, build_timeline, diff, import_payload, load_records, load_series,
    parse_plain_grid_csv, pipeline::parse_payload, save_snapshot, slugify, DivcordRecord,
    ParseError, ParseOptions, ReferenceCatalog, Severity, Source, Timeline, TimelineJob,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "divcord")]
#[command(about = "Divination card drop-source sheet tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a spreadsheet payload into records
    Parse {
        /// Spreadsheet payload (JSON)
        #[arg(short, long)]
        payload: PathBuf,

        /// Reference catalog (JSON)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Replace the payload's plain grid with a CSV export of the sheet
        #[arg(long)]
        plain_csv: Option<PathBuf>,

        /// Parse options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: Format,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a spreadsheet payload from Google Sheets API responses
    ImportSheets {
        /// `values.get` response covering the plain columns (JSON)
        #[arg(long)]
        values: PathBuf,

        /// `spreadsheets.get` grid data covering the same rows (JSON)
        #[arg(long)]
        grid: PathBuf,

        /// Column layout override (JSON)
        #[arg(long)]
        layout: Option<PathBuf>,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a payload and store the result as today's snapshot
    Snapshot {
        /// Spreadsheet payload (JSON)
        #[arg(short, long)]
        payload: PathBuf,

        /// Reference catalog (JSON)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Parse options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Snapshot directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Snapshot date (defaults to today, UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Validate a persisted snapshot and list its problems
    Validate {
        /// Snapshot file (JSON array of records)
        #[arg(short, long)]
        snapshot: PathBuf,
    },

    /// Diff two snapshots
    Diff {
        /// Older snapshot
        #[arg(long)]
        old: PathBuf,

        /// Newer snapshot
        #[arg(long)]
        new: PathBuf,

        /// Roll changes up per card
        #[arg(long)]
        by_card: bool,

        /// Output file path (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild the timeline from a directory of daily snapshots
    Timeline {
        /// Timeline job file (JSON)
        #[arg(short, long)]
        job: PathBuf,
    },

    /// Create a timeline job file template
    CreateJob {
        /// Output path for the job file
        #[arg(short, long)]
        output: PathBuf,

        /// Snapshot directory
        #[arg(long)]
        snapshots_dir: PathBuf,

        /// Where the timeline is written
        #[arg(long)]
        timeline: PathBuf,

        /// Only use snapshots from this date on
        #[arg(long)]
        since: Option<NaiveDate>,
    },

    /// Print the URL slug of each argument
    Slugify {
        /// Strings to slugify
        #[arg(required = true)]
        text: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("divcord_core={level},divcord={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(command: Commands) -> divcord_core::Result<()> {
    match command {
        Commands::Parse {
            payload,
            catalog,
            plain_csv,
            options,
            format,
            output,
        } => cmd_parse(&payload, &catalog, plain_csv.as_deref(), options.as_deref(), format, output.as_deref()),
        Commands::ImportSheets {
            values,
            grid,
            layout,
            output,
        } => cmd_import_sheets(&values, &grid, layout.as_deref(), output.as_deref()),
        Commands::Snapshot {
            payload,
            catalog,
            options,
            dir,
            date,
        } => cmd_snapshot(&payload, &catalog, options.as_deref(), &dir, date),
        Commands::Validate { snapshot } => cmd_validate(&snapshot),
        Commands::Diff {
            old,
            new,
            by_card,
            output,
        } => cmd_diff(&old, &new, by_card, output.as_deref()),
        Commands::Timeline { job } => cmd_timeline(&job),
        Commands::CreateJob {
            output,
            snapshots_dir,
            timeline,
            since,
        } => cmd_create_job(&output, snapshots_dir, timeline, since),
        Commands::Slugify { text } => {
            for s in &text {
                println!("{}", slugify(s));
            }
            Ok(())
        }
    }
}

fn read_file(path: &Path) -> divcord_core::Result<String> {
    fs::read_to_string(path).map_err(|e| divcord_core::Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}

fn open_output(output: Option<&Path>) -> divcord_core::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    })
}

fn load_options(path: Option<&Path>) -> divcord_core::Result<ParseOptions> {
    match path {
        Some(path) => ParseOptions::load(path),
        None => Ok(ParseOptions::default()),
    }
}

/// Parse payload + catalog files into records and errors
fn parse_files(
    payload_path: &Path,
    catalog_path: &Path,
    plain_csv: Option<&Path>,
    options: &ParseOptions,
) -> divcord_core::Result<(Vec<DivcordRecord>, Vec<ParseError>)> {
    let mut payload = parse_payload(&read_file(payload_path)?)?;
    if let Some(csv_path) = plain_csv {
        payload.plain = parse_plain_grid_csv(&read_file(csv_path)?, &csv_path.display().to_string())?;
    }
    let catalog = ReferenceCatalog::load(catalog_path)?;

    let assembly = assemble_with(&payload, &catalog, options);
    Ok((assembly.records, assembly.errors))
}

fn report_errors(errors: &[ParseError]) {
    if errors.is_empty() {
        return;
    }

    let fatal = errors
        .iter()
        .filter(|e| e.severity() == Severity::RowFatal)
        .count();
    eprintln!(
        "{} problems ({} rows dropped, {} fields recovered):",
        errors.len(),
        fatal,
        errors.len() - fatal
    );
    for error in errors {
        eprintln!("  {}", error);
    }
}

fn cmd_parse(
    payload: &Path,
    catalog: &Path,
    plain_csv: Option<&Path>,
    options: Option<&Path>,
    format: Format,
    output: Option<&Path>,
) -> divcord_core::Result<()> {
    let options = load_options(options)?;
    let (records, errors) = parse_files(payload, catalog, plain_csv, &options)?;
    report_errors(&errors);

    let mut writer = open_output(output)?;
    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&records)?;
            writeln!(writer, "{}", json)?;
        }
        Format::Csv => write_records_csv(&mut writer, &records, &payload.display().to_string())?,
    }
    writer.flush()?;

    Ok(())
}

fn join_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn write_records_csv(writer: &mut dyn Write, records: &[DivcordRecord], name: &str) -> divcord_core::Result<()> {
    let to_err = |e: csv::Error| divcord_core::Error::Csv {
        name: name.to_string(),
        source: e,
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer
        .write_record([
            "id",
            "card",
            "greynote",
            "tagHypothesis",
            "confidence",
            "remainingWork",
            "notes",
            "sources",
            "verifySources",
        ])
        .map_err(to_err)?;

    for record in records {
        csv_writer
            .write_record([
                record.id.to_string(),
                record.card.clone(),
                record.greynote.to_string(),
                record.tag_hypothesis.clone().unwrap_or_default(),
                record.confidence.to_string(),
                record.remaining_work.to_string(),
                record.notes.clone().unwrap_or_default(),
                join_sources(&record.sources),
                join_sources(&record.verify_sources),
            ])
            .map_err(to_err)?;
    }
    csv_writer.flush()?;

    Ok(())
}

fn cmd_import_sheets(
    values: &Path,
    grid: &Path,
    layout: Option<&Path>,
    output: Option<&Path>,
) -> divcord_core::Result<()> {
    let layout = layout.map(read_file).transpose()?;
    let payload = import_payload(&read_file(values)?, &read_file(grid)?, layout.as_deref())?;

    let mut writer = open_output(output)?;
    writeln!(writer, "{}", serde_json::to_string_pretty(&payload)?)?;
    writer.flush()?;

    Ok(())
}

fn cmd_snapshot(
    payload: &Path,
    catalog: &Path,
    options: Option<&Path>,
    dir: &Path,
    date: Option<NaiveDate>,
) -> divcord_core::Result<()> {
    let options = load_options(options)?;
    let (records, errors) = parse_files(payload, catalog, None, &options)?;
    report_errors(&errors);

    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let path = save_snapshot(dir, date, &records)?;
    println!("Wrote {} records to {}", records.len(), path.display());

    Ok(())
}

fn cmd_validate(snapshot: &Path) -> divcord_core::Result<()> {
    let (records, errors) = load_records(&read_file(snapshot)?)?;

    println!("File: {}", snapshot.display());
    println!("Valid records: {}", records.len());
    if errors.is_empty() {
        println!("No problems found");
    } else {
        report_errors(&errors);
    }

    Ok(())
}

fn cmd_diff(old: &Path, new: &Path, by_card: bool, output: Option<&Path>) -> divcord_core::Result<()> {
    let (old_records, old_errors) = load_records(&read_file(old)?)?;
    let (new_records, new_errors) = load_records(&read_file(new)?)?;
    if !old_errors.is_empty() || !new_errors.is_empty() {
        warn!(
            old = old_errors.len(),
            new = new_errors.len(),
            "snapshots contain invalid records"
        );
    }

    let changes = diff(&old_records, &new_records);
    let mut writer = open_output(output)?;
    let json = if by_card {
        serde_json::to_string_pretty(&aggregate_by_card(&changes))?
    } else {
        serde_json::to_string_pretty(&changes)?
    };
    writeln!(writer, "{}", json)?;
    writer.flush()?;

    eprintln!(
        "{} added, {} removed, {} modified",
        changes.added.len(),
        changes.removed.len(),
        changes.modified.len()
    );

    Ok(())
}

fn cmd_timeline(job_path: &Path) -> divcord_core::Result<()> {
    let job = TimelineJob::load(job_path)?;
    info!(dir = %job.snapshots_dir.display(), "building timeline");

    let series = load_series(&job.snapshots_dir, job.since)?;
    let timeline: Timeline = build_timeline(&series);
    timeline.save(&job.output)?;

    println!(
        "Timeline: {} snapshots, {} days with changes",
        series.len(),
        timeline.len()
    );
    if let Some(last) = timeline.last_date() {
        println!("Latest change: {}", last);
    }
    println!("Written to {}", job.output.display());

    Ok(())
}

fn cmd_create_job(
    output: &Path,
    snapshots_dir: PathBuf,
    timeline: PathBuf,
    since: Option<NaiveDate>,
) -> divcord_core::Result<()> {
    let job = TimelineJob {
        snapshots_dir,
        output: timeline,
        since,
    };

    job.save(output)?;
    println!("Created job file: {}", output.display());
    println!();
    println!("Edit the file to configure your job, then run:");
    println!("  divcord timeline --job {}", output.display());

    Ok(())
}
