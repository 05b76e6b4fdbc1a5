//! covmap - Decode and summarize coverage-map rows
//!
//! This tool reads rows exported from a coverage-map table (one JSON object
//! per line), decodes the statement, function, and branch map columns, and
//! prints a per-row summary or the decoded records as JSON lines.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use covmap_core::{
    AssemblerConfig, CoverageRecord, DecoderConfig, JsonLinesSource, RecordAssembler, RecordSource,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Decode and summarize coverage-map rows
#[derive(Parser, Debug)]
#[command(name = "covmap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Maximum number of rows to decode per input file (0 = unlimited)
    #[arg(long, default_value = "0")]
    limit: usize,

    /// Number of entries to list per map in the summary
    #[arg(long, default_value = "5")]
    preview: usize,

    /// Maximum number of entries to decode per map (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_entries: usize,

    /// Reject rows whose maps contain unparsable fragments
    #[arg(long, env = "COVMAP_STRICT")]
    strict: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a JSON-lines file of rows
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of JSON-lines files to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for decoded records
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable counts and a preview of each map
    Summary,
    /// One decoded record per line as JSON
    Json,
}

/// Totals across every processed row
#[derive(Debug, Default)]
struct RunStats {
    rows: usize,
    rows_skipped: usize,
    entries: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let assembler = RecordAssembler::with_config(
        AssemblerConfig::new().decoder(
            DecoderConfig::new()
                .strict(cli.strict)
                .max_entries(cli.max_entries),
        ),
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut stats = RunStats::default();

    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &assembler, file, &mut out, &mut stats)?;
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &assembler, directory, &mut out, &mut stats)?;
    } else {
        bail!("Either --file or --directory must be specified")
    }

    info!(
        "Summary: {} row(s) decoded, {} skipped, {} map entries",
        stats.rows, stats.rows_skipped, stats.entries
    );

    Ok(())
}

/// Process a single rows file
fn process_single_file(
    cli: &Cli,
    assembler: &RecordAssembler,
    file: &Path,
    out: &mut impl Write,
    stats: &mut RunStats,
) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    process_rows_file(cli, assembler, file, out, stats)
}

/// Process every rows file under a directory
fn process_directory(
    cli: &Cli,
    assembler: &RecordAssembler,
    directory: &Path,
    out: &mut impl Write,
    stats: &mut RunStats,
) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut files_processed = 0;

    for entry in WalkDir::new(directory)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || !is_rows_file(path) {
            trace!("Skipping: {}", path.display());
            continue;
        }

        debug!("Processing rows file: {}", path.display());
        if let Err(e) = process_rows_file(cli, assembler, path, out, stats) {
            // Log error but continue with other files
            warn!("Error processing {}: {:#}", path.display(), e);
        }
        files_processed += 1;
    }

    info!("Processed {} file(s)", files_processed);
    Ok(())
}

/// Rows files are `.jsonl`/`.json`, not hidden
fn is_rows_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false);

    let extension_ok = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_lowercase().as_str(), "jsonl" | "json"))
        .unwrap_or(false);

    !hidden && extension_ok
}

/// Decode the rows of one file and write them out
fn process_rows_file(
    cli: &Cli,
    assembler: &RecordAssembler,
    path: &Path,
    out: &mut impl Write,
    stats: &mut RunStats,
) -> Result<()> {
    let mut source = JsonLinesSource::open(path)
        .with_context(|| format!("Failed to open rows file: {}", path.display()))?;

    let mut decoded = 0;

    loop {
        if cli.limit > 0 && decoded >= cli.limit {
            debug!("Row limit {} reached for {}", cli.limit, path.display());
            break;
        }

        let row = match source.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) if e.is_recoverable() => {
                warn!("{}: {:#}", path.display(), anyhow::Error::new(e));
                stats.rows_skipped += 1;
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let record = match assembler.assemble(&row) {
            Ok(record) => record,
            Err(e) => {
                warn!("{}: row {}: {}", path.display(), row.hash, e);
                stats.rows_skipped += 1;
                continue;
            }
        };

        match cli.format {
            OutputFormat::Summary => write_summary(out, &record, cli.preview)?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, &record)
                    .with_context(|| format!("Failed to serialize record {}", record.hash))?;
                writeln!(out)?;
            }
        }

        decoded += 1;
        stats.rows += 1;
        stats.entries += record.summary().total();
    }

    Ok(())
}

/// Write counts and the first `preview` entries of each primary map
fn write_summary(out: &mut impl Write, record: &CoverageRecord, preview: usize) -> Result<()> {
    let summary = record.summary();
    let timestamp = record
        .timestamp
        .format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .context("Failed to format timestamp")?;

    writeln!(out, "Hash: {}", record.hash)?;
    writeln!(out, "Time: {}", timestamp)?;
    writeln!(out, "Statements: {}", summary.statements)?;
    writeln!(out, "Functions: {}", summary.functions)?;
    writeln!(out, "Branches: {}", summary.branches)?;
    writeln!(out, "Restore statements: {}", summary.restore_statements)?;
    writeln!(out, "Restore functions: {}", summary.restore_functions)?;
    writeln!(out, "Restore branches: {}", summary.restore_branches)?;
    writeln!(out, "Total entries: {}", summary.total())?;

    if preview == 0 {
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "\nStatement map:")?;
    for (key, stmt) in record.statement_map.iter().take(preview) {
        writeln!(
            out,
            "  {}: line {}, column {}, length {}, count {}",
            key, stmt.line, stmt.column, stmt.length, stmt.count
        )?;
    }
    write_remaining(out, record.statement_map.len(), preview)?;

    writeln!(out, "\nFunction map:")?;
    for (key, func) in record.fn_map.iter().take(preview) {
        writeln!(out, "  {}: {} (line {})", key, func.name, func.line)?;
        writeln!(
            out,
            "    start {:?}, end {:?}",
            func.start_pos, func.end_pos
        )?;
    }
    write_remaining(out, record.fn_map.len(), preview)?;

    writeln!(out, "\nBranch map:")?;
    for (key, branch) in record.branch_map.iter().take(preview) {
        writeln!(
            out,
            "  {}: type {}, line {}, position {:?}, {} path(s)",
            key,
            branch.kind,
            branch.line,
            branch.position,
            branch.paths.len()
        )?;
        for (i, path) in branch.paths.iter().take(3).enumerate() {
            writeln!(out, "    path {}: {:?}", i, path)?;
        }
        if branch.paths.len() > 3 {
            writeln!(out, "    ... {} more path(s)", branch.paths.len() - 3)?;
        }
    }
    write_remaining(out, record.branch_map.len(), preview)?;

    writeln!(out)?;
    Ok(())
}

fn write_remaining(out: &mut impl Write, len: usize, shown: usize) -> io::Result<()> {
    if len == 0 {
        writeln!(out, "  (empty)")
    } else if len > shown {
        writeln!(out, "  ... {} more", len - shown)
    } else {
        Ok(())
    }
}
