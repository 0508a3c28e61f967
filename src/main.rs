//! fixity - detect silent corruption in a directory tree.
//!
//! Usage:
//!   fixity save <ROOT>     Hash every file and write the baseline snapshot
//!   fixity check <ROOT>    Compare the tree against the baseline
//!   fixity --help          Show help

mod logging;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;

use fixity_core::{DEFAULT_SNAPSHOT_FILE, HashFailure, WalkWarning};
use fixity_verify::{AuditConfig, Auditor, HashAlgorithm, ReconciliationReport};

/// Exit status of a check that found differences. Fatal errors exit with 1.
const EXIT_CHANGED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "fixity",
    version,
    about = "Detect silent corruption in a directory tree",
    long_about = "fixity records a content hash for every file under a root, then \
                  later reports which files changed, appeared or disappeared.\n\n\
                  Run `fixity save <ROOT>` once to write the baseline, and \
                  `fixity check <ROOT>` whenever you want to verify it."
)]
struct Cli {
    /// Log debug output from the audit crates
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Hash the tree and write a fresh baseline snapshot
    Save {
        #[command(flatten)]
        common: CommonArgs,
    },

    /// Compare the tree against the baseline snapshot
    Check {
        #[command(flatten)]
        common: CommonArgs,

        /// Also write the report as JSON to this file
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Root directory to audit
    root: PathBuf,

    /// Snapshot file
    #[arg(short, long, default_value = DEFAULT_SNAPSHOT_FILE)]
    snapshot: PathBuf,

    /// Hash algorithm (sha256, sha512, blake3, sha1, md5)
    #[arg(short, long, default_value = "sha256")]
    algorithm: HashAlgorithm,

    /// Files hashed per batch
    #[arg(long, default_value = "500")]
    batch_size: usize,

    /// Hashing threads (0 = one per core)
    #[arg(short, long, default_value = "0")]
    workers: usize,

    /// Glob pattern to leave out (repeatable)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Give up on a single file after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Treat paths that differ only in case as the same file
    #[arg(long)]
    case_insensitive: bool,
}

impl CommonArgs {
    fn into_config(self, report_path: Option<PathBuf>) -> Result<AuditConfig> {
        AuditConfig::builder()
            .root(self.root)
            .snapshot_path(self.snapshot)
            .report_path(report_path)
            .algorithm(self.algorithm)
            .batch_size(self.batch_size)
            .workers(self.workers)
            .exclude_patterns(self.exclude)
            .file_timeout(self.timeout_secs.map(Duration::from_secs))
            .case_insensitive(self.case_insensitive)
            .build()
            .context("Invalid configuration")
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Command::Save { common } => {
            run_save(common.into_config(None)?)?;
        }
        Command::Check {
            common,
            report,
            format,
        } => {
            let code = run_check(common.into_config(report)?, format)?;
            if code != 0 {
                std::process::exit(code);
            }
        }
    }

    Ok(())
}

/// Write a fresh baseline.
fn run_save(config: AuditConfig) -> Result<()> {
    let auditor = Auditor::new(config).context("Invalid configuration")?;
    let progress = spawn_progress(&auditor);

    let result = auditor.save();
    drop(auditor);
    finish_progress(progress);

    let summary = result.context("Save failed")?;

    let size = std::fs::metadata(&summary.snapshot_path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!();
    println!("{}", "─".repeat(60));
    println!(" Snapshot {} ({})", summary.snapshot_path.display(), format_size(size));
    println!(
        " {} files in {} folders, saved in {:.2}s",
        summary.files_written,
        summary.folders,
        summary.elapsed.as_secs_f64()
    );
    println!("{}", "─".repeat(60));

    print_problems(&summary.failures, &summary.warnings);

    Ok(())
}

/// Check the tree and print the report. Returns the exit status.
fn run_check(config: AuditConfig, format: OutputFormat) -> Result<i32> {
    let report_path = config.report_path.clone();
    let auditor = Auditor::new(config).context("Invalid configuration")?;
    let progress = spawn_progress(&auditor);

    let result = auditor.check();
    drop(auditor);
    finish_progress(progress);

    let outcome = result.context("Check failed")?;

    if let Some(path) = &report_path {
        write_report(path, &outcome.report)?;
        eprintln!("Report written to {}", path.display());
    }

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(60));
            println!(" Fixity Report");
            println!("{}", "─".repeat(60));
            println!(
                " {} files found, {} in baseline, {} re-hashed in {:.2}s",
                outcome.files_found,
                outcome.baseline_entries,
                outcome.files_hashed,
                outcome.elapsed.as_secs_f64()
            );
            println!();

            if outcome.report.is_clean() {
                println!(" No changes since the baseline.");
            } else {
                print_section("Corrupt files", &outcome.report.corrupt);
                print_section("Missing files", &outcome.report.missing);
                print_section("New files", &outcome.report.new);
                print_section("Missing folders", &outcome.report.missing_folders);
                print_section("New folders", &outcome.report.new_folders);
                print_section("Unverified files", &outcome.report.unverified);
            }

            print_problems(&outcome.failures, &outcome.warnings);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        }
    }

    Ok(exit_code(&outcome.report))
}

fn exit_code(report: &ReconciliationReport) -> i32 {
    if report.is_clean() { 0 } else { EXIT_CHANGED }
}

/// Save the report as pretty JSON.
fn write_report(path: &Path, report: &ReconciliationReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Cannot write report to {}", path.display()))
}

/// Print one report bucket, skipping empty ones.
fn print_section<T: std::fmt::Display>(title: &str, entries: &[T]) {
    if entries.is_empty() {
        return;
    }
    println!(" {} ({}):", title, entries.len());
    for entry in entries {
        println!("   {}", entry);
    }
    println!();
}

/// Per-file failures and skipped walk entries.
fn print_problems(failures: &[HashFailure], warnings: &[WalkWarning]) {
    if failures.is_empty() && warnings.is_empty() {
        return;
    }
    println!();
    if !failures.is_empty() {
        println!(" {} file(s) could not be hashed:", failures.len());
        for failure in failures {
            println!("   {} ({})", failure.path, failure.message);
        }
    }
    if !warnings.is_empty() {
        println!(" {} warning(s) during walk:", warnings.len());
        for warning in warnings {
            println!("   {}: {}", warning.path.display(), warning.message);
        }
    }
}

/// Draw a one-line progress counter on an interactive stderr.
fn spawn_progress(auditor: &Auditor) -> Option<JoinHandle<()>> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let mut rx = auditor.subscribe();
    Some(std::thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(progress) => eprint!(
                    "\r {}/{} files, {}/{} folders, {:.0} files/s ",
                    progress.files_done,
                    progress.files_total,
                    progress.folders_done,
                    progress.folders_total,
                    progress.files_per_second()
                ),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    }))
}

fn finish_progress(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if handle.join().is_err() {
            tracing::debug!("Progress thread panicked");
        }
        eprintln!();
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_args() {
        let cli = Cli::try_parse_from([
            "fixity",
            "check",
            "/data",
            "--algorithm",
            "blake3",
            "--exclude",
            "*.tmp",
            "--exclude",
            "cache/**",
            "--report",
            "out.json",
            "--format",
            "json",
        ])
        .unwrap();

        let Command::Check {
            common,
            report,
            format,
        } = cli.command
        else {
            panic!("expected check");
        };
        assert!(matches!(format, OutputFormat::Json));
        let config = common.into_config(report).unwrap();
        assert_eq!(config.algorithm, HashAlgorithm::Blake3);
        assert_eq!(config.exclude_patterns, vec!["*.tmp", "cache/**"]);
        assert_eq!(config.report_path, Some(PathBuf::from("out.json")));
        assert_eq!(config.snapshot_path, PathBuf::from(DEFAULT_SNAPSHOT_FILE));
    }

    #[test]
    fn test_parse_save_defaults() {
        let cli = Cli::try_parse_from(["fixity", "save", "/data", "--timeout-secs", "30"]).unwrap();
        let Command::Save { common } = cli.command else {
            panic!("expected save");
        };
        let config = common.into_config(None).unwrap();
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.file_timeout, Some(Duration::from_secs(30)));
        assert!(!config.case_insensitive);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let cli = Cli::try_parse_from(["fixity", "save", "/data", "--batch-size", "0"]).unwrap();
        let Command::Save { common } = cli.command else {
            panic!("expected save");
        };
        assert!(common.into_config(None).is_err());
    }

    #[test]
    fn test_legacy_algorithms_accepted() {
        for (name, expected) in [("md5", HashAlgorithm::Md5), ("sha1", HashAlgorithm::Sha1)] {
            let cli = Cli::try_parse_from(["fixity", "check", "/data", "-a", name]).unwrap();
            let Command::Check { common, .. } = cli.command else {
                panic!("expected check");
            };
            assert_eq!(common.algorithm, expected);
        }
    }

    #[test]
    fn test_exit_code_for_changed_tree() {
        let mut report = ReconciliationReport::default();
        assert_eq!(exit_code(&report), 0);

        report.missing.push(fixity_core::FilePath::new("gone.txt"));
        assert_eq!(exit_code(&report), 2);
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        assert!(Cli::try_parse_from(["fixity", "save", "/data", "-a", "crc32"]).is_err());
    }
}
