//! treerings - fingerprint directory trees, reconcile them, back up what is missing.
//!
//! Usage:
//!   treerings scan ROOT                  Scan one root and summarize it
//!   treerings analyze BASELINE ROOT...   Classify unique, duplicated and missing files
//!   treerings backup BASELINE ROOT...    Analyze, then copy missing files into BASELINE
//!   treerings show FILE                  Print a saved analysis
//!   treerings --help                     Show help

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tokio::sync::broadcast::error::RecvError;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

use treerings_analyze::{Analysis, analyze};
use treerings_ops::{BackupOutcome, BackupPlan, BackupResult, start_backup};
use treerings_scan::{JwalkScanner, ScanConfig, Tree};

#[derive(Parser)]
#[command(
    name = "treerings",
    version,
    about = "Fingerprint directory trees, reconcile them, and back up what is missing",
    long_about = "treerings fingerprints every file below one or more roots by sampling \
                  at most 1 MiB of its content.\n\n\
                  The first root is the baseline: files whose content only exists in \
                  later roots are reported as missing and can be copied into the \
                  baseline without overwriting anything."
)]
struct Cli {
    /// Include hidden files and directories (names starting with '.')
    #[arg(long, global = true)]
    include_hidden: bool,

    /// Do not follow symbolic links
    #[arg(long, global = true)]
    no_follow: bool,

    /// Threads for scanning several roots (0 = one per core)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease log verbosity
    #[arg(short, long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan one root and show a summary
    Scan {
        /// Root to scan
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Write the tree as JSON to this file ("-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reconcile roots, the first being the baseline
    Analyze {
        /// Roots to reconcile, baseline first
        #[arg(required = true, num_args = 1..)]
        roots: Vec<PathBuf>,

        /// Write the analysis as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Earlier analysis whose fingerprints are reused for unchanged
        /// files; rewritten with the new analysis
        #[arg(long)]
        cache: Option<PathBuf>,

        /// List every unique, duplicated and missing file
        #[arg(short, long)]
        list: bool,
    },

    /// Analyze roots and copy missing files into the baseline
    Backup {
        /// Roots to reconcile, baseline first
        #[arg(required = true, num_args = 2..)]
        roots: Vec<PathBuf>,

        /// Only print what would be copied
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Print a saved analysis
    Show {
        /// Analysis file written by `analyze --output`
        file: PathBuf,

        /// List every unique, duplicated and missing file
        #[arg(short, long)]
        list: bool,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let config = ScanConfig::builder()
        .root(".")
        .include_hidden(cli.include_hidden)
        .follow_symlinks(!cli.no_follow)
        .threads(cli.threads)
        .build()?;

    match cli.command {
        Command::Scan { root, output } => run_scan(&config.with_root(root), output)?,
        Command::Analyze {
            roots,
            output,
            cache,
            list,
        } => run_analyze(&config, &roots, output, cache, list)?,
        Command::Backup { roots, dry_run } => run_backup(&config, &roots, dry_run)?,
        Command::Show { file, list } => run_show(&file, list)?,
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` adds directives on top of -v/-q.
fn init_tracing(verbose: u8, quiet: u8) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(log_level(verbose, quiet).into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err| eyre!("Failed to install log subscriber: {err}"))
}

fn log_level(verbose: u8, quiet: u8) -> Level {
    match 2i16 + i16::from(verbose) - i16::from(quiet) {
        i16::MIN..=0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Scan one root and print or export it.
fn run_scan(config: &ScanConfig, output: Option<PathBuf>) -> Result<()> {
    let tree = with_progress(|scanner| scanner.scan(config))
        .with_context(|| format!("Failed to scan {}", config.root.display()))?;

    match output.as_deref() {
        Some(path) if path == Path::new("-") => {
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Some(path) => {
            std::fs::write(path, serde_json::to_string_pretty(&tree)?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Exported to {}", path.display());
            print_tree_summary(&tree);
        }
        None => print_tree_summary(&tree),
    }

    Ok(())
}

/// Scan and reconcile `roots`, optionally reusing and refreshing a cache.
fn run_analyze(
    config: &ScanConfig,
    roots: &[PathBuf],
    output: Option<PathBuf>,
    cache: Option<PathBuf>,
    list: bool,
) -> Result<()> {
    let priors = match cache.as_deref() {
        Some(path) if path.exists() => match Analysis::load(path) {
            Ok(previous) => previous.trees,
            Err(err) => {
                warn!("Ignoring unreadable cache {}: {}", path.display(), err);
                Vec::new()
            }
        },
        _ => Vec::new(),
    };

    let analysis = scan_and_analyze(config, roots, &priors)?;
    print_analysis(&analysis, Some(config.include_hidden), list);

    for path in output.iter().chain(cache.iter()) {
        analysis
            .save(path)
            .with_context(|| format!("Failed to save analysis to {}", path.display()))?;
    }
    if let Some(path) = &output {
        eprintln!("Analysis saved to {}", path.display());
    }

    Ok(())
}

/// Scan and reconcile `roots`, then copy missing files into the baseline.
fn run_backup(config: &ScanConfig, roots: &[PathBuf], dry_run: bool) -> Result<()> {
    let analysis = scan_and_analyze(config, roots, &[])?;
    print_analysis(&analysis, Some(config.include_hidden), false);

    let plan = BackupPlan::from_analysis(&analysis);
    if plan.is_empty() {
        println!("Nothing to back up.");
        return Ok(());
    }

    println!(
        "Backing up {} missing files ({}) to {}",
        plan.len(),
        format_size(plan.total_bytes()),
        plan.baseline.display()
    );

    if dry_run {
        for job in &plan.jobs {
            println!("cp {}\n  to: {}", job.source.display(), job.destination.display());
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    let complete = runtime.block_on(async move {
        let mut rx = start_backup(plan);
        let mut complete = None;
        while let Some(result) = rx.recv().await {
            match result {
                BackupResult::Progress(progress) => {
                    if let Some(file) = &progress.current_file {
                        println!(
                            "[{:>5.1}%] cp {}",
                            progress.percentage(),
                            file.display()
                        );
                    }
                }
                BackupResult::Item(BackupOutcome::Copied { destination, .. }) => {
                    println!("  to: {}", destination.display());
                }
                BackupResult::Item(BackupOutcome::Failed(err)) => {
                    eprintln!("  failed: {err}");
                }
                BackupResult::Complete(done) => complete = Some(done),
            }
        }
        complete
    });

    let Some(complete) = complete else {
        bail!("Backup stopped before completing");
    };
    println!(
        "{} ({})",
        complete.summary(),
        format_size(complete.bytes_processed)
    );
    if !complete.is_success() {
        bail!("{} files could not be backed up", complete.failed);
    }

    Ok(())
}

/// Print a saved analysis.
fn run_show(file: &Path, list: bool) -> Result<()> {
    let analysis = Analysis::load(file)
        .with_context(|| format!("Failed to load analysis from {}", file.display()))?;

    for tree in &analysis.trees {
        print_tree_summary(tree);
    }
    print_analysis(&analysis, None, list);

    Ok(())
}

/// Scan every root in parallel, then reconcile in argument order.
fn scan_and_analyze(config: &ScanConfig, roots: &[PathBuf], priors: &[Tree]) -> Result<Analysis> {
    let configs: Vec<_> = roots.iter().map(|root| config.with_root(root)).collect();
    let results = with_progress(|scanner| scanner.scan_all(&configs, priors));

    let mut trees = Vec::with_capacity(results.len());
    for (root, result) in roots.iter().zip(results) {
        let tree = result.with_context(|| format!("Failed to scan {}", root.display()))?;
        print_tree_summary(&tree);
        trees.push(tree);
    }

    Ok(analyze(trees)?)
}

/// Run a scan while a background thread reports its progress on stderr.
fn with_progress<T>(scan: impl FnOnce(&JwalkScanner) -> T) -> T {
    let scanner = JwalkScanner::new();
    let mut rx = scanner.subscribe();

    let reporter = thread::spawn(move || {
        let mut stderr = std::io::stderr();
        loop {
            match rx.blocking_recv() {
                Ok(progress) => {
                    let _ = write!(
                        stderr,
                        "\r  {} files, {} dirs, {:.0} files/s",
                        progress.files_scanned,
                        progress.dirs_scanned,
                        progress.files_per_second()
                    );
                    let _ = stderr.flush();
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
        let _ = writeln!(stderr);
    });

    let result = scan(&scanner);
    drop(scanner);
    if reporter.join().is_err() {
        warn!("Progress reporter panicked");
    }
    result
}

fn print_tree_summary(tree: &Tree) {
    println!(
        "{}: {} files in {} directories, {}",
        tree.root.display(),
        tree.file_count(),
        tree.dir_count(),
        format_size(tree.total_size())
    );
    if tree.has_warnings() {
        println!("  {} warning(s) during scan", tree.warnings.len());
        for warning in &tree.warnings {
            info!("{}: {}", warning.path.display(), warning.message);
        }
    }
}

/// Print the banner and, with `list`, every classified path.
fn print_analysis(analysis: &Analysis, include_hidden: Option<bool>, list: bool) {
    println!();
    println!("{}", analysis.summary());
    match include_hidden {
        Some(true) => println!("  Hidden files were included in this analysis."),
        Some(false) => println!("  Hidden files were NOT included in this analysis."),
        None => {}
    }
    println!();

    if !list {
        return;
    }

    println!("Unique files:");
    for path in analysis.sorted_unique() {
        println!("  {}", path.display());
    }
    println!();

    println!("Duplicated files:");
    for (print, paths) in analysis.sorted_duplicates() {
        println!("  {print}");
        for path in paths {
            println!("    {}", path.display());
        }
    }
    println!();

    println!("Missing files:");
    for (root, paths) in &analysis.missing {
        println!("  {}", root.display());
        for path in paths {
            println!("    {}", path.display());
        }
    }
    println!();
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_flags() {
        assert_eq!(log_level(0, 0), Level::INFO);
        assert_eq!(log_level(2, 0), Level::TRACE);
        assert_eq!(log_level(0, 1), Level::WARN);
        assert_eq!(log_level(0, 5), Level::ERROR);
    }

    #[test]
    fn test_second_subscriber_install_is_an_error() {
        // Only this test installs a subscriber in the test binary
        assert!(init_tracing(0, 0).is_ok());
        let err = init_tracing(0, 0).unwrap_err();
        assert!(err.to_string().contains("Failed to install log subscriber"));
    }
}
