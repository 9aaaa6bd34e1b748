//! dirtally: concurrent disk usage tally.
//!
//! Thin binary entry point. All scanning logic lives in `dirtally-core`;
//! this file only parses arguments, sets up logging, and prints the report.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use dirtally_core::model::size::{format_count, format_size};
use dirtally_core::{Propagation, QueueBound, ScanConfig, ScanReport};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PropagationArg {
    /// Push every directory's delta through all of its ancestors.
    Ancestors,
    /// Report each completed subtree to its parent once.
    Reduce,
}

impl From<PropagationArg> for Propagation {
    fn from(arg: PropagationArg) -> Self {
        match arg {
            PropagationArg::Ancestors => Propagation::AncestorChain,
            PropagationArg::Reduce => Propagation::Reduce,
        }
    }
}

/// Total size, file count, and folder count of a directory tree, plus its largest files.
#[derive(Parser, Debug)]
#[command(name = "dirtally", version, about)]
struct Args {
    /// Directory to scan
    #[arg(value_name = "PATH", default_value = ".")]
    path: PathBuf,

    /// Number of worker threads
    #[arg(short = 'w', long, default_value_t = num_workers(), value_name = "NUM")]
    workers: usize,

    /// Job queue capacity (0 = unbounded)
    #[arg(long, default_value_t = dirtally_core::config::DEFAULT_QUEUE_CAPACITY, value_name = "NUM")]
    queue_size: usize,

    /// Number of largest files to list
    #[arg(short = 'k', long = "top", default_value_t = dirtally_core::config::DEFAULT_TOP_K, value_name = "NUM")]
    top: usize,

    /// Follow symbolic links to directories (loops are detected)
    #[arg(short = 'L', long)]
    follow_links: bool,

    /// How subtree totals are folded into ancestors
    #[arg(long, value_enum, default_value = "reduce")]
    propagation: PropagationArg,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging (skipped directories, pool activity)
    #[arg(short = 'v', long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short = 'q', long)]
    quiet: bool,
}

fn num_workers() -> usize {
    ScanConfig::default().workers
}

impl Args {
    fn scan_config(&self) -> ScanConfig {
        let queue = match self.queue_size {
            0 => QueueBound::Unbounded,
            n => QueueBound::Bounded(n),
        };
        ScanConfig::default()
            .with_workers(self.workers)
            .with_queue(queue)
            .with_top_k(self.top)
            .with_follow_links(self.follow_links)
            .with_propagation(self.propagation.into())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else if args.quiet {
        tracing::Level::WARN
    } else {
        tracing::Level::INFO
    };
    // Logs go to stderr so `--json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let scan = dirtally_core::scan(&args.path, &args.scan_config())
        .with_context(|| format!("scanning {}", args.path.display()))?;
    let report = scan.into_report();

    if args.json {
        println!("{}", report.to_json().context("serialising report")?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ScanReport) {
    let totals = report.totals;
    println!(
        "STATS  Size: {} ({} bytes)  Files: {}  Folders: {}",
        format_size(totals.size),
        format_count(totals.size),
        format_count(totals.files),
        format_count(totals.folders),
    );

    if !report.largest.is_empty() {
        println!();
        println!("Largest files:");
        for (rank, file) in report.largest.iter().enumerate() {
            println!("{:>4}. {:>10}  {}", rank + 1, format_size(file.size), file.path.display());
        }
    }

    if report.partial {
        println!();
        println!(
            "Warning: {} director{} could not be read; totals are a lower bound.",
            report.skipped_dirs,
            if report.skipped_dirs == 1 { "y" } else { "ies" }
        );
    }
}
