use std::path::PathBuf;

use clap::{Parser, Subcommand};
use polars::prelude::*;

use lrstats::report::{self, ReportOpts};
use lrstats::stats::flowcell::DeviceFamily;
use lrstats::StatsConfig;

/// lrstats CLI
#[derive(Parser)]
#[command(name = "lrstats")]
#[command(version)]
#[command(about = "Long-read FASTQ metrics and run statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute aggregate statistics for a FASTQ file or a cached table CSV
    Stats {
        /// Input FASTQ, or a table CSV written by `lrstats table`
        input: PathBuf,
        /// Directory for cached tables (default: next to the input)
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        /// Always parse the FASTQ; neither read nor write the table cache
        #[arg(long)]
        no_cache: bool,
        /// Percentile bounding the zoomed length histogram
        #[arg(long, default_value_t = 90.0)]
        percentile: f64,
        /// Flow-cell family (minion, promethion, flongle); inferred when omitted
        #[arg(long)]
        device: Option<DeviceFamily>,
        /// Threads (None = all)
        #[arg(long)]
        threads: Option<usize>,
        /// Write all aggregates to a JSON file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Write the per-read table of a FASTQ file as CSV
    Table {
        /// Input FASTQ
        input: PathBuf,
        /// Output CSV (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Threads (None = all)
        #[arg(long)]
        threads: Option<usize>,
    },

    /// List supported flow-cell layouts
    Devices,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Stats { input, cache_dir, no_cache, percentile, device, threads, json } => {
            let opts = ReportOpts {
                input,
                cache_dir,
                use_cache: !no_cache,
                threads,
                json,
                stats: StatsConfig { percentile, device, ..Default::default() },
            };
            report::run_report(opts)?;
        }

        Commands::Table { input, output, threads } => {
            report::write_table(&input, output.as_deref(), threads)?;
        }

        Commands::Devices => {
            cmd_devices()?;
        }
    }

    Ok(())
}

fn cmd_devices() -> PolarsResult<()> {
    let fams = DeviceFamily::ALL;
    let df = df!(
        "device"   => fams.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
        "channels" => fams.iter().map(|f| f.max_channel()).collect::<Vec<u32>>(),
        "rows"     => fams.iter().map(|f| f.grid().0 as u32).collect::<Vec<u32>>(),
        "columns"  => fams.iter().map(|f| f.grid().1 as u32).collect::<Vec<u32>>(),
    )?;
    report::configure_table_display();
    println!("{}", df);
    Ok(())
}
