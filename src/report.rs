//! Run driver behind the `lrstats` binary: obtain the table (cache, CSV or FASTQ),
//! compute the aggregates, print a summary and optionally dump everything as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use polars::prelude::*;

use crate::cache::TableCache;
use crate::seqio;
use crate::stats::{Aggregates, StatsConfig};
use crate::table::{assemble, Table};

#[derive(Debug, Clone)]
pub struct ReportOpts {
    /// FASTQ file, or a table CSV written by `lrstats table`.
    pub input: PathBuf,
    /// Cache directory; `None` keeps entries next to the input.
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
    pub threads: Option<usize>,
    /// Write the aggregates to this JSON file.
    pub json: Option<PathBuf>,
    pub stats: StatsConfig,
}

/// `true` when the path names a table interchange file rather than FASTQ.
pub fn is_table_file(path: &Path) -> bool {
    path.extension().map(|e| e.eq_ignore_ascii_case("csv")).unwrap_or(false)
}

/// Obtain the table for `opts.input`, going through the cache when enabled.
pub fn load_table(opts: &ReportOpts) -> Result<Table> {
    let input = opts.input.as_path();
    if is_table_file(input) {
        let f = File::open(input).with_context(|| format!("failed to open {}", input.display()))?;
        return Table::read_csv(BufReader::new(f)).with_context(|| format!("failed to read table {}", input.display()));
    }
    if opts.use_cache {
        let cache = match &opts.cache_dir {
            Some(d) => TableCache::in_dir(d),
            None => TableCache::alongside_input(),
        };
        return cache
            .load_or_build(input, opts.threads)
            .with_context(|| format!("failed to build table for {}", input.display()));
    }
    let reader = seqio::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    assemble(reader, opts.threads).with_context(|| format!("failed to parse {}", input.display()))
}

pub fn run_report(opts: ReportOpts) -> Result<Aggregates> {
    let table = load_table(&opts)?;
    let agg = Aggregates::compute(&table, &opts.stats).context("failed to compute aggregates")?;

    if let Some(path) = &opts.json {
        let mut w = BufWriter::new(File::create(path).with_context(|| format!("failed to create {}", path.display()))?);
        serde_json::to_writer_pretty(&mut w, &agg)?;
        w.flush()?;
        info!("wrote aggregates to {}", path.display());
    }

    configure_table_display();
    println!("{}", summary_df(&agg)?);
    println!("\n=== Most frequent start/end {}-mers ===", crate::metrics::KMER_LEN);
    println!("{}", kmer_df(&agg)?);
    Ok(agg)
}

/// Write the per-read table for a FASTQ file to `output` (stdout when `None`).
pub fn write_table(input: &Path, output: Option<&Path>, threads: Option<usize>) -> Result<()> {
    let reader = seqio::open(input).with_context(|| format!("failed to open {}", input.display()))?;
    let table = assemble(reader, threads).with_context(|| format!("failed to parse {}", input.display()))?;
    match output {
        Some(p) => {
            let mut w = BufWriter::new(File::create(p).with_context(|| format!("failed to create {}", p.display()))?);
            table.write_csv(&mut w)?;
            w.flush()?;
            info!("wrote {} rows to {}", table.len(), p.display());
        }
        None => table.write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}

fn fmt_opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".to_string())
}

fn fmt_opt_f(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "-".to_string())
}

/// Two-column `metric | value` overview.
pub fn summary_df(agg: &Aggregates) -> PolarsResult<DataFrame> {
    let s = &agg.summary;
    let composition = agg
        .nt_percentages
        .as_ref()
        .map(|c| c.percentages.iter().map(|(b, p)| format!("{b}:{p:.2}%")).collect::<Vec<_>>().join(" "));
    let channels = agg.channel_activity.as_ref().map(|a| format!("{} reads on {}", a.points.len(), a.family));
    let run_hours = agg.cumulative_bases_by_hour.last().map(|(h, _)| *h);

    let rows: Vec<(&str, String)> = vec![
        ("reads", s.reads.to_string()),
        ("total bases", s.total_bases.to_string()),
        ("N50", fmt_opt(agg.n50)),
        ("mean length", fmt_opt_f(s.mean_length)),
        ("median length", fmt_opt_f(s.median_length)),
        ("max length", fmt_opt(s.max_length)),
        ("mean quality", fmt_opt_f(s.mean_quality)),
        ("length cutoff", fmt_opt(agg.length_cutoff)),
        ("composition", fmt_opt(composition)),
        ("channels", fmt_opt(channels)),
        ("run hours", fmt_opt_f(run_hours)),
    ];
    df!(
        "metric" => rows.iter().map(|r| r.0.to_string()).collect::<Vec<_>>(),
        "value"  => rows.iter().map(|r| r.1.clone()).collect::<Vec<_>>(),
    )
}

/// Start and end rankings side by side.
pub fn kmer_df(agg: &Aggregates) -> PolarsResult<DataFrame> {
    let n = agg.kmer_start_top.len().max(agg.kmer_end_top.len());
    let col = |v: &[(String, u64)], i: usize| v.get(i).map(|(k, _)| k.clone());
    let cnt = |v: &[(String, u64)], i: usize| v.get(i).map(|(_, c)| *c);
    df!(
        "rank"        => (1..=n as u32).collect::<Vec<u32>>(),
        "start_kmer"  => (0..n).map(|i| col(&agg.kmer_start_top, i)).collect::<Vec<_>>(),
        "start_count" => (0..n).map(|i| cnt(&agg.kmer_start_top, i)).collect::<Vec<_>>(),
        "end_kmer"    => (0..n).map(|i| col(&agg.kmer_end_top, i)).collect::<Vec<_>>(),
        "end_count"   => (0..n).map(|i| cnt(&agg.kmer_end_top, i)).collect::<Vec<_>>(),
    )
}

/// Show every row and full cell width when printing frames.
pub fn configure_table_display() {
    std::env::set_var("POLARS_FMT_TABLE_FORMATTING", "UTF8_FULL");
    std::env::set_var("POLARS_FMT_MAX_COLS", "100000");
    std::env::set_var("POLARS_FMT_MAX_ROWS", "1000000");
    std::env::set_var("POLARS_FMT_STR_LEN", "100000");
}
