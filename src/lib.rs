#![forbid(unsafe_code)]
//! # lrstats
//!
//! Per-read metrics and dataset statistics for **long-read nanopore FASTQ**.
//! The crate turns a plain 4-line FASTQ stream into a chronologically ordered
//! table of per-read metrics and computes the aggregates a long-read QC report
//! is built from.
//!
//! ## Pipeline
//! - [`seqio`]: 4-line FASTQ records with line-numbered errors.
//! - [`metadata`]: MinKNOW header comment (`ch=`, `start_time=`, anything else kept aside).
//! - [`metrics`]: length, mean quality, start/end 4-mers, nucleotide counts.
//! - [`table`]: assembly (parallel per batch) sorted by start time, CSV interchange.
//! - [`cache`]: per-input table cache so a dataset is only parsed once.
//! - [`stats`]: N50, percentile cutoff, base-weighted length histogram, joint
//!   quality/length histogram, composition, k-mer ranking, flow-cell layout,
//!   cumulative yield over time.
//!
//! ## Example
//! ```rust
//! let fq = "@r1 ch=5 start_time=2020-01-01T00:00:00Z\nACGTACGTAC\n+\nIIIIIIIIII\n";
//! let table = lrstats::table_from_reader(fq.as_bytes(), Some(1)).unwrap();
//! let agg = lrstats::summarize(&table).unwrap();
//! assert_eq!(agg.summary.reads, 1);
//! assert_eq!(table.rows()[0].channel, Some(5));
//! ```

pub mod cache;
pub mod error;
pub mod metadata;
pub mod metrics;
pub mod report;
pub mod seqio;
pub mod stats;
pub mod table;
pub mod data { pub mod minion; }

use std::io::Read;
use std::path::Path;

pub use error::{Error, Result};
pub use stats::{Aggregates, StatsConfig};
pub use table::Table;

/// Parse a FASTQ file into the per-read table.
pub fn build_table_from_path<P: AsRef<Path>>(path: P, threads: Option<usize>) -> Result<Table> {
    table::assemble(seqio::open(path)?, threads)
}

/// Parse FASTQ from any reader into the per-read table.
pub fn table_from_reader<'a, R: Read + Send + 'a>(reader: R, threads: Option<usize>) -> Result<Table> {
    table::assemble(seqio::FastqReader::new(reader), threads)
}

/// Load a table previously written in the interchange format, skipping parsing.
pub fn load_table<P: AsRef<Path>>(path: P) -> Result<Table> {
    let f = std::fs::File::open(path)?;
    Table::read_csv(std::io::BufReader::new(f))
}

/// All aggregates with default settings.
pub fn summarize(table: &Table) -> Result<Aggregates> {
    Aggregates::compute(table, &StatsConfig::default())
}

/// Crate version string (from `CARGO_PKG_VERSION`).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
