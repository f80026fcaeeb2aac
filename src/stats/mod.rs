//! Aggregate statistics over a finished [`Table`].
//!
//! Every computation is a pure function of the table; [`Aggregates::compute`]
//! runs them all and bundles the results for rendering or serialization.
//!
//! # Examples
//! ```
//! use lrstats::seqio::FastqReader;
//! use lrstats::stats::{Aggregates, StatsConfig};
//! use lrstats::table::assemble;
//!
//! let fq = "@a ch=1\nACGTACGT\n+\nIIIIIIII\n@b ch=2\nACGA\n+\n5555\n";
//! let table = assemble(FastqReader::new(fq.as_bytes()), Some(1)).unwrap();
//! let agg = Aggregates::compute(&table, &StatsConfig::default()).unwrap();
//! assert_eq!(agg.n50, Some(12));
//! assert_eq!(agg.kmer_start_top.first().map(|(k, n)| (k.as_str(), *n)), Some(("ACGA", 1)));
//! ```

pub mod composition;
pub mod distribution;
pub mod flowcell;
pub mod histogram;
pub mod kmers;
pub mod timeline;

use log::info;
use serde::Serialize;

use crate::error::Result;
use crate::table::Table;
use composition::NtComposition;
use distribution::LengthSummary;
use flowcell::{ChannelActivity, DeviceFamily};
use histogram::JointHistogram;

/// Tunables for [`Aggregates::compute`].
#[derive(Clone, Debug, PartialEq)]
pub struct StatsConfig {
    /// Percentile bounding the zoomed length histogram.
    pub percentile: f64,
    /// Width of the throughput length bins, in nt.
    pub length_bin_width: u64,
    /// Linear bins over mean quality `[0, 40)`.
    pub quality_bins: usize,
    /// Log-spaced bins over read length.
    pub length_bins: usize,
    /// Entries kept in each k-mer ranking.
    pub kmer_top: usize,
    /// Flow-cell family; `None` infers it from the largest channel id.
    pub device: Option<DeviceFamily>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        StatsConfig {
            percentile: 90.0,
            length_bin_width: 100,
            quality_bins: 40,
            length_bins: 50,
            kmer_top: 40,
            device: None,
        }
    }
}

/// Dataset-level results handed to renderers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Aggregates {
    pub summary: LengthSummary,
    pub n50: Option<u64>,
    pub length_cutoff: Option<u64>,
    pub zoomed_length_histogram: Vec<u64>,
    pub length_histogram: Vec<(u64, u64)>,
    pub joint_quality_length_histogram: Option<JointHistogram>,
    pub nt_percentages: Option<NtComposition>,
    pub kmer_start_top: Vec<(String, u64)>,
    pub kmer_end_top: Vec<(String, u64)>,
    pub channel_activity: Option<ChannelActivity>,
    pub cumulative_bases_by_hour: Vec<(f64, u64)>,
}

impl Aggregates {
    /// Compute every aggregate. Fails only when a channel id does not fit the
    /// selected device family.
    pub fn compute(table: &Table, cfg: &StatsConfig) -> Result<Self> {
        let lengths = table.lengths();
        let length_cutoff = distribution::length_cutoff(&lengths, cfg.percentile);
        let agg = Aggregates {
            summary: LengthSummary::of(table),
            n50: distribution::n50(&lengths),
            length_cutoff,
            zoomed_length_histogram: length_cutoff
                .map(|c| distribution::zoomed_length_histogram(&lengths, c))
                .unwrap_or_default(),
            length_histogram: histogram::binned_throughput(table, cfg.length_bin_width),
            joint_quality_length_histogram: histogram::joint_quality_length(table, cfg.quality_bins, cfg.length_bins),
            nt_percentages: composition::nt_composition(table),
            kmer_start_top: kmers::top_start_kmers(table, cfg.kmer_top),
            kmer_end_top: kmers::top_end_kmers(table, cfg.kmer_top),
            channel_activity: flowcell::channel_activity(table, cfg.device)?,
            cumulative_bases_by_hour: timeline::cumulative_bases_by_hour(table),
        };
        info!(
            "aggregated {} reads: {} bases, N50 {:?}",
            agg.summary.reads, agg.summary.total_bases, agg.n50
        );
        Ok(agg)
    }
}
