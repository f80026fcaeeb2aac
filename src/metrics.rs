//! Per-read metrics: one [`RecordMetrics`] row per FASTQ record.
//!
//! Derivation is pure; the only fallible step is header parsing, which is
//! delegated to [`crate::metadata`].

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::Result;
use crate::metadata::ReadHeader;
use crate::seqio::RawRecord;

/// Length of the start/end k-mers.
pub const KMER_LEN: usize = 4;

/// Phred+33 (Sanger) quality encoding offset.
pub const PHRED_OFFSET: i64 = 33;

/// Occurrence counts of the tracked nucleotide symbols `A`, `G`, `T`, `C`, `U`.
///
/// Anything else (`N`, IUPAC codes, lowercase) is not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NtCounts {
    pub a: u64,
    pub g: u64,
    pub t: u64,
    pub c: u64,
    pub u: u64,
}

impl NtCounts {
    pub fn tally(seq: &[u8]) -> Self {
        let mut n = NtCounts::default();
        for &b in seq {
            match b {
                b'A' => n.a += 1,
                b'G' => n.g += 1,
                b'T' => n.t += 1,
                b'C' => n.c += 1,
                b'U' => n.u += 1,
                _ => {}
            }
        }
        n
    }

    /// Sum over the five tracked symbols.
    pub fn total(&self) -> u64 {
        self.a + self.g + self.t + self.c + self.u
    }

    pub fn add(&mut self, other: &NtCounts) {
        self.a += other.a;
        self.g += other.g;
        self.t += other.t;
        self.c += other.c;
        self.u += other.u;
    }
}

/// Derived metrics for one read; a row of the [`crate::table::Table`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMetrics {
    pub length: u64,
    /// Mean Phred score, rounded to 2 decimals. `0.0` for zero-length reads.
    pub mean_quality: f64,
    pub kmer_start: String,
    pub kmer_end: String,
    pub nt: NtCounts,
    pub channel: Option<u32>,
    pub start_time: Option<NaiveDateTime>,
}

impl RecordMetrics {
    /// Build the row from an already parsed header and the raw sequence/quality.
    pub fn from_parts(header: &ReadHeader, seq: &[u8], qual: &[u8]) -> Self {
        let len = seq.len();
        let head = &seq[..len.min(KMER_LEN)];
        let tail = &seq[len.saturating_sub(KMER_LEN)..];
        RecordMetrics {
            length: len as u64,
            mean_quality: mean_quality(qual),
            kmer_start: String::from_utf8_lossy(head).into_owned(),
            kmer_end: String::from_utf8_lossy(tail).into_owned(),
            nt: NtCounts::tally(seq),
            channel: header.channel,
            start_time: header.start_time,
        }
    }
}

/// Parse the header of `raw` and derive its metrics.
pub fn extract(raw: &RawRecord) -> Result<RecordMetrics> {
    let header = ReadHeader::parse(&raw.header, raw.line)?;
    Ok(RecordMetrics::from_parts(&header, &raw.seq, &raw.qual))
}

/// Arithmetic mean of `byte - 33` over a quality string, rounded to 2 decimals.
pub fn mean_quality(qual: &[u8]) -> f64 {
    if qual.is_empty() {
        return 0.0;
    }
    let sum: i64 = qual.iter().map(|&q| q as i64 - PHRED_OFFSET).sum();
    round2(sum as f64 / qual.len() as f64)
}

pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod metrics_tests {
    use super::*;

    fn raw(header: &str, seq: &str, qual: &str) -> RawRecord {
        RawRecord { line: 1, header: header.into(), seq: seq.into(), qual: qual.into() }
    }

    #[test]
    fn derives_all_fields() {
        let m = extract(&raw("r ch=12 start_time=2020-01-01T00:00:10Z", "ACGTNNAAGU", "+++++5555?")).unwrap();
        assert_eq!(m.length, 10);
        assert_eq!(m.kmer_start, "ACGT");
        assert_eq!(m.kmer_end, "AAGU");
        assert_eq!(m.nt, NtCounts { a: 3, g: 2, t: 1, c: 1, u: 1 });
        assert_eq!(m.nt.total(), 8);
        assert_eq!(m.channel, Some(12));
        assert!(m.start_time.is_some());
        // (5*10 + 4*20 + 30) / 10
        assert_eq!(m.mean_quality, 16.0);
    }

    #[test]
    fn mean_quality_rounds_to_two_decimals() {
        // Q values 0, 0, 1 -> 0.333..
        assert_eq!(mean_quality(b"!!\""), 0.33);
        assert_eq!(mean_quality(b""), 0.0);
    }

    #[test]
    fn short_sequences_give_short_kmers() {
        let m = extract(&raw("r", "AC", "!!")).unwrap();
        assert_eq!(m.kmer_start, "AC");
        assert_eq!(m.kmer_end, "AC");
        let m = extract(&raw("r", "", "")).unwrap();
        assert_eq!(m.kmer_start, "");
        assert_eq!(m.length, 0);
    }

    #[test]
    fn header_errors_propagate() {
        assert!(extract(&raw("r bad", "A", "!")).is_err());
    }

    #[test]
    fn untracked_symbols_are_ignored() {
        let n = NtCounts::tally(b"NRYacgtA");
        assert_eq!(n, NtCounts { a: 1, ..Default::default() });
    }
}
