//! Dataset-wide nucleotide composition.

use serde::Serialize;

use crate::metrics::NtCounts;
use crate::table::Table;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Alphabet {
    Dna,
    Rna,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NtComposition {
    /// `Rna` as soon as a single `U` was observed anywhere.
    pub alphabet: Alphabet,
    pub totals: NtCounts,
    /// `(symbol, percent)` in the order G, C, A, then T or U.
    pub percentages: Vec<(char, f64)>,
}

/// Percentages are taken over the sum of the five tracked symbols, not the raw
/// sequence length. Returns `None` when no tracked symbol was seen at all.
pub fn nt_composition(table: &Table) -> Option<NtComposition> {
    let mut totals = NtCounts::default();
    for r in table.iter() {
        totals.add(&r.nt);
    }
    let sum = totals.total();
    if sum == 0 {
        return None;
    }
    let pct = |n: u64| n as f64 / sum as f64 * 100.0;
    let (alphabet, last) = if totals.u > 0 { (Alphabet::Rna, ('U', totals.u)) } else { (Alphabet::Dna, ('T', totals.t)) };
    let percentages = vec![('G', pct(totals.g)), ('C', pct(totals.c)), ('A', pct(totals.a)), (last.0, pct(last.1))];
    Some(NtComposition { alphabet, totals, percentages })
}

#[cfg(test)]
mod composition_tests {
    use super::*;
    use crate::metrics::RecordMetrics;

    fn row(seq: &[u8]) -> RecordMetrics {
        RecordMetrics {
            length: seq.len() as u64,
            mean_quality: 0.0,
            kmer_start: String::new(),
            kmer_end: String::new(),
            nt: NtCounts::tally(seq),
            channel: None,
            start_time: None,
        }
    }

    #[test]
    fn dna_percentages_sum_to_hundred() {
        let t = Table::from_rows(vec![row(b"ACGTNNNN"), row(b"GGGCCAT")]);
        let c = nt_composition(&t).unwrap();
        assert_eq!(c.alphabet, Alphabet::Dna);
        let sum: f64 = c.percentages.iter().map(|(_, p)| p).sum();
        assert!((sum - 100.0).abs() < 0.01);
        let symbols: Vec<char> = c.percentages.iter().map(|(s, _)| *s).collect();
        assert_eq!(symbols, vec!['G', 'C', 'A', 'T']);
        // N is not in the denominator: 4 G out of 11 tracked bases
        assert!((c.percentages[0].1 - 400.0 / 11.0).abs() < 1e-9);
    }

    #[test]
    fn any_u_switches_to_rna() {
        let t = Table::from_rows(vec![row(b"ACGA"), row(b"GGCU")]);
        let c = nt_composition(&t).unwrap();
        assert_eq!(c.alphabet, Alphabet::Rna);
        assert_eq!(c.percentages[3].0, 'U');
        let sum: f64 = c.percentages.iter().map(|(_, p)| p).sum();
        assert!((sum - 100.0).abs() < 0.01);
    }

    #[test]
    fn nothing_tracked_is_none() {
        assert!(nt_composition(&Table::default()).is_none());
        assert!(nt_composition(&Table::from_rows(vec![row(b"NNNN")])).is_none());
    }
}
