//! Most frequent start and end k-mers.

use std::collections::HashMap;

use crate::table::Table;

/// Count each distinct value and keep the `top` most frequent, count descending.
/// Ties are broken alphabetically so the ranking is deterministic.
pub fn rank<'a, I>(values: I, top: usize) -> Vec<(String, u64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    let mut ranked: Vec<(&str, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(top);
    ranked.into_iter().map(|(k, c)| (k.to_string(), c)).collect()
}

pub fn top_start_kmers(table: &Table, top: usize) -> Vec<(String, u64)> {
    rank(table.iter().map(|r| r.kmer_start.as_str()), top)
}

pub fn top_end_kmers(table: &Table, top: usize) -> Vec<(String, u64)> {
    rank(table.iter().map(|r| r.kmer_end.as_str()), top)
}
