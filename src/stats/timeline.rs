//! Cumulative yield over run time.

use crate::table::Table;

/// `(elapsed_hours, cumulative_bases)` for every timed read, in table order.
///
/// Elapsed time is measured from the earliest `start_time` in the table. Reads
/// without a timestamp are not part of the series; a table with no timestamps
/// gives an empty series.
pub fn cumulative_bases_by_hour(table: &Table) -> Vec<(f64, u64)> {
    let Some(t0) = table.iter().filter_map(|r| r.start_time).min() else {
        return Vec::new();
    };
    let mut running = 0u64;
    table
        .iter()
        .filter_map(|r| r.start_time.map(|t| (t, r.length)))
        .map(|(t, len)| {
            running += len;
            let secs = (t - t0).num_milliseconds() as f64 / 1000.0;
            (secs / 3600.0, running)
        })
        .collect()
}
