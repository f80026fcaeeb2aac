//! The per-read table: assembly from a FASTQ stream and CSV interchange.
//!
//! ### Design
//! - Records are read sequentially and derived in batches on a local Rayon pool;
//!   `threads = None` uses all logical cores. Batch results keep input order.
//! - The finished table is sorted ascending by `start_time` with a stable sort;
//!   rows without a timestamp go after every timed row, in input order.
//! - Interchange CSV is written with Polars and read back with the `csv` crate.
//!   Columns, in order: `seq_length, mean_quality, kmers_start, kmers_end, nt_A,
//!   nt_G, nt_T, nt_C, nt_U, channels, start_times`.

use std::io::{Read, Write};

use log::{debug, info};
use polars::prelude::*;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::error::{Error, Result};
use crate::metadata::{format_start_time, parse_table_time};
use crate::metrics::{extract, NtCounts, RecordMetrics};
use crate::seqio::{FastqReader, RawRecord};

/// Interchange column names, in file order.
pub const COLUMNS: [&str; 11] = [
    "seq_length",
    "mean_quality",
    "kmers_start",
    "kmers_end",
    "nt_A",
    "nt_G",
    "nt_T",
    "nt_C",
    "nt_U",
    "channels",
    "start_times",
];

/// Records derived per parallel batch.
pub const BATCH_SIZE: usize = 8192;

/// Immutable, chronologically ordered table of per-read metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<RecordMetrics>,
}

impl Table {
    /// Build a table from rows in any order; rows are sorted by start time.
    pub fn from_rows(mut rows: Vec<RecordMetrics>) -> Self {
        sort_chronologically(&mut rows);
        Table { rows }
    }

    pub fn rows(&self) -> &[RecordMetrics] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordMetrics> {
        self.rows.iter()
    }

    pub fn lengths(&self) -> Vec<u64> {
        self.rows.iter().map(|r| r.length).collect()
    }

    pub fn total_bases(&self) -> u64 {
        self.rows.iter().map(|r| r.length).sum()
    }

    /// Columnar view of the table using the interchange schema.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let r = &self.rows;
        let nt = |f: fn(&NtCounts) -> u64| r.iter().map(|m| f(&m.nt)).collect::<Vec<u64>>();
        df!(
            "seq_length"   => r.iter().map(|m| m.length).collect::<Vec<u64>>(),
            "mean_quality" => r.iter().map(|m| m.mean_quality).collect::<Vec<f64>>(),
            "kmers_start"  => r.iter().map(|m| m.kmer_start.clone()).collect::<Vec<String>>(),
            "kmers_end"    => r.iter().map(|m| m.kmer_end.clone()).collect::<Vec<String>>(),
            "nt_A"         => nt(|n| n.a),
            "nt_G"         => nt(|n| n.g),
            "nt_T"         => nt(|n| n.t),
            "nt_C"         => nt(|n| n.c),
            "nt_U"         => nt(|n| n.u),
            "channels"     => r.iter().map(|m| m.channel).collect::<Vec<Option<u32>>>(),
            "start_times"  => r.iter().map(|m| m.start_time.as_ref().map(format_start_time)).collect::<Vec<Option<String>>>(),
        )
    }

    /// Write the interchange CSV (with header row).
    pub fn write_csv<W: Write>(&self, w: W) -> Result<()> {
        let mut df = self.to_dataframe()?;
        CsvWriter::new(w).include_header(true).finish(&mut df)?;
        Ok(())
    }

    /// Read a table previously written by [`Table::write_csv`].
    pub fn read_csv<R: Read>(r: R) -> Result<Table> {
        let mut rdr = ::csv::ReaderBuilder::new().has_headers(true).from_reader(r);
        let headers = rdr.headers()?.clone();
        let mut idx = [0usize; COLUMNS.len()];
        for (slot, name) in idx.iter_mut().zip(COLUMNS) {
            *slot = headers.iter().position(|h| h == name).ok_or_else(|| Error::MalformedTable {
                line: 1,
                msg: format!("missing column `{name}`"),
            })?;
        }

        let mut rows = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec?;
            let line = i + 2;
            let field = |k: usize| rec.get(idx[k]).unwrap_or("");
            let num = |k: usize| -> Result<u64> {
                field(k).parse::<u64>().map_err(|_| Error::MalformedTable {
                    line,
                    msg: format!("`{}` is not an integer: `{}`", COLUMNS[k], field(k)),
                })
            };
            let mean_quality = field(1).parse::<f64>().map_err(|_| Error::MalformedTable {
                line,
                msg: format!("`mean_quality` is not a number: `{}`", field(1)),
            })?;
            let channel = match field(9) {
                "" => None,
                s => Some(s.parse::<u32>().map_err(|_| Error::MalformedTable {
                    line,
                    msg: format!("`channels` is not an integer: `{s}`"),
                })?),
            };
            let start_time = match field(10) {
                "" => None,
                s => Some(parse_table_time(s).ok_or_else(|| Error::MalformedTable {
                    line,
                    msg: format!("`start_times` is not a timestamp: `{s}`"),
                })?),
            };
            rows.push(RecordMetrics {
                length: num(0)?,
                mean_quality,
                kmer_start: field(2).to_string(),
                kmer_end: field(3).to_string(),
                nt: NtCounts { a: num(4)?, g: num(5)?, t: num(6)?, c: num(7)?, u: num(8)? },
                channel,
                start_time,
            });
        }
        Ok(Table::from_rows(rows))
    }
}

/// Stable sort by `start_time`, untimed rows last.
pub fn sort_chronologically(rows: &mut [RecordMetrics]) {
    rows.sort_by_key(|r| (r.start_time.is_none(), r.start_time));
}

/// Consume a FASTQ stream and assemble the full table.
///
/// Fails with the error of the earliest offending record.
pub fn assemble(reader: FastqReader<'_>, threads: Option<usize>) -> Result<Table> {
    let n = threads.unwrap_or_else(num_cpus::get).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(n).build()?;

    let mut rows: Vec<RecordMetrics> = Vec::new();
    let mut batch: Vec<RawRecord> = Vec::with_capacity(BATCH_SIZE);
    for rec in reader {
        match rec {
            Ok(rec) => batch.push(rec),
            Err(e) => {
                // Records before the structural error may hold an earlier failure.
                pool.install(|| extract_batch(&batch))?;
                return Err(e);
            }
        }
        if batch.len() == BATCH_SIZE {
            rows.extend(pool.install(|| extract_batch(&batch))?);
            batch.clear();
            debug!("derived metrics for {} reads", rows.len());
        }
    }
    if !batch.is_empty() {
        rows.extend(pool.install(|| extract_batch(&batch))?);
    }

    info!("assembled table of {} reads on {} threads", rows.len(), n);
    Ok(Table::from_rows(rows))
}

fn extract_batch(batch: &[RawRecord]) -> Result<Vec<RecordMetrics>> {
    let derived: Vec<Result<RecordMetrics>> = batch.par_iter().map(extract).collect();
    derived.into_iter().collect()
}

#[cfg(test)]
mod table_tests {
    use super::*;
    use crate::metadata::parse_start_time;

    const FQ: &str = "\
@r1 ch=3 start_time=2020-01-01T00:10:00Z
ACGTACGT
+
IIIIIIII
@r2
AAA
+
!!!
@r3 ch=512 start_time=2020-01-01T00:00:00Z
GGGGCC
+
555555
@r4 runid=x
UUUU
+
????
";

    fn table() -> Table {
        assemble(FastqReader::new(FQ.as_bytes()), Some(2)).unwrap()
    }

    #[test]
    fn sorted_by_start_time_untimed_last_in_input_order() {
        let t = table();
        let lens: Vec<u64> = t.iter().map(|r| r.length).collect();
        assert_eq!(lens, vec![6, 8, 3, 4]);
        assert!(t.rows()[2].start_time.is_none() && t.rows()[3].start_time.is_none());
    }

    #[test]
    fn first_error_wins() {
        let bad = "@a ch=1\nA\n+\n!\n@b ch=zz\nA\n+\n!\n@c oops\nA\n+\n!\n";
        let err = assemble(FastqReader::new(bad.as_bytes()), Some(4)).unwrap_err();
        assert!(matches!(err, Error::InvalidChannel { line: 5, .. }));
    }

    #[test]
    fn metadata_error_before_truncation_wins() {
        let bad = "@a start_time=never\nA\n+\n!\n@b\nAC\n+\n!\n";
        let err = assemble(FastqReader::new(bad.as_bytes()), Some(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidTimestamp { line: 1, .. }));
    }

    #[test]
    fn empty_input_gives_empty_table() {
        let t = assemble(FastqReader::new("".as_bytes()), Some(1)).unwrap();
        assert!(t.is_empty());
        assert_eq!(t.total_bases(), 0);
    }

    #[test]
    fn csv_round_trip_preserves_rows() {
        let t = table();
        let mut buf: Vec<u8> = Vec::new();
        t.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with(&COLUMNS.join(",")));
        let back = Table::read_csv(buf.as_slice()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn csv_round_trip_keeps_fractional_seconds() {
        let mut row = table().rows()[0].clone();
        row.start_time = Some(parse_start_time("2020-01-01T00:00:00.25Z", 1).unwrap());
        let t = Table::from_rows(vec![row]);
        let mut buf = Vec::new();
        t.write_csv(&mut buf).unwrap();
        assert_eq!(Table::read_csv(buf.as_slice()).unwrap(), t);
    }

    #[test]
    fn empty_table_round_trips() {
        let mut buf = Vec::new();
        Table::default().write_csv(&mut buf).unwrap();
        assert!(Table::read_csv(buf.as_slice()).unwrap().is_empty());
    }

    #[test]
    fn missing_column_is_malformed_table() {
        let err = Table::read_csv("seq_length,mean_quality\n1,2.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line: 1, .. }));
    }

    #[test]
    fn bad_cell_reports_line() {
        let text = format!("{}\n10,1.5,ACGT,ACGT,1,2,3,4,0,x,\n", COLUMNS.join(","));
        let err = Table::read_csv(text.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { line: 2, .. }));
    }
}
