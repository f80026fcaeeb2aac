//! On-disk cache of the per-read table, keyed by the input path.
//!
//! `/data/run1/reads.fastq` is cached as `reads.fastq.<digest>.lrstats.csv`, next to
//! the input or in a dedicated directory, where `<digest>` is the first 16 hex digits
//! of the SHA-256 of the canonical input path. Inputs sharing a file name therefore
//! never share an entry. An entry is reused while it is at least as new as the
//! input; otherwise the table is rebuilt and the entry overwritten.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::seqio;
use crate::table::{assemble, Table};

/// Suffix of every cache entry.
pub const CACHE_SUFFIX: &str = ".lrstats.csv";

#[derive(Clone, Debug, Default)]
pub struct TableCache {
    dir: Option<PathBuf>,
}

impl TableCache {
    /// Cache entries live next to their inputs.
    pub fn alongside_input() -> Self {
        TableCache { dir: None }
    }

    /// Cache entries live in `dir`.
    pub fn in_dir<P: Into<PathBuf>>(dir: P) -> Self {
        TableCache { dir: Some(dir.into()) }
    }

    /// Where the table for `input` is stored.
    pub fn path_for(&self, input: &Path) -> PathBuf {
        let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let file = format!("{name}.{}{CACHE_SUFFIX}", path_digest(input));
        match &self.dir {
            Some(d) => d.join(file),
            None => input.with_file_name(file),
        }
    }

    /// Cached table for `input`, if an entry exists and is not older than the input.
    pub fn load(&self, input: &Path) -> Result<Option<Table>> {
        let path = self.path_for(input);
        if !path.exists() {
            return Ok(None);
        }
        let cached = fs::metadata(&path)?.modified()?;
        let source = fs::metadata(input)?.modified()?;
        if cached < source {
            warn!("cached table {} is older than {}; rebuilding", path.display(), input.display());
            return Ok(None);
        }
        let table = Table::read_csv(BufReader::new(File::open(&path)?))?;
        info!("loaded {} reads from cached table {}", table.len(), path.display());
        Ok(Some(table))
    }

    /// Write `table` as the cache entry for `input`.
    pub fn store(&self, input: &Path, table: &Table) -> Result<PathBuf> {
        let path = self.path_for(input);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("csv.tmp");
        {
            let mut w = BufWriter::new(File::create(&tmp)?);
            table.write_csv(&mut w)?;
            w.flush()?;
        }
        fs::rename(&tmp, &path)?;
        info!("stored table of {} reads at {}", table.len(), path.display());
        Ok(path)
    }

    /// Reuse the cached table or parse `input` and cache the result.
    pub fn load_or_build(&self, input: &Path, threads: Option<usize>) -> Result<Table> {
        if let Some(t) = self.load(input)? {
            return Ok(t);
        }
        let table = assemble(seqio::open(input)?, threads)?;
        self.store(input, &table)?;
        Ok(table)
    }
}

/// Short hex digest of the canonical form of `input` (the path as given if it
/// cannot be resolved).
fn path_digest(input: &Path) -> String {
    let canonical = fs::canonicalize(input).unwrap_or_else(|_| input.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    hasher.finalize()[..8].iter().map(|b| format!("{b:02x}")).collect()
}
