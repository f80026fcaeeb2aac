//! Error types for lrstats.
//!
//! Every stage of the pipeline fails fast: the first malformed record, header
//! token or table row aborts the run and is surfaced to the caller with the
//! 1-based line number it was found on.

use thiserror::Error;

use crate::stats::flowcell::DeviceFamily;

/// Result type alias for lrstats operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds raised by the parser, the metadata extractor and the table cache.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural FASTQ problem: truncated record, missing `@`/`+` marker,
    /// or sequence/quality length mismatch.
    #[error("malformed FASTQ record at line {line}: {msg}")]
    MalformedRecord { line: usize, msg: String },

    /// A header comment token without a `key=value` shape.
    #[error("malformed header metadata at line {line}: token `{token}` has no '='")]
    MalformedMetadata { line: usize, token: String },

    /// `ch=` present but not a positive integer.
    #[error("invalid channel at line {line}: `{value}`")]
    InvalidChannel { line: usize, value: String },

    /// `start_time=` present but not a parseable timestamp.
    #[error("invalid start_time at line {line}: `{value}`")]
    InvalidTimestamp { line: usize, value: String },

    /// Channel id outside the valid range of the selected device family.
    #[error("channel {channel} is outside the {family} channel range")]
    ChannelOutOfRange { channel: u32, family: DeviceFamily },

    /// A cached table file that does not follow the interchange schema.
    #[error("malformed table at line {line}: {msg}")]
    MalformedTable { line: usize, msg: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("table serialization error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}
