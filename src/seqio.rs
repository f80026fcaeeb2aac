//! **FASTQ** record stream on top of `needletail`.
//!
//! ### Design
//! - One logical record is exactly four lines: `@header`, sequence, `+separator`, quality.
//! - Record framing and format sniffing come from needletail; FASTA input is rejected.
//! - The reader is a lazy, finite [`Iterator`] over [`RawRecord`]s; it is not restartable.
//! - An empty input is a valid stream with no records.
//!
//! ### Errors
//! Structural problems surface as [`Error::MalformedRecord`] carrying the 1-based line
//! number of the offending line. Once an error has been yielded the iterator is fused.
//!
//! ### Example
//! ```
//! use lrstats::seqio::FastqReader;
//! let data = "@r1 ch=7\nACGT\n+\n!!!!\n";
//! let recs: Vec<_> = FastqReader::new(data.as_bytes()).collect::<Result<_, _>>().unwrap();
//! assert_eq!(recs.len(), 1);
//! assert_eq!(recs[0].seq, b"ACGT");
//! ```

use std::io::{self, Read};
use std::path::Path;

use needletail::errors::{ParseError, ParseErrorKind};
use needletail::parser::FastxReader;
use needletail::{parse_fastx_file, parse_fastx_reader};

use crate::error::{Error, Result};

/// A raw record as read from the stream, before any metric derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Line number of the `@` header line.
    pub line: usize,
    /// Header line without the leading `@` (name plus optional comment).
    pub header: String,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
}

/// Streaming FASTQ reader.
pub struct FastqReader<'a> {
    inner: Option<Box<dyn FastxReader + 'a>>,
    /// Error raised while sniffing the input, yielded on the first `next`.
    pending: Option<Error>,
    next_line: usize,
}

/// Open a FASTQ file on disk.
pub fn open<P: AsRef<Path>>(path: P) -> Result<FastqReader<'static>> {
    match parse_fastx_file(path.as_ref()) {
        Err(e) if matches!(e.kind, ParseErrorKind::Io) => Err(convert(e)),
        parsed => Ok(FastqReader::from_parsed(parsed)),
    }
}

impl<'a> FastqReader<'a> {
    pub fn new<R: Read + Send + 'a>(inner: R) -> Self {
        Self::from_parsed(parse_fastx_reader(inner))
    }

    fn from_parsed(parsed: std::result::Result<Box<dyn FastxReader + 'a>, ParseError>) -> Self {
        let (inner, pending) = match parsed {
            Ok(r) => (Some(r), None),
            Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => (None, None),
            Err(e) => (None, Some(convert(e))),
        };
        FastqReader { inner, pending, next_line: 1 }
    }
}

/// Map a needletail error onto a line-numbered record error.
fn convert(e: ParseError) -> Error {
    let line = e.position.line as usize;
    match e.kind {
        ParseErrorKind::Io => Error::Io(io::Error::other(e.msg)),
        ParseErrorKind::UnknownFormat => Error::MalformedRecord {
            line: line.max(1),
            msg: "header line does not start with '@'".to_string(),
        },
        // Reported at the record start; point at the quality line instead.
        ParseErrorKind::UnequalLengths => Error::MalformedRecord { line: line + 3, msg: e.msg },
        _ => Error::MalformedRecord { line, msg: e.msg },
    }
}

impl Iterator for FastqReader<'_> {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(e) = self.pending.take() {
            return Some(Err(e));
        }
        let inner = self.inner.as_mut()?;
        let item = match inner.next()? {
            Ok(rec) => {
                let line = self.next_line;
                match rec.qual() {
                    Some(qual) => Ok(RawRecord {
                        line,
                        header: String::from_utf8_lossy(rec.id()).into_owned(),
                        seq: rec.seq().to_vec(),
                        qual: qual.to_vec(),
                    }),
                    None => Err(Error::MalformedRecord {
                        line,
                        msg: "expected a FASTQ record, found FASTA".to_string(),
                    }),
                }
            }
            Err(e) => Err(convert(e)),
        };
        self.next_line += 4;
        if item.is_err() {
            self.inner = None;
        }
        Some(item)
    }
}

#[cfg(test)]
mod seqio_tests {
    use super::*;

    fn parse(data: &str) -> Result<Vec<RawRecord>> {
        FastqReader::new(data.as_bytes()).collect()
    }

    #[test]
    fn reads_consecutive_records_with_line_numbers() {
        let recs = parse("@a ch=1\nAC\n+\n!!\n@b\nGGT\n+b\n#$%\n").unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].line, 1);
        assert_eq!(recs[0].header, "a ch=1");
        assert_eq!(recs[1].line, 5);
        assert_eq!(recs[1].qual, b"#$%");
    }

    #[test]
    fn tolerates_crlf_and_trailing_blank_line() {
        let recs = parse("@a\r\nACGT\r\n+\r\nIIII\r\n\r\n").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].seq, b"ACGT");
        assert_eq!(recs[0].qual, b"IIII");
    }

    #[test]
    fn zero_length_read_is_valid() {
        let recs = parse("@empty\n\n+\n\n@b\nA\n+\n!\n").unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs[0].seq.is_empty());
        assert_eq!(recs[1].seq, b"A");
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn length_mismatch_is_malformed_record() {
        let err = parse("@a\nACGT\n+\n!!!\n").unwrap_err();
        match err {
            Error::MalformedRecord { line, .. } => assert_eq!(line, 4),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_header_marker_is_malformed_record() {
        let err = parse("@a\nA\n+\n!\nb\nA\n+\n!\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 5, .. }));
    }

    #[test]
    fn missing_separator_marker_is_malformed_record() {
        let err = parse("@a\nA\n-\n!\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 3, .. }));
    }

    #[test]
    fn truncated_record_reports_quality_line() {
        let err = parse("@a\nACGT\n+\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 4, .. }));
    }

    #[test]
    fn fasta_input_is_rejected() {
        let err = parse(">a\nACGT\n").unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn iterator_is_fused_after_error() {
        let mut r = FastqReader::new("x\n".as_bytes());
        assert!(r.next().unwrap().is_err());
        assert!(r.next().is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(open(dir.path().join("absent.fastq")), Err(Error::Io(_))));
    }
}
