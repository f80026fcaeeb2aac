//! Header metadata: read name plus the whitespace-separated `key=value` comment.
//!
//! MinKNOW writes headers such as
//! `@0a1b... runid=9c.. read=12 ch=5 start_time=2020-01-01T00:00:00Z flow_cell_id=FAK..`.
//! Only `ch` and `start_time` are interpreted; every other key is kept verbatim in
//! [`ReadHeader::extra`] and never consulted by the statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};

use crate::error::{Error, Result};

/// Header key carrying the 1-based channel id.
pub const CHANNEL_KEY: &str = "ch";
/// Header key carrying the read start timestamp.
pub const START_TIME_KEY: &str = "start_time";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parsed FASTQ header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadHeader {
    pub name: String,
    pub channel: Option<u32>,
    pub start_time: Option<NaiveDateTime>,
    /// Unrecognised `key=value` tokens.
    pub extra: BTreeMap<String, String>,
}

impl ReadHeader {
    /// Parse a header line (without `@`) found at `line`.
    ///
    /// # Examples
    /// ```
    /// let h = lrstats::metadata::ReadHeader::parse("read1 ch=5 start_time=2020-01-01T00:00:00Z", 1).unwrap();
    /// assert_eq!(h.name, "read1");
    /// assert_eq!(h.channel, Some(5));
    /// assert_eq!(h.start_time.unwrap().to_string(), "2020-01-01 00:00:00");
    /// ```
    pub fn parse(header: &str, line: usize) -> Result<Self> {
        let header = header.trim();
        let (name, comment) = header.split_once(char::is_whitespace).unwrap_or((header, ""));
        let mut out = ReadHeader { name: name.to_string(), ..Default::default() };
        for (key, value) in parse_comment(comment, line)? {
            match key {
                CHANNEL_KEY => out.channel = Some(parse_channel(value, line)?),
                START_TIME_KEY => out.start_time = Some(parse_start_time(value, line)?),
                _ => {
                    out.extra.insert(key.to_string(), value.to_string());
                }
            }
        }
        Ok(out)
    }
}

/// Split the comment part of a header into `(key, value)` pairs, in order.
pub fn parse_comment(comment: &str, line: usize) -> Result<Vec<(&str, &str)>> {
    comment.split_whitespace().map(|t| split_token(t, line)).collect()
}

fn split_token(token: &str, line: usize) -> Result<(&str, &str)> {
    token
        .split_once('=')
        .ok_or_else(|| Error::MalformedMetadata { line, token: token.to_string() })
}

/// Parse a `ch=` value; channels are 1-based so zero is rejected.
pub fn parse_channel(value: &str, line: usize) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(ch) if ch > 0 => Ok(ch),
        _ => Err(Error::InvalidChannel { line, value: value.to_string() }),
    }
}

/// Parse a device timestamp such as `2020-01-01T00:00:00Z`.
///
/// The trailing `Z` is dropped and `T` becomes a space before parsing, so the
/// result is a naive UTC timestamp. Fractional seconds are kept. Timestamps with
/// an explicit offset (`2021-08-17T10:50:09.177+01:00`) are normalised to UTC.
pub fn parse_start_time(value: &str, line: usize) -> Result<NaiveDateTime> {
    let plain = value.strip_suffix('Z').unwrap_or(value).replacen('T', " ", 1);
    if let Ok(ts) = NaiveDateTime::parse_from_str(&plain, TIMESTAMP_FORMAT) {
        return Ok(ts);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_utc())
        .map_err(|_| Error::InvalidTimestamp { line, value: value.to_string() })
}

/// Render a timestamp the way it is stored in the table interchange file.
pub fn format_start_time(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp from the table interchange file.
pub fn parse_table_time(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}
