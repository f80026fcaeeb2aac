//! Flow-cell geometry: channel id to `(row, column)` on the physical sensor grid.
//!
//! Three device families are known:
//! - **MinION** (channels 1..=512): fixed wiring table, 32×16 grid
//!   (see [`crate::data::minion`]).
//! - **PromethION** (channels 1..=3000): twelve 250-channel blocks of 25×10 placed
//!   side by side, 25×120 grid.
//! - **Flongle** (channels 1..=128): `channel / 8`, `channel % 8`, 17×8 grid.
//!
//! When no family is given it is inferred from the largest channel in the table:
//! up to 512 is a MinION, anything above is a PromethION. A 128-channel run is
//! therefore only mapped with its own layout when the family is passed explicitly.
//! With an inferred family, reads on channels outside its range are skipped with a
//! warning; with an explicit family they are an error.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::Serialize;

use crate::data::minion::{MINION_COLUMNS, MINION_LAYOUT, MINION_ROWS};
use crate::error::{Error, Result};
use crate::table::Table;

const PROMETHION_BLOCK: u32 = 250;
const PROMETHION_BLOCK_COLUMNS: u32 = 10;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub enum DeviceFamily {
    MinION,
    PromethION,
    Flongle,
}

/// Position on the sensor grid, 0-based.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct GridCoord {
    pub row: u16,
    pub column: u16,
}

impl DeviceFamily {
    pub const ALL: [DeviceFamily; 3] = [DeviceFamily::MinION, DeviceFamily::PromethION, DeviceFamily::Flongle];

    /// Highest valid channel id (ids start at 1).
    pub fn max_channel(self) -> u32 {
        match self {
            DeviceFamily::MinION => 512,
            DeviceFamily::PromethION => 3000,
            DeviceFamily::Flongle => 128,
        }
    }

    /// Grid size as `(rows, columns)`.
    pub fn grid(self) -> (u16, u16) {
        match self {
            DeviceFamily::MinION => (MINION_ROWS, MINION_COLUMNS),
            DeviceFamily::PromethION => (25, 120),
            DeviceFamily::Flongle => (17, 8),
        }
    }

    /// Family implied by the largest observed channel id.
    pub fn infer(max_channel: u32) -> Self {
        if max_channel <= DeviceFamily::MinION.max_channel() {
            DeviceFamily::MinION
        } else {
            DeviceFamily::PromethION
        }
    }

    /// Map a 1-based channel id to its grid position.
    ///
    /// # Examples
    /// ```
    /// use lrstats::stats::flowcell::{DeviceFamily, GridCoord};
    /// let c = DeviceFamily::PromethION.coord(251).unwrap();
    /// assert_eq!(c, GridCoord { row: 0, column: 10 });
    /// ```
    pub fn coord(self, channel: u32) -> Result<GridCoord> {
        if channel == 0 || channel > self.max_channel() {
            return Err(Error::ChannelOutOfRange { channel, family: self });
        }
        let c = match self {
            DeviceFamily::MinION => {
                let (row, column) = MINION_LAYOUT[(channel - 1) as usize];
                GridCoord { row, column }
            }
            DeviceFamily::PromethION => {
                let block = (channel - 1) / PROMETHION_BLOCK;
                let rem = (channel - 1) % PROMETHION_BLOCK;
                GridCoord {
                    row: (rem / PROMETHION_BLOCK_COLUMNS) as u16,
                    column: (rem % PROMETHION_BLOCK_COLUMNS + block * PROMETHION_BLOCK_COLUMNS) as u16,
                }
            }
            DeviceFamily::Flongle => GridCoord { row: (channel / 8) as u16, column: (channel % 8) as u16 },
        };
        Ok(c)
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceFamily::MinION => "MinION",
            DeviceFamily::PromethION => "PromethION",
            DeviceFamily::Flongle => "Flongle",
        };
        f.write_str(s)
    }
}

impl FromStr for DeviceFamily {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minion" | "gridion" => Ok(Self::MinION),
            "promethion" | "p2" => Ok(Self::PromethION),
            "flongle" | "128" => Ok(Self::Flongle),
            other => Err(format!("Unknown device family: {}", other)),
        }
    }
}

/// One read placed on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChannelPoint {
    pub channel: u32,
    pub coord: GridCoord,
}

/// Grid positions for every read with a channel, plus per-cell read counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChannelActivity {
    pub family: DeviceFamily,
    /// One entry per read that carries a channel, in table order.
    pub points: Vec<ChannelPoint>,
    /// `occupancy[row][column]` = reads observed on that cell.
    pub occupancy: Vec<Vec<u64>>,
}

/// Place every channel-bearing read on the flow-cell grid.
///
/// Returns `None` when no read carries a channel. Reads without a channel are
/// skipped, not counted as channel zero.
pub fn channel_activity(table: &Table, family: Option<DeviceFamily>) -> Result<Option<ChannelActivity>> {
    let Some(max) = table.iter().filter_map(|r| r.channel).max() else {
        return Ok(None);
    };
    let explicit = family.is_some();
    let family = family.unwrap_or_else(|| DeviceFamily::infer(max));
    let (rows, cols) = family.grid();
    let mut occupancy = vec![vec![0u64; cols as usize]; rows as usize];
    let mut points = Vec::new();
    let mut skipped = 0usize;
    for channel in table.iter().filter_map(|r| r.channel) {
        let coord = match family.coord(channel) {
            Ok(c) => c,
            Err(e) if explicit => return Err(e),
            Err(_) => {
                skipped += 1;
                continue;
            }
        };
        occupancy[coord.row as usize][coord.column as usize] += 1;
        points.push(ChannelPoint { channel, coord });
    }
    if skipped > 0 {
        warn!("skipped {skipped} reads on channels outside the inferred {family} layout");
    }
    Ok(Some(ChannelActivity { family, points, occupancy }))
}

#[cfg(test)]
mod flowcell_tests {
    use super::*;
    use crate::metrics::{NtCounts, RecordMetrics};
    use std::collections::HashSet;

    fn row(channel: Option<u32>) -> RecordMetrics {
        RecordMetrics {
            length: 10,
            mean_quality: 10.0,
            kmer_start: "ACGT".into(),
            kmer_end: "ACGT".into(),
            nt: NtCounts::default(),
            channel,
            start_time: None,
        }
    }

    #[test]
    fn minion_table_is_complete_bounded_and_injective() {
        let mut seen = HashSet::new();
        for ch in 1..=512u32 {
            let c = DeviceFamily::MinION.coord(ch).unwrap();
            assert!(c.row < MINION_ROWS && c.column < MINION_COLUMNS, "channel {ch} out of grid");
            assert!(seen.insert(c), "channel {ch} collides");
        }
        assert_eq!(seen.len(), 512);
    }

    #[test]
    fn minion_known_positions() {
        assert_eq!(DeviceFamily::MinION.coord(125).unwrap(), GridCoord { row: 0, column: 0 });
        assert_eq!(DeviceFamily::MinION.coord(1).unwrap(), GridCoord { row: 31, column: 0 });
        assert_eq!(DeviceFamily::MinION.coord(512).unwrap(), GridCoord { row: 0, column: 15 });
    }

    #[test]
    fn promethion_formula_and_injectivity() {
        assert_eq!(DeviceFamily::PromethION.coord(1).unwrap(), GridCoord { row: 0, column: 0 });
        assert_eq!(DeviceFamily::PromethION.coord(250).unwrap(), GridCoord { row: 24, column: 9 });
        assert_eq!(DeviceFamily::PromethION.coord(3000).unwrap(), GridCoord { row: 24, column: 119 });
        let (rows, cols) = DeviceFamily::PromethION.grid();
        let mut seen = HashSet::new();
        for ch in 1..=3000u32 {
            let c = DeviceFamily::PromethION.coord(ch).unwrap();
            assert!(c.row < rows && c.column < cols);
            assert!(seen.insert(c));
        }
    }

    #[test]
    fn flongle_layout() {
        assert_eq!(DeviceFamily::Flongle.coord(9).unwrap(), GridCoord { row: 1, column: 1 });
        assert_eq!(DeviceFamily::Flongle.coord(128).unwrap(), GridCoord { row: 16, column: 0 });
    }

    #[test]
    fn out_of_range_channels_are_errors() {
        assert!(matches!(DeviceFamily::MinION.coord(0), Err(Error::ChannelOutOfRange { .. })));
        assert!(matches!(DeviceFamily::MinION.coord(513), Err(Error::ChannelOutOfRange { .. })));
        assert!(matches!(DeviceFamily::Flongle.coord(129), Err(Error::ChannelOutOfRange { .. })));
    }

    #[test]
    fn family_is_inferred_from_max_channel() {
        let t = Table::from_rows(vec![row(Some(5)), row(Some(512))]);
        assert_eq!(channel_activity(&t, None).unwrap().unwrap().family, DeviceFamily::MinION);
        let t = Table::from_rows(vec![row(Some(5)), row(Some(513))]);
        assert_eq!(channel_activity(&t, None).unwrap().unwrap().family, DeviceFamily::PromethION);
    }

    #[test]
    fn explicit_family_overrides_inference() {
        let t = Table::from_rows(vec![row(Some(100))]);
        let a = channel_activity(&t, Some(DeviceFamily::Flongle)).unwrap().unwrap();
        assert_eq!(a.family, DeviceFamily::Flongle);
        assert_eq!(a.points[0].coord, GridCoord { row: 12, column: 4 });
    }

    #[test]
    fn inferred_family_skips_out_of_range_channels() {
        let t = Table::from_rows(vec![row(Some(7)), row(Some(3001))]);
        let a = channel_activity(&t, None).unwrap().unwrap();
        assert_eq!(a.family, DeviceFamily::PromethION);
        assert_eq!(a.points.len(), 1);
        assert_eq!(a.points[0].channel, 7);
        assert_eq!(a.occupancy.iter().flatten().sum::<u64>(), 1);
    }

    #[test]
    fn explicit_family_rejects_out_of_range_channels() {
        let t = Table::from_rows(vec![row(Some(7)), row(Some(600))]);
        let err = channel_activity(&t, Some(DeviceFamily::MinION)).unwrap_err();
        assert!(matches!(err, Error::ChannelOutOfRange { channel: 600, family: DeviceFamily::MinION }));
    }

    #[test]
    fn reads_without_channel_are_excluded() {
        let t = Table::from_rows(vec![row(Some(5)), row(None), row(Some(5))]);
        let a = channel_activity(&t, None).unwrap().unwrap();
        assert_eq!(a.points.len(), 2);
        let c = DeviceFamily::MinION.coord(5).unwrap();
        assert_eq!(a.occupancy[c.row as usize][c.column as usize], 2);
        assert_eq!(a.occupancy.iter().flatten().sum::<u64>(), 2);
    }

    #[test]
    fn no_channels_at_all_is_none() {
        let t = Table::from_rows(vec![row(None)]);
        assert!(channel_activity(&t, None).unwrap().is_none());
        assert!(channel_activity(&Table::default(), None).unwrap().is_none());
    }

    #[test]
    fn parses_family_names() {
        assert_eq!("promethion".parse::<DeviceFamily>().unwrap(), DeviceFamily::PromethION);
        assert!("nanopore".parse::<DeviceFamily>().is_err());
    }
}
