/// Development mode utilities for working with saved feed data
///
/// When the live feed is unavailable, or a past day needs to be reproduced
/// exactly, replay a saved copy of the hourly file instead of fetching.

use std::path::PathBuf;

use crate::ingest::madrid;
use crate::ingest::ReadingSource;
use crate::model::{ProviderError, StationSeries};
use crate::zones::Zone;

/// Replays a saved hourly feed body from disk.
///
/// Capture the file with `curl -o saved_feed.txt <feed url>` on the day of
/// interest and point `replay_file` (or `AQMON_REPLAY_FILE`) at it; the
/// engine then classifies exactly what the feed said that day.
pub struct ReplaySource {
    path: PathBuf,
    magnitude: u8,
}

impl ReplaySource {
    pub fn new(path: impl Into<PathBuf>, magnitude: u8) -> Self {
        ReplaySource {
            path: path.into(),
            magnitude,
        }
    }
}

impl ReadingSource for ReplaySource {
    fn zone_readings(&self, zone: &Zone) -> Result<Vec<StationSeries>, ProviderError> {
        let body = std::fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::Transport(format!("read {}: {}", self.path.display(), e))
        })?;
        madrid::parse_hourly_feed(&body, self.magnitude, &zone.station_codes)
    }

    fn source_name(&self) -> &str {
        "replay"
    }
}
