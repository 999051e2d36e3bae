//! Zone-level aggregation of station classifications.

use std::collections::HashSet;

use crate::alert::thresholds;
use crate::model::{LevelCounts, StationSeries};
use crate::zones::Zone;

/// Counts how many of `zone`'s stations reached each exceedance level in
/// `readings`.
///
/// Only stations actually configured for the zone participate, and each
/// station is counted once even if the feed repeats its row, so no count
/// can ever exceed the zone's configured station total. Stations with no
/// row in `readings` simply contribute nothing; that is the normal shape
/// of a partially reporting day, not an error.
///
/// `relaxed` is the zone's alerta-window flag, passed through to the
/// per-station classifier.
pub fn count_zone_levels(zone: &Zone, relaxed: bool, readings: &[StationSeries]) -> LevelCounts {
    let mut counts = LevelCounts::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for reading in readings {
        if !zone.has_station(&reading.station_code) {
            // A misdirected row must not inflate this zone.
            continue;
        }
        if !seen.insert(reading.station_code.as_str()) {
            continue;
        }
        if let Some(level) = thresholds::classify_station(&reading.samples, relaxed) {
            counts.record(level);
        }
    }

    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
