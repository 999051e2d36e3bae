/// ExceedanceLevel, StationSeries, LevelCounts, ZoneSnapshot, error types
///
/// Core data types for the Madrid NO2 episode escalation service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no logic and no I/O — only types and their (de)serialization.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Pollutant magnitude codes
// ---------------------------------------------------------------------------

/// Magnitude code for nitrogen dioxide in the municipal hourly feed, in µg/m³.
pub const MAGNITUDE_NO2: u8 = 8;

/// Magnitude code for particles under 10 µm, in µg/m³.
pub const MAGNITUDE_PM10: u8 = 10;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// One station's hourly concentration series for a single calendar day.
///
/// Produced by an `ingest` source from one row of the hourly feed. The
/// vector is positional: index 0 is the 00:00-01:00 hour. Hours the feed
/// has not validated yet (or that are missing outright) are carried as
/// `f64::NAN`, which compares false against every threshold, so a run of
/// consecutive exceedances can never bridge a gap in the data.
#[derive(Debug, Clone, PartialEq)]
pub struct StationSeries {
    /// Full station code, e.g. "28079008".
    pub station_code: String,
    pub samples: Vec<f64>,
}

impl StationSeries {
    pub fn new(station_code: impl Into<String>, samples: Vec<f64>) -> Self {
        StationSeries {
            station_code: station_code.into(),
            samples,
        }
    }

    /// Number of hours carrying a validated measurement.
    pub fn validated_samples(&self) -> usize {
        self.samples.iter().filter(|v| !v.is_nan()).count()
    }
}

// ---------------------------------------------------------------------------
// Exceedance levels
// ---------------------------------------------------------------------------

/// Episode protocol levels, in ascending order of severity.
///
/// A station resolves to at most one level per day; a station under every
/// threshold has no level at all (`Option<ExceedanceLevel>` with `None`).
/// The derived `Ord` follows declaration order, so taking the `max` of the
/// levels seen across a day picks the most severe one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExceedanceLevel {
    Preaviso,
    Aviso,
    Alerta,
}

impl ExceedanceLevel {
    /// All levels, least severe first.
    pub const ALL: [ExceedanceLevel; 3] = [
        ExceedanceLevel::Preaviso,
        ExceedanceLevel::Aviso,
        ExceedanceLevel::Alerta,
    ];

    /// The lowercase protocol token, as used in persisted records and logs.
    pub fn token(&self) -> &'static str {
        match self {
            ExceedanceLevel::Preaviso => "preaviso",
            ExceedanceLevel::Aviso => "aviso",
            ExceedanceLevel::Alerta => "alerta",
        }
    }
}

impl std::fmt::Display for ExceedanceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

// ---------------------------------------------------------------------------
// Daily aggregates
// ---------------------------------------------------------------------------

/// How many of a zone's stations reached each level on one calendar day.
///
/// Counts are independent: a station classified at alerta is counted under
/// alerta only. Field names double as the wire tokens of the persisted
/// snapshot records, so renaming them is a data-format change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelCounts {
    #[serde(default)]
    pub preaviso: u32,
    #[serde(default)]
    pub aviso: u32,
    #[serde(default)]
    pub alerta: u32,
}

impl LevelCounts {
    pub fn get(&self, level: ExceedanceLevel) -> u32 {
        match level {
            ExceedanceLevel::Preaviso => self.preaviso,
            ExceedanceLevel::Aviso => self.aviso,
            ExceedanceLevel::Alerta => self.alerta,
        }
    }

    /// Counts one more station at `level`.
    pub fn record(&mut self, level: ExceedanceLevel) {
        match level {
            ExceedanceLevel::Preaviso => self.preaviso += 1,
            ExceedanceLevel::Aviso => self.aviso += 1,
            ExceedanceLevel::Alerta => self.alerta += 1,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.preaviso == 0 && self.aviso == 0 && self.alerta == 0
    }
}

/// Per-zone level counts for one calendar date: the unit of persistence
/// and the scene classifier's input.
///
/// Serializes as a flat `zone id → {level → count}` mapping. Every
/// configured zone is present even when none of its stations exceeded
/// anything (an all-zero row), so a missing zone key in an old record can
/// only mean the zone registry changed since that record was written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneSnapshot {
    pub zones: BTreeMap<String, LevelCounts>,
}

impl ZoneSnapshot {
    pub fn insert(&mut self, zone_id: impl Into<String>, counts: LevelCounts) {
        self.zones.insert(zone_id.into(), counts);
    }

    pub fn get(&self, zone_id: &str) -> Option<&LevelCounts> {
        self.zones.get(zone_id)
    }

    /// True if at least one zone counted `min_stations` or more stations
    /// at exactly `level`. This is the primitive every scene rule is
    /// built from.
    pub fn any_zone_at(&self, level: ExceedanceLevel, min_stations: u32) -> bool {
        self.zones
            .values()
            .any(|counts| counts.get(level) >= min_stations)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching or decoding the hourly feed.
#[derive(Debug, PartialEq)]
pub enum ProviderError {
    /// Non-2xx HTTP response from the open-data endpoint.
    HttpStatus(u16),
    /// The request could not be completed (DNS, TLS, timeout, local I/O).
    Transport(String),
    /// The response arrived but was not in the expected hourly-feed shape.
    Malformed(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::HttpStatus(code) => write!(f, "HTTP status {}", code),
            ProviderError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ProviderError::Malformed(msg) => write!(f, "Malformed feed: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Errors raised by the snapshot store.
///
/// A record that simply does not exist is not an error; `SnapshotStore::load`
/// reports absence as `Ok(None)` so that callers never conflate "never
/// written" with "could not be read".
#[derive(Debug, PartialEq)]
pub enum StoreError {
    /// The record (or its directory) could not be written.
    WriteFailed { path: String, detail: String },
    /// The record exists but could not be read.
    ReadFailed { path: String, detail: String },
    /// The record was read but did not parse as a snapshot.
    Corrupted { path: String, detail: String },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::WriteFailed { path, detail } => {
                write!(f, "Failed to write {}: {}", path, detail)
            }
            StoreError::ReadFailed { path, detail } => {
                write!(f, "Failed to read {}: {}", path, detail)
            }
            StoreError::Corrupted { path, detail } => {
                write!(f, "Corrupted snapshot {}: {}", path, detail)
            }
        }
    }
}

impl std::error::Error for StoreError {}

/// A fatal failure of the daily run.
#[derive(Debug, PartialEq)]
pub enum RunError {
    /// The feed request for one zone failed. The run aborts rather than
    /// letting an unreachable zone masquerade as "no stations affected".
    Provider {
        zone_id: String,
        source: ProviderError,
    },
    /// The snapshot store failed; without a durable record of today, the
    /// coming days' escalation would be computed from a hole.
    Store(StoreError),
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::Provider { zone_id, source } => {
                write!(f, "Feed request for {} failed: {}", zone_id, source)
            }
            RunError::Store(err) => write!(f, "Snapshot store error: {}", err),
        }
    }
}

impl std::error::Error for RunError {}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        RunError::Store(err)
    }
}
