//! Hourly concentration threshold checking.
//!
//! Classifies one station's day of hourly NO2 samples against the episode
//! protocol: a level is reached when the concentration stays above its
//! threshold for the required number of consecutive hours. Everything here
//! is pure: bad or missing readings degrade to "no exceedance", they
//! never fail the run.

use crate::model::ExceedanceLevel;

// ---------------------------------------------------------------------------
// Protocol constants
// ---------------------------------------------------------------------------

/// Concentration above which an hour counts toward preaviso, in µg/m³.
pub const PREAVISO_THRESHOLD: f64 = 180.0;

/// Concentration above which an hour counts toward aviso, in µg/m³.
pub const AVISO_THRESHOLD: f64 = 200.0;

/// Concentration above which an hour counts toward alerta, in µg/m³.
pub const ALERTA_THRESHOLD: f64 = 400.0;

/// Consecutive hours over the threshold required for preaviso.
pub const PREAVISO_HOURS: usize = 2;

/// Consecutive hours over the threshold required for aviso.
pub const AVISO_HOURS: usize = 3;

/// Consecutive hours over the threshold required for alerta.
pub const ALERTA_HOURS: usize = 3;

/// Shortened alerta requirement for the relaxed zone.
pub const ALERTA_HOURS_RELAXED: usize = 2;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// True if the `len` samples starting at `start` all exceed `threshold`.
///
/// A window that runs past the end of the series never matches, and the
/// comparison is strictly greater than, so a reading sitting exactly on a
/// threshold does not count. NaN samples (unvalidated or missing hours)
/// compare false, which keeps a window from bridging a gap in the data.
fn window_exceeds(samples: &[f64], start: usize, len: usize, threshold: f64) -> bool {
    start + len <= samples.len() && samples[start..start + len].iter().all(|v| *v > threshold)
}

/// The level triggered by the window starting at `start`, if any.
/// Conditions are tried most severe first, so three hours above the alerta
/// threshold report alerta even though they also satisfy aviso.
fn level_at(samples: &[f64], start: usize, relaxed: bool) -> Option<ExceedanceLevel> {
    let alerta_hours = if relaxed {
        ALERTA_HOURS_RELAXED
    } else {
        ALERTA_HOURS
    };

    if window_exceeds(samples, start, alerta_hours, ALERTA_THRESHOLD) {
        Some(ExceedanceLevel::Alerta)
    } else if window_exceeds(samples, start, AVISO_HOURS, AVISO_THRESHOLD) {
        Some(ExceedanceLevel::Aviso)
    } else if window_exceeds(samples, start, PREAVISO_HOURS, PREAVISO_THRESHOLD) {
        Some(ExceedanceLevel::Preaviso)
    } else {
        None
    }
}

/// Classifies one station's day of hourly samples.
///
/// Every starting hour is evaluated and the most severe level found
/// anywhere in the series wins, so an early brush with preaviso cannot
/// mask an alerta block later in the same day. A series shorter than a
/// rule's window can never trigger that rule; an empty series is simply
/// no exceedance.
///
/// `relaxed` selects the two-hour alerta window granted to the sparse
/// zone (see `zones::ZoneRegistry::is_relaxed`).
pub fn classify_station(samples: &[f64], relaxed: bool) -> Option<ExceedanceLevel> {
    (0..samples.len())
        .filter_map(|start| level_at(samples, start, relaxed))
        .max()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
