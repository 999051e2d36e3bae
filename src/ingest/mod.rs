/// Station-reading acquisition for the escalation service.
///
/// The engine never talks HTTP itself: it asks a `ReadingSource` for one
/// zone's hourly series at a time and classifies whatever comes back.
/// The live implementation is `madrid::MadridOpenData`; `dev_mode` offers
/// a replay source over a saved copy of the feed.

pub mod madrid;

use crate::model::{ProviderError, StationSeries};
use crate::zones::Zone;

/// Where one zone's hourly station series come from.
///
/// One call covers one zone: the zone's configured station codes and the
/// source's pollutant channel are the whole request. Implementations do
/// not retry; rerunning a failed day belongs to whatever schedules the
/// job, not to the source.
pub trait ReadingSource {
    /// Fetches today's series for every station of `zone` the feed knows
    /// about. Stations missing from the feed are simply absent from the
    /// result; only transport and decoding failures are errors.
    fn zone_readings(&self, zone: &Zone) -> Result<Vec<StationSeries>, ProviderError>;

    /// Short name for run logs, e.g. "aire-madrid" or "replay".
    fn source_name(&self) -> &str;
}
