//! The daily escalation run.
//!
//! One call to [`EscalationEngine::run`] performs the whole day: sweep
//! stale records, fetch and classify every zone, persist today's snapshot,
//! load the prior days, resolve the scene. The run date is injected rather
//! than read from the clock, so replays and tests are deterministic.

use chrono::{Duration, NaiveDate};

use crate::alert::scene::{self, SceneInputs};
use crate::analysis::counts;
use crate::ingest::ReadingSource;
use crate::logging::{self, DataSource};
use crate::model::{RunError, ZoneSnapshot};
use crate::snapshots::SnapshotStore;
use crate::zones::ZoneRegistry;

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyOutcome {
    pub date: NaiveDate,
    /// Resolved scene, 0 through 5. Publishing it is the caller's job.
    pub scene: u8,
    /// The per-zone counts persisted for `date`.
    pub snapshot: ZoneSnapshot,
}

/// Orchestrates one day of the escalation protocol over a reading source
/// and a snapshot store.
pub struct EscalationEngine {
    registry: ZoneRegistry,
    source: Box<dyn ReadingSource>,
    store: SnapshotStore,
}

impl EscalationEngine {
    pub fn new(
        registry: ZoneRegistry,
        source: Box<dyn ReadingSource>,
        store: SnapshotStore,
    ) -> Self {
        EscalationEngine {
            registry,
            source,
            store,
        }
    }

    /// Runs the full sequence for `run_date`.
    ///
    /// Any zone's feed failure aborts the run before anything is written,
    /// and a failed snapshot write aborts it after: a half-observed city
    /// must never be published as a quiet one. Retention-sweep failures
    /// are logged and absorbed; stale records are never loaded anyway.
    pub fn run(&self, run_date: NaiveDate) -> Result<DailyOutcome, RunError> {
        logging::info(
            DataSource::System,
            None,
            &format!(
                "Run for {} using source '{}'",
                run_date,
                self.source.source_name()
            ),
        );

        let sweep = self.store.evict_older_than(run_date);
        logging::log_eviction_summary(sweep.deleted, sweep.failed);

        let mut snapshot = ZoneSnapshot::default();
        for zone in &self.registry.zones {
            let readings = match self.source.zone_readings(zone) {
                Ok(readings) => readings,
                Err(source) => {
                    logging::log_feed_failure(&zone.id, "zone readings fetch", &source);
                    return Err(RunError::Provider {
                        zone_id: zone.id.clone(),
                        source,
                    });
                }
            };
            let relaxed = self.registry.is_relaxed(&zone.id);
            let zone_counts = counts::count_zone_levels(zone, relaxed, &readings);
            logging::debug(
                DataSource::Feed,
                Some(&zone.id),
                &format!(
                    "{} station series; preaviso={} aviso={} alerta={}",
                    readings.len(),
                    zone_counts.preaviso,
                    zone_counts.aviso,
                    zone_counts.alerta
                ),
            );
            snapshot.insert(zone.id.clone(), zone_counts);
        }

        self.store.save(run_date, &snapshot)?;

        let yesterday = self.store.load(run_date - Duration::days(1))?;
        let two_days_ago = self.store.load(run_date - Duration::days(2))?;
        let three_days_ago = self.store.load(run_date - Duration::days(3))?;

        let inputs = SceneInputs {
            today: &snapshot,
            yesterday: yesterday.as_ref(),
            two_days_ago: two_days_ago.as_ref(),
            three_days_ago: three_days_ago.as_ref(),
        };
        let (scene_value, summary) = match scene::matched_rule(&inputs) {
            Some(rule) => (rule.scene, rule.summary),
            None => (0, "no rule matched"),
        };
        logging::info(
            DataSource::System,
            None,
            &format!("Scene {} for {} ({})", scene_value, run_date, summary),
        );

        Ok(DailyOutcome {
            date: run_date,
            scene: scene_value,
            snapshot,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
