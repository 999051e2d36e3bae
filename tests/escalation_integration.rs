/// Integration tests for the daily escalation pipeline
///
/// These tests verify:
/// 1. Feed readings → per-zone counts → persisted snapshot → resolved scene
/// 2. Multi-day escalation across real snapshot files on disk
/// 3. The relaxed alerta window applied to the configured zone
/// 4. Abort behavior when the feed fails mid-run
/// 5. Retention sweep of stale snapshot files
///
/// No network or database required: readings are scripted and snapshots live
/// in a per-test temporary directory.
///
/// Run with: cargo test --test escalation_integration

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;

use aqmon_service::engine::EscalationEngine;
use aqmon_service::ingest::ReadingSource;
use aqmon_service::model::{LevelCounts, ProviderError, RunError, StationSeries};
use aqmon_service::snapshots::SnapshotStore;
use aqmon_service::zones::{Zone, ZoneRegistry};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Serves pre-built readings per zone id, like a feed frozen at one day.
struct ScriptedSource {
    rows: HashMap<String, Vec<StationSeries>>,
    fail_zone: Option<String>,
}

impl ScriptedSource {
    fn new() -> Self {
        ScriptedSource {
            rows: HashMap::new(),
            fail_zone: None,
        }
    }

    fn with_zone(mut self, zone_id: &str, series: Vec<StationSeries>) -> Self {
        self.rows.insert(zone_id.to_string(), series);
        self
    }

    fn failing_on(mut self, zone_id: &str) -> Self {
        self.fail_zone = Some(zone_id.to_string());
        self
    }
}

impl ReadingSource for ScriptedSource {
    fn zone_readings(&self, zone: &Zone) -> Result<Vec<StationSeries>, ProviderError> {
        if self.fail_zone.as_deref() == Some(zone.id.as_str()) {
            return Err(ProviderError::HttpStatus(503));
        }
        Ok(self.rows.get(&zone.id).cloned().unwrap_or_default())
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A full day of flat readings at `value`.
fn flat_day(code: &str, value: f64) -> StationSeries {
    StationSeries::new(code, vec![value; 24])
}

/// Quiet day except `hours` consecutive readings at `value` starting at 10:00.
fn spike(code: &str, value: f64, hours: usize) -> StationSeries {
    let mut samples = vec![40.0; 24];
    for slot in samples.iter_mut().skip(10).take(hours) {
        *slot = value;
    }
    StationSeries::new(code, samples)
}

fn run_day(
    dir: &Path,
    source: ScriptedSource,
    run_date: NaiveDate,
) -> Result<u8, RunError> {
    let store = SnapshotStore::open(dir).expect("store should open");
    let engine = EscalationEngine::new(ZoneRegistry::builtin(), Box::new(source), store);
    engine.run(run_date).map(|outcome| outcome.scene)
}

fn snapshot_file(dir: &Path, stamp: &str) -> std::path::PathBuf {
    dir.join(format!("{}.json", stamp))
}

// ---------------------------------------------------------------------------
// Single-Day Scenes
// ---------------------------------------------------------------------------

#[test]
fn test_quiet_city_resolves_scene_zero() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new()
        .with_zone("zone1", vec![flat_day("28079004", 35.0), flat_day("28079008", 52.0)]);

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 0, "clean air should resolve scene 0");
}

#[test]
fn test_two_preaviso_stations_in_one_zone_resolve_scene_one() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new().with_zone(
        "zone1",
        vec![
            spike("28079004", 190.0, 2),
            spike("28079008", 195.0, 2),
            flat_day("28079011", 50.0),
        ],
    );

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 1);
}

#[test]
fn test_two_aviso_stations_in_one_zone_resolve_scene_two() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new().with_zone(
        "zone2",
        vec![spike("28079036", 250.0, 3), spike("28079040", 260.0, 3)],
    );

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 2, "an aviso pair escalates immediately to scene 2");
}

#[test]
fn test_three_alerta_stations_in_one_zone_resolve_scene_five() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new().with_zone(
        "zone1",
        vec![
            spike("28079004", 450.0, 3),
            spike("28079008", 480.0, 3),
            spike("28079011", 520.0, 3),
        ],
    );

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 5);
}

#[test]
fn test_preaviso_stations_split_across_zones_stay_scene_zero() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new()
        .with_zone("zone1", vec![spike("28079004", 190.0, 2)])
        .with_zone("zone2", vec![spike("28079036", 195.0, 2)]);

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 0, "one station per zone never forms a pair");
}

// ---------------------------------------------------------------------------
// Relaxed Alerta Window
// ---------------------------------------------------------------------------

#[test]
fn test_two_hour_alerta_runs_trigger_scene_five_in_the_relaxed_zone() {
    // zone4 runs under the two-hour alerta window; the same two-hour spike
    // in any other zone only reaches preaviso.
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new().with_zone(
        "zone4",
        vec![
            spike("28079024", 450.0, 2),
            spike("28079039", 460.0, 2),
            spike("28079058", 470.0, 2),
        ],
    );

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 5);
}

#[test]
fn test_two_hour_alerta_runs_in_a_normal_zone_only_reach_preaviso() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new().with_zone(
        "zone2",
        vec![
            spike("28079036", 450.0, 2),
            spike("28079040", 460.0, 2),
            spike("28079054", 470.0, 2),
        ],
    );

    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();
    assert_eq!(scene, 1, "two hours over 400 is only a preaviso pair outside the relaxed zone");
}

// ---------------------------------------------------------------------------
// Multi-Day Escalation
// ---------------------------------------------------------------------------

#[test]
fn test_sustained_aviso_pair_escalates_over_four_days() {
    let dir = tempfile::tempdir().unwrap();
    let days = [
        date(2026, 1, 14),
        date(2026, 1, 15),
        date(2026, 1, 16),
        date(2026, 1, 17),
    ];

    let mut scenes = Vec::new();
    for day in days {
        let source = ScriptedSource::new().with_zone(
            "zone1",
            vec![spike("28079004", 250.0, 3), spike("28079008", 255.0, 3)],
        );
        scenes.push(run_day(dir.path(), source, day).unwrap());
    }

    assert_eq!(
        scenes,
        vec![2, 3, 3, 4],
        "aviso pair: immediate scene 2, scene 3 on the second day, scene 4 once four days are on record"
    );
}

#[test]
fn test_preaviso_streak_builds_scenes_one_two_three() {
    let dir = tempfile::tempdir().unwrap();
    let days = [date(2026, 1, 15), date(2026, 1, 16), date(2026, 1, 17)];

    let mut scenes = Vec::new();
    for day in days {
        let source = ScriptedSource::new().with_zone(
            "zone5",
            vec![spike("28079017", 190.0, 2), spike("28079018", 192.0, 2)],
        );
        scenes.push(run_day(dir.path(), source, day).unwrap());
    }

    assert_eq!(scenes, vec![1, 2, 3]);
}

#[test]
fn test_a_missing_day_on_disk_breaks_the_streak() {
    // Records exist for D-2 and D-3 but not D-1: the sustained rules must
    // not fire, leaving only today's immediate escalation.
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::open(dir.path()).unwrap();

    let mut counts = LevelCounts::default();
    counts.record(aqmon_service::model::ExceedanceLevel::Aviso);
    counts.record(aqmon_service::model::ExceedanceLevel::Aviso);
    let mut snapshot = aqmon_service::model::ZoneSnapshot::default();
    snapshot.insert("zone1", counts);

    store.save(date(2026, 1, 14), &snapshot).unwrap();
    store.save(date(2026, 1, 15), &snapshot).unwrap();

    let source = ScriptedSource::new().with_zone(
        "zone1",
        vec![spike("28079004", 250.0, 3), spike("28079008", 255.0, 3)],
    );
    let scene = run_day(dir.path(), source, date(2026, 1, 17)).unwrap();

    assert_eq!(scene, 2, "a gap on 2026-01-16 must cap the scene at today's evidence");
}

// ---------------------------------------------------------------------------
// Failure Handling
// ---------------------------------------------------------------------------

#[test]
fn test_feed_failure_aborts_the_run_without_writing_a_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new()
        .with_zone("zone1", vec![flat_day("28079004", 35.0)])
        .failing_on("zone3");

    let result = run_day(dir.path(), source, date(2026, 1, 17));

    match result {
        Err(RunError::Provider { zone_id, .. }) => assert_eq!(zone_id, "zone3"),
        other => panic!("expected a provider error, got {:?}", other),
    }
    assert!(
        !snapshot_file(dir.path(), "20260117").exists(),
        "an aborted run must leave no record for the day"
    );
}

#[test]
fn test_feed_failure_leaves_existing_history_intact() {
    let dir = tempfile::tempdir().unwrap();

    let good = ScriptedSource::new().with_zone("zone1", vec![flat_day("28079004", 35.0)]);
    run_day(dir.path(), good, date(2026, 1, 16)).unwrap();

    let bad = ScriptedSource::new().failing_on("zone1");
    run_day(dir.path(), bad, date(2026, 1, 17)).unwrap_err();

    assert!(
        snapshot_file(dir.path(), "20260116").exists(),
        "yesterday's record must survive a failed run"
    );
}

// ---------------------------------------------------------------------------
// Persistence Format and Retention
// ---------------------------------------------------------------------------

#[test]
fn test_snapshot_on_disk_uses_zone_keys_and_level_fields() {
    let dir = tempfile::tempdir().unwrap();
    let source = ScriptedSource::new().with_zone(
        "zone2",
        vec![spike("28079036", 250.0, 3), spike("28079040", 190.0, 2)],
    );
    run_day(dir.path(), source, date(2026, 1, 17)).unwrap();

    let text = std::fs::read_to_string(snapshot_file(dir.path(), "20260117")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();

    let zone2 = &parsed["zone2"];
    assert_eq!(zone2["aviso"], 1);
    assert_eq!(zone2["preaviso"], 1);
    assert_eq!(zone2["alerta"], 0);
    assert_eq!(parsed["zone1"]["preaviso"], 0, "every configured zone appears, even quiet ones");
}

#[test]
fn test_run_sweeps_records_older_than_the_retention_window() {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::open(dir.path()).unwrap();
    let snapshot = aqmon_service::model::ZoneSnapshot::default();

    store.save(date(2026, 1, 7), &snapshot).unwrap();
    store.save(date(2026, 1, 14), &snapshot).unwrap();

    let source = ScriptedSource::new().with_zone("zone1", vec![flat_day("28079004", 35.0)]);
    run_day(dir.path(), source, date(2026, 1, 17)).unwrap();

    assert!(
        !snapshot_file(dir.path(), "20260107").exists(),
        "records outside the four-day window are deleted at run start"
    );
    assert!(
        snapshot_file(dir.path(), "20260114").exists(),
        "the oldest day the scene rules can still consult is kept"
    );
    assert!(snapshot_file(dir.path(), "20260117").exists());
}
