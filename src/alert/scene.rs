//! Day-level scene classification.
//!
//! The episode protocol escalates through six scenes (0 = no episode,
//! 5 = alert ceiling). The rules live in one ordered table of
//! predicate/result pairs, evaluated top-down; the first rule whose
//! predicate holds decides the scene, and no rule matching means scene 0.
//! Each predicate is a named function so it can be tested on its own.
//!
//! Rules that look back at prior days are simply unsatisfied when a prior
//! day's record is missing. Absence is never rewritten as "a day of zero
//! counts": a hole in the history can hold the cascade back, but it can
//! never push it forward.

use crate::model::{ExceedanceLevel, ZoneSnapshot};

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// The classifier's view of the rolling window: today's snapshot plus up
/// to three prior days. A `None` means that day's record was never
/// produced or has aged out of retention.
#[derive(Debug, Clone, Copy)]
pub struct SceneInputs<'a> {
    pub today: &'a ZoneSnapshot,
    pub yesterday: Option<&'a ZoneSnapshot>,
    pub two_days_ago: Option<&'a ZoneSnapshot>,
    pub three_days_ago: Option<&'a ZoneSnapshot>,
}

/// A prior day's rule term: true only when that day's record exists and
/// satisfies the check.
fn day_at(day: Option<&ZoneSnapshot>, level: ExceedanceLevel, min_stations: u32) -> bool {
    day.is_some_and(|snapshot| snapshot.any_zone_at(level, min_stations))
}

// ---------------------------------------------------------------------------
// Rule predicates
// ---------------------------------------------------------------------------

/// Scene 5: three stations of one zone at alerta today. History is
/// irrelevant: a same-day alerta cluster jumps straight to the ceiling.
fn alerta_cluster_today(d: &SceneInputs) -> bool {
    d.today.any_zone_at(ExceedanceLevel::Alerta, 3)
}

/// Scene 4: an aviso pair in one zone on each of four days running.
fn aviso_pair_four_days(d: &SceneInputs) -> bool {
    d.today.any_zone_at(ExceedanceLevel::Aviso, 2)
        && day_at(d.yesterday, ExceedanceLevel::Aviso, 2)
        && day_at(d.two_days_ago, ExceedanceLevel::Aviso, 2)
        && day_at(d.three_days_ago, ExceedanceLevel::Aviso, 2)
}

/// Scene 3: a preaviso pair three days running, or an aviso pair two days
/// running.
fn sustained_third_day(d: &SceneInputs) -> bool {
    let preaviso_three_days = d.today.any_zone_at(ExceedanceLevel::Preaviso, 2)
        && day_at(d.yesterday, ExceedanceLevel::Preaviso, 2)
        && day_at(d.two_days_ago, ExceedanceLevel::Preaviso, 2);
    let aviso_two_days = d.today.any_zone_at(ExceedanceLevel::Aviso, 2)
        && day_at(d.yesterday, ExceedanceLevel::Aviso, 2);
    preaviso_three_days || aviso_two_days
}

/// Scene 2: a preaviso pair two days running, or an aviso pair today.
fn escalation_second_day(d: &SceneInputs) -> bool {
    let preaviso_two_days = d.today.any_zone_at(ExceedanceLevel::Preaviso, 2)
        && day_at(d.yesterday, ExceedanceLevel::Preaviso, 2);
    preaviso_two_days || d.today.any_zone_at(ExceedanceLevel::Aviso, 2)
}

/// Scene 1: a preaviso pair in one zone today.
fn preaviso_pair_today(d: &SceneInputs) -> bool {
    d.today.any_zone_at(ExceedanceLevel::Preaviso, 2)
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// One row of the cascade: the scene it resolves to, a one-line summary
/// for the run log, and the predicate that decides it.
pub struct SceneRule {
    pub scene: u8,
    pub summary: &'static str,
    pub holds: fn(&SceneInputs) -> bool,
}

/// The cascade, most severe first. Order is load-bearing: classification
/// takes the first rule that holds, so inserting a rule in the wrong place
/// changes escalation behavior.
pub static SCENE_RULES: &[SceneRule] = &[
    SceneRule {
        scene: 5,
        summary: "three stations of one zone at alerta today",
        holds: alerta_cluster_today,
    },
    SceneRule {
        scene: 4,
        summary: "aviso pair in one zone four days running",
        holds: aviso_pair_four_days,
    },
    SceneRule {
        scene: 3,
        summary: "preaviso pair three days running, or aviso pair two days running",
        holds: sustained_third_day,
    },
    SceneRule {
        scene: 2,
        summary: "preaviso pair two days running, or aviso pair today",
        holds: escalation_second_day,
    },
    SceneRule {
        scene: 1,
        summary: "preaviso pair in one zone today",
        holds: preaviso_pair_today,
    },
];

/// The first rule of the cascade that holds for `inputs`, or `None` when
/// the day is scene 0.
pub fn matched_rule(inputs: &SceneInputs) -> Option<&'static SceneRule> {
    SCENE_RULES.iter().find(|rule| (rule.holds)(inputs))
}

/// Resolves today's scene from the rolling window. Pure and stateless:
/// the same inputs always produce the same scene.
pub fn classify(inputs: &SceneInputs) -> u8 {
    matched_rule(inputs).map_or(0, |rule| rule.scene)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
