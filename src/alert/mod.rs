//! Escalation rules: per-station threshold detection and the day-level
//! scene cascade.

pub mod scene;
pub mod thresholds;
