//! Air quality episode escalation service for the Madrid monitoring network.
//!
//! Once a day the service fetches the municipal hourly feed, classifies every
//! configured station against the NO2 episode thresholds, persists the
//! per-zone tallies, and resolves the protocol scene (0 through 5) from up to
//! four days of history.

pub mod alert;
pub mod analysis;
pub mod config;
pub mod dev_mode;
pub mod engine;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod snapshots;
pub mod verify;
pub mod zones;
