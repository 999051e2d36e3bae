/// Data organization utilities for the escalation service.
///
/// This module rolls per-station classifications up into the per-zone
/// counts the scene classifier consumes. Anything heavier (trend reports,
/// episode statistics) is handled by external scripts that read the
/// persisted snapshot records.
///
/// Submodules:
/// - `counts` — aggregates station series into per-zone level counts.

pub mod counts;
