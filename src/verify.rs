//! Feed Verification Module
//!
//! Framework for testing a zone registry against the live hourly feed to
//! determine which configured stations are actually reporting data.
//!
//! Use this after editing a zones file, or when a zone has gone
//! suspiciously quiet.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::error::Error;

use crate::ingest::madrid::MadridOpenData;
use crate::ingest::ReadingSource;
use crate::zones::{Zone, ZoneRegistry};

// ============================================================================
// Verification Results
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub feed_url: String,
    pub results: Vec<StationVerification>,
    pub summary: VerificationSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub stations_total: usize,
    pub stations_reporting: usize,
    pub stations_silent: usize,
    pub zones_failed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationVerification {
    pub station_code: String,
    pub zone_id: String,
    pub status: VerificationStatus,
    pub present_in_feed: bool,
    pub validated_hours: usize,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum VerificationStatus {
    /// Station appeared in the feed with at least one validated hour
    Success,
    /// Station appeared in the feed but every hour was unvalidated
    PartialSuccess,
    /// Station missing from the feed, or the fetch itself failed
    Failed,
}

// ============================================================================
// Per-Zone Verification
// ============================================================================

/// Check every configured station of one zone against a fetched feed.
pub fn verify_zone(source: &dyn ReadingSource, zone: &Zone) -> Vec<StationVerification> {
    let mut results = Vec::new();

    match source.zone_readings(zone) {
        Ok(series) => {
            for code in &zone.station_codes {
                let found = series.iter().find(|s| &s.station_code == code);

                let mut result = StationVerification {
                    station_code: code.clone(),
                    zone_id: zone.id.clone(),
                    status: VerificationStatus::Failed,
                    present_in_feed: false,
                    validated_hours: 0,
                    error_message: None,
                };

                if let Some(station) = found {
                    result.present_in_feed = true;
                    result.validated_hours = station.validated_samples();
                    result.status = if result.validated_hours > 0 {
                        VerificationStatus::Success
                    } else {
                        VerificationStatus::PartialSuccess
                    };
                }

                results.push(result);
            }
        }
        Err(e) => {
            // The whole zone failed to fetch; every station inherits the error
            for code in &zone.station_codes {
                results.push(StationVerification {
                    station_code: code.clone(),
                    zone_id: zone.id.clone(),
                    status: VerificationStatus::Failed,
                    present_in_feed: false,
                    validated_hours: 0,
                    error_message: Some(e.to_string()),
                });
            }
        }
    }

    results
}

// ============================================================================
// Full Verification Run
// ============================================================================

/// Run verification across the whole registry against the live feed.
pub fn run_feed_verification(
    registry: &ZoneRegistry,
    feed_url: &str,
    magnitude: u8,
) -> Result<VerificationReport, Box<dyn Error>> {
    println!("Starting feed verification...");
    println!("Feed: {}", feed_url);
    println!();

    let source = MadridOpenData::new(feed_url, magnitude)?;

    let mut results = Vec::new();
    let mut zones_failed = 0;

    for zone in &registry.zones {
        println!(
            "Checking {} ({}, {} stations)...",
            zone.id,
            zone.name,
            zone.station_codes.len()
        );

        let zone_results = verify_zone(&source, zone);

        if zone_results
            .iter()
            .any(|r| r.error_message.is_some())
        {
            zones_failed += 1;
        }

        for result in &zone_results {
            match result.status {
                VerificationStatus::Success => {
                    println!(
                        "  ✓ {} - {} validated hours",
                        result.station_code, result.validated_hours
                    );
                }
                VerificationStatus::PartialSuccess => {
                    println!(
                        "  ⚠ {} - present but no validated hours yet",
                        result.station_code
                    );
                }
                VerificationStatus::Failed => match &result.error_message {
                    Some(msg) => println!("  ✗ {} - {}", result.station_code, msg),
                    None => println!("  ✗ {} - not in today's feed", result.station_code),
                },
            }
        }

        results.extend(zone_results);
    }

    let stations_total = results.len();
    let stations_reporting = results
        .iter()
        .filter(|r| r.status != VerificationStatus::Failed)
        .count();
    let stations_silent = stations_total - stations_reporting;

    let report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        feed_url: feed_url.to_string(),
        results,
        summary: VerificationSummary {
            stations_total,
            stations_reporting,
            stations_silent,
            zones_failed,
        },
    };

    Ok(report)
}

/// Print a human-readable summary of a verification report.
pub fn print_summary(report: &VerificationReport) {
    println!();
    println!("═══════════════════════════════════════════");
    println!("  FEED VERIFICATION SUMMARY");
    println!("═══════════════════════════════════════════");
    println!("Timestamp: {}", report.timestamp);
    println!();
    println!(
        "Stations:  {}/{} reporting",
        report.summary.stations_reporting, report.summary.stations_total
    );
    println!("Silent:    {}", report.summary.stations_silent);
    println!("Zone fetch failures: {}", report.summary.zones_failed);

    let success_rate = if report.summary.stations_total > 0 {
        (report.summary.stations_reporting as f64 / report.summary.stations_total as f64) * 100.0
    } else {
        0.0
    };
    println!();
    println!("Overall success rate: {:.1}%", success_rate);
    println!("═══════════════════════════════════════════");
}
