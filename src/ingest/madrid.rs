/// Madrid open-data hourly feed client
///
/// Retrieves the municipal air-quality network's hourly file and decodes
/// it into per-station concentration series for the requested pollutant
/// magnitude.
///
/// Feed documentation: https://datos.madrid.es (Calidad del aire. Datos en
/// tiempo real). Each row covers one station and one magnitude for the
/// current day:
///
///   provincia;municipio;estacion;magnitud;punto_muestreo;ano;mes;dia;
///   H01;V01;H02;V02;...;H24;V24
///
/// `Hnn` is the concentration for hour nn and `Vnn` is its validity flag:
/// "V" means validated, anything else means the hour is not usable yet.
/// Historic copies of the file use commas instead of semicolons; both are
/// accepted.

use std::time::Duration;

use crate::ingest::ReadingSource;
use crate::model::{ProviderError, StationSeries};
use crate::zones::Zone;

/// Published location of the hourly file.
pub const DEFAULT_FEED_URL: &str = "https://www.mambiente.madrid.es/opendata/horario.txt";

/// Fields before the first hour/validity pair.
const LEAD_FIELDS: usize = 8;

/// Hour slots per row.
const HOURS_PER_DAY: usize = 24;

// ============================================================================
// Feed parsing
// ============================================================================

/// Decodes the hourly feed body into one series per requested station.
///
/// Rows for other magnitudes or stations are skipped, as are header lines
/// and structurally broken rows. Hours flagged anything but "V" (and
/// values that fail to parse) are carried as NaN so the series stays
/// positional. The result is `Malformed` only when the whole body yields
/// no structurally valid row; a feed that merely lacks the requested
/// stations is an empty `Ok`.
pub fn parse_hourly_feed(
    body: &str,
    magnitude: u8,
    stations: &[String],
) -> Result<Vec<StationSeries>, ProviderError> {
    if body.trim().is_empty() {
        return Err(ProviderError::Malformed("empty response body".to_string()));
    }

    let mut series = Vec::new();
    let mut structurally_valid_rows = 0usize;

    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // The documented export is semicolon-separated; older mirrors of
        // the same file use commas.
        let separator = if line.contains(';') { ';' } else { ',' };
        let fields: Vec<&str> = line.split(separator).collect();

        if fields.len() < LEAD_FIELDS + 2 {
            continue; // Skip incomplete rows
        }

        // A header row has "provincia" where a province number belongs.
        if !is_numeric_field(fields[0]) || !is_numeric_field(fields[1]) || !is_numeric_field(fields[2]) {
            continue;
        }

        let row_magnitude: u8 = match fields[3].trim().parse() {
            Ok(m) => m,
            Err(_) => continue,
        };
        structurally_valid_rows += 1;

        if row_magnitude != magnitude {
            continue;
        }

        let station_code = format!(
            "{:0>2}{:0>3}{:0>3}",
            fields[0].trim(),
            fields[1].trim(),
            fields[2].trim()
        );
        if !stations.iter().any(|s| *s == station_code) {
            continue;
        }

        series.push(StationSeries::new(
            station_code,
            parse_hour_pairs(&fields[LEAD_FIELDS..]),
        ));
    }

    if structurally_valid_rows == 0 {
        return Err(ProviderError::Malformed(
            "no parseable rows in feed body".to_string(),
        ));
    }

    Ok(series)
}

fn is_numeric_field(field: &str) -> bool {
    let field = field.trim();
    !field.is_empty() && field.chars().all(|c| c.is_ascii_digit())
}

/// Turns the `H;V;H;V;...` tail of a row into positional samples.
/// A trailing half pair (a value with no flag) is dropped.
fn parse_hour_pairs(tail: &[&str]) -> Vec<f64> {
    tail.chunks_exact(2)
        .take(HOURS_PER_DAY)
        .map(|pair| {
            let value = pair[0].trim();
            let flag = pair[1].trim();
            if flag.eq_ignore_ascii_case("V") {
                value.parse().unwrap_or(f64::NAN)
            } else {
                f64::NAN
            }
        })
        .collect()
}

// ============================================================================
// Live source
// ============================================================================

/// Live client for the municipal hourly feed.
///
/// One download per `zone_readings` call; the source holds no cache, so a
/// run always classifies the file as published at fetch time.
pub struct MadridOpenData {
    client: reqwest::blocking::Client,
    feed_url: String,
    magnitude: u8,
}

impl MadridOpenData {
    pub fn new(feed_url: impl Into<String>, magnitude: u8) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(MadridOpenData {
            client,
            feed_url: feed_url.into(),
            magnitude,
        })
    }

    fn fetch_body(&self) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(&self.feed_url)
            .send()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::HttpStatus(response.status().as_u16()));
        }

        response
            .text()
            .map_err(|e| ProviderError::Transport(e.to_string()))
    }
}

impl ReadingSource for MadridOpenData {
    fn zone_readings(&self, zone: &Zone) -> Result<Vec<StationSeries>, ProviderError> {
        let body = self.fetch_body()?;
        parse_hourly_feed(&body, self.magnitude, &zone.station_codes)
    }

    fn source_name(&self) -> &str {
        "aire-madrid"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wanted(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_parses_validated_hours_in_order() {
        let body = "28;079;004;08;28079004_8_8;2026;01;17;00100;V;00210;V;00250;V;00205;V\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();

        assert_eq!(series.len(), 1);
        assert_eq!(series[0].station_code, "28079004");
        assert_eq!(series[0].samples, vec![100.0, 210.0, 250.0, 205.0]);
    }

    #[test]
    fn test_unvalidated_hours_become_gaps() {
        let body = "28;079;004;08;28079004_8_8;2026;01;17;00100;V;00210;N;00250;V\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();

        let samples = &series[0].samples;
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], 100.0);
        assert!(samples[1].is_nan(), "an N-flagged hour must be a gap");
        assert_eq!(samples[2], 250.0);
    }

    #[test]
    fn test_unparseable_value_becomes_a_gap_even_when_flagged_valid() {
        let body = "28;079;004;08;28079004_8_8;2026;01;17;garbage;V;00210;V\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();

        assert!(series[0].samples[0].is_nan());
        assert_eq!(series[0].samples[1], 210.0);
    }

    #[test]
    fn test_filters_by_magnitude() {
        // Same station reporting NO2 (8) and PM10 (10); only the requested
        // channel may come back.
        let body = "\
28;079;004;08;28079004_8_8;2026;01;17;00100;V;00110;V
28;079;004;10;28079004_10_8;2026;01;17;00900;V;00910;V
";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].samples, vec![100.0, 110.0]);
    }

    #[test]
    fn test_filters_to_requested_stations() {
        let body = "\
28;079;004;08;28079004_8_8;2026;01;17;00100;V;00110;V
28;079;016;08;28079016_8_8;2026;01;17;00200;V;00210;V
";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079016"])).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].station_code, "28079016");
    }

    #[test]
    fn test_missing_station_is_absent_not_an_error() {
        let body = "28;079;004;08;28079004_8_8;2026;01;17;00100;V;00110;V\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079016", "28079004"])).unwrap();
        assert_eq!(series.len(), 1, "the station with no row simply has no series");
    }

    #[test]
    fn test_unpadded_fields_normalize_to_full_codes() {
        let body = "28;79;4;8;28079004_8_8;2026;01;17;00100;V;00110;V\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series[0].station_code, "28079004");
    }

    #[test]
    fn test_comma_separated_variant_parses() {
        let body = "28,079,004,08,28079004_8_8,2026,01,17,00100,V,00210,V\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series[0].samples, vec![100.0, 210.0]);
    }

    #[test]
    fn test_header_row_is_skipped() {
        let body = "\
provincia;municipio;estacion;magnitud;punto_muestreo;ano;mes;dia;H01;V01
28;079;004;08;28079004_8_8;2026;01;17;00100;V;00110;V
";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_incomplete_rows_are_skipped() {
        let body = "\
28;079;004;08
28;079;004;08;28079004_8_8;2026;01;17;00100;V;00110;V
";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_trailing_half_pair_is_dropped() {
        let body = "28;079;004;08;28079004_8_8;2026;01;17;00100;V;00110\n";
        let series = parse_hourly_feed(body, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series[0].samples, vec![100.0]);
    }

    #[test]
    fn test_empty_body_is_malformed() {
        match parse_hourly_feed("   \n", 8, &wanted(&["28079004"])) {
            Err(ProviderError::Malformed(_)) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_html_error_page_is_malformed() {
        let body = "<html><body>503 Service Unavailable</body></html>";
        match parse_hourly_feed(body, 8, &wanted(&["28079004"])) {
            Err(ProviderError::Malformed(_)) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }

    #[test]
    fn test_full_day_row_caps_at_24_hours() {
        let mut row = String::from("28;079;004;08;28079004_8_8;2026;01;17");
        for hour in 0..30 {
            row.push_str(&format!(";{:05};V", hour + 1));
        }
        row.push('\n');

        let series = parse_hourly_feed(&row, 8, &wanted(&["28079004"])).unwrap();
        assert_eq!(series[0].samples.len(), 24);
        assert_eq!(series[0].samples[0], 1.0);
        assert_eq!(series[0].samples[23], 24.0);
    }
}
