//! Category bucket key decoding.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use swimlane_core::{BucketKey, KeyField, SchemaVersion, SwimlaneConfig};

const SEGMENT_DELIMITER: char = '/';
const PAIR_DELIMITER: char = '-';
const PART_DELIMITER: char = '_';

/// Decode a raw bucket key following the configured schema version.
///
/// Never fails: missing, empty, `null` or malformed segments leave the
/// matching fields unset.
pub fn decode_bucket_key(raw: &str, config: &SwimlaneConfig) -> BucketKey {
    let mut key = BucketKey {
        raw: raw.to_string(),
        ..BucketKey::default()
    };

    let mut segments = raw.split(SEGMENT_DELIMITER);

    for field in config.schema_version.positional_fields() {
        let Some(segment) = segments.next() else {
            return key;
        };

        match field {
            KeyField::Flight => decode_flight_segment(&mut key, segment, config.schema_version),
            KeyField::Marketing => decode_marketing_segment(&mut key, segment),
            KeyField::CarrierName => {
                key.carrier_name =
                    present(segment).map(|name| name.replace(config.delimiter_substitute, "/"));
            }
            KeyField::CarrierIata => key.carrier_iata = present(segment).map(str::to_string),
            KeyField::Routing => key.routing = present(segment).map(str::to_string),
        }
    }

    for segment in segments {
        for (name, value) in named_pairs(segment) {
            apply_named_field(&mut key, name, &value);
        }
    }

    key
}

fn decode_flight_segment(key: &mut BucketKey, segment: &str, version: SchemaVersion) {
    let mut parts = segment.split(PART_DELIMITER);
    key.operating_date = parts.next().and_then(parse_operating_date);

    if let Some(callsign) = parts.next().and_then(present) {
        let (code, number) = split_callsign(callsign, version.code_width());
        key.carrier_code = code.map(str::to_string);
        key.flight_number = number.map(str::to_string);
        key.callsign = Some(callsign.to_string());
    }

    key.departure_icao = parts.next().and_then(present).map(str::to_string);
}

fn decode_marketing_segment(key: &mut BucketKey, segment: &str) {
    let mut parts = segment.split(PART_DELIMITER).skip(1);
    key.marketing_flight = parts.next().and_then(present).map(str::to_string);
    key.departure_iata = parts.next().and_then(present).map(str::to_string);
}

/// Fixed-width carrier code prefix and the flight number after it.
fn split_callsign(callsign: &str, width: usize) -> (Option<&str>, Option<&str>) {
    if callsign.chars().count() < width {
        return (None, None);
    }

    let boundary = callsign
        .char_indices()
        .nth(width)
        .map_or(callsign.len(), |(index, _)| index);
    let (code, number) = callsign.split_at(boundary);
    (Some(code), present(number))
}

/// Splits `NAME=value-NAME=value`. Dashes not followed by a field name stay in
/// the preceding value.
fn named_pairs(segment: &str) -> Vec<(&str, String)> {
    let mut pairs: Vec<(&str, String)> = Vec::new();

    for piece in segment.split(PAIR_DELIMITER) {
        match piece.split_once('=') {
            Some((name, value)) if is_field_name(name) => pairs.push((name, value.to_string())),
            _ => {
                if let Some((_, value)) = pairs.last_mut() {
                    value.push(PAIR_DELIMITER);
                    value.push_str(piece);
                }
            }
        }
    }

    pairs
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn apply_named_field(key: &mut BucketKey, name: &str, value: &str) {
    match name {
        "STD" => key.scheduled_departure = parse_timestamp(value),
        "ATD" => key.actual_departure = parse_timestamp(value),
        "STA" => key.scheduled_arrival = parse_timestamp(value),
        "ATA" => key.actual_arrival = parse_timestamp(value),
        "PNR_PUSH" => key.pnr_pushed_at = parse_timestamp(value),
        "API_PUSH" => key.api_pushed_at = parse_timestamp(value),
        "PNR" => key.pnr_status = present(value).map(str::to_string),
        "API" => key.api_status = present(value).map(str::to_string),
        "STATE" => key.flight_state = present(value).map(str::to_string),
        other => {
            if let Some(value) = present(value) {
                key.extras.insert(other.to_string(), value.to_string());
            }
        }
    }
}

/// Empty and literal `null` fields are absent.
fn present(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "null" {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_operating_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(present(value)?, "%Y%m%d").ok()
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = present(value)?;

    if value.len() == 12 && value.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDateTime::parse_from_str(value, "%Y%m%d%H%M")
            .ok()
            .map(|dt| dt.and_utc());
    }

    if let Ok(millis) = value.parse::<i64>() {
        return DateTime::from_timestamp_millis(millis);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| dt.and_utc())
}
