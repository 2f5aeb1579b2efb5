//! Core swimlane model: decoded flight events, lanes, and the configuration
//! shared by the flattener and its hosts.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Encoding scheme of category bucket keys.
///
/// Field order and carrier code width changed between producers without any
/// marker in the key itself, so the version is always configured by the host.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SchemaVersion {
    /// `<date>_<callsign>` with a two character carrier code.
    V1,
    /// Slash separated flight, marketing, carrier and routing fields with a
    /// three character carrier code.
    #[default]
    V2,
}

/// Positional fields of a bucket key, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    /// `<date>_<callsign>[_<departure ICAO>]`
    Flight,
    /// `<date>_<marketing flight>_<departure IATA>`
    Marketing,
    CarrierName,
    CarrierIata,
    Routing,
}

impl SchemaVersion {
    /// Number of leading callsign characters holding the carrier code.
    pub fn code_width(self) -> usize {
        match self {
            SchemaVersion::V1 => 2,
            SchemaVersion::V2 => 3,
        }
    }

    /// Positional prefix of the key. Segments past it are `NAME=value` lists.
    pub fn positional_fields(self) -> &'static [KeyField] {
        match self {
            SchemaVersion::V1 => &[KeyField::Flight],
            SchemaVersion::V2 => &[
                KeyField::Flight,
                KeyField::Marketing,
                KeyField::CarrierName,
                KeyField::CarrierIata,
                KeyField::Routing,
            ],
        }
    }
}

/// Lane ordering applied before lanes are assigned bottom up.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Arrival order, reversed.
    #[default]
    #[serde(alias = "reverse")]
    None,
    Asc,
    Desc,
}

impl FromStr for SortMode {
    type Err = SwimlaneError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "reverse" => Ok(SortMode::None),
            "asc" => Ok(SortMode::Asc),
            "desc" => Ok(SortMode::Desc),
            other => Err(SwimlaneError::Config(format!("unknown sort mode {other}"))),
        }
    }
}

/// Which events land in a lane's conflict list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Only events that shared a time bucket with another event.
    #[default]
    CollisionsOnly,
    /// Every event seen for the lane.
    AllEvents,
}

/// Colour band starting at `value` (inclusive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThresholdBand {
    pub value: i64,
    pub color: String,
}

impl ThresholdBand {
    pub fn new(value: i64, color: impl Into<String>) -> Self {
        Self {
            value,
            color: color.into(),
        }
    }
}

/// One entry of a [`StatusTable`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusLabel {
    pub code: i64,
    pub label: String,
}

/// Lookup from status/priority code to a human readable label.
///
/// Serialized as a list of `{ code, label }` so that TOML and JSON hosts can
/// both supply it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "Vec<StatusLabel>", into = "Vec<StatusLabel>")]
pub struct StatusTable {
    labels: BTreeMap<i64, String>,
}

impl StatusTable {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        Self {
            labels: entries
                .into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        }
    }

    /// Codes 1 to 7 used by the first producers.
    pub fn legacy() -> Self {
        Self::new([
            (1, "To be scheduled"),
            (2, "Scheduled"),
            (3, "Expected"),
            (4, "Canceled"),
            (5, "Received on Time"),
            (6, "Received with delay"),
            (7, "Missing"),
        ])
    }

    /// Label for `code`, `None` when the code is not mapped.
    pub fn label(&self, code: i64) -> Option<&str> {
        self.labels.get(&code).map(String::as_str)
    }

    pub fn insert(&mut self, code: i64, label: impl Into<String>) {
        self.labels.insert(code, label.into());
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// The legacy codes scaled by ten. Producers using codes above 70 supply
/// their own labels.
impl Default for StatusTable {
    fn default() -> Self {
        Self::new([
            (10, "To be scheduled"),
            (20, "Scheduled"),
            (30, "Expected"),
            (40, "Canceled"),
            (50, "Received on Time"),
            (60, "Received with delay"),
            (70, "Missing"),
        ])
    }
}

impl From<Vec<StatusLabel>> for StatusTable {
    fn from(entries: Vec<StatusLabel>) -> Self {
        Self::new(entries.into_iter().map(|entry| (entry.code, entry.label)))
    }
}

impl From<StatusTable> for Vec<StatusLabel> {
    fn from(table: StatusTable) -> Self {
        table
            .labels
            .into_iter()
            .map(|(code, label)| StatusLabel { code, label })
            .collect()
    }
}

/// Options recognised by the flattener and the plot model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwimlaneConfig {
    pub schema_version: SchemaVersion,
    pub sort_mode: SortMode,
    /// Lane labels longer than this are cropped for display.
    pub label_max_chars: usize,
    pub threshold_bands: Vec<ThresholdBand>,
    /// Colour of values below the lowest band.
    pub unknown_threshold_color: String,
    pub status_labels: StatusTable,
    pub conflict_policy: ConflictPolicy,
    /// Stands in for `/` inside carrier names.
    pub delimiter_substitute: char,
}

impl Default for SwimlaneConfig {
    fn default() -> Self {
        Self {
            schema_version: SchemaVersion::V2,
            sort_mode: SortMode::None,
            label_max_chars: 27,
            threshold_bands: vec![
                ThresholdBand::new(10, "#9e9e9e"),
                ThresholdBand::new(30, "#64b5f6"),
                ThresholdBand::new(50, "#66bb6a"),
                ThresholdBand::new(60, "#ffca28"),
                ThresholdBand::new(80, "#fb8c00"),
                ThresholdBand::new(110, "#e53935"),
            ],
            unknown_threshold_color: "#d5d5d5".to_string(),
            status_labels: StatusTable::default(),
            conflict_policy: ConflictPolicy::CollisionsOnly,
            delimiter_substitute: '|',
        }
    }
}

/// Ids of the host aggregations feeding the swimlane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AggregationLayout {
    pub metric_id: Option<String>,
    pub time_split_id: Option<String>,
    /// Category split. Without it the time buckets form a single lane.
    pub view_by_id: Option<String>,
    /// Lane label used when there is no category split.
    pub metric_label: String,
}

impl Default for AggregationLayout {
    fn default() -> Self {
        Self {
            metric_id: Some("1".to_string()),
            time_split_id: Some("3".to_string()),
            view_by_id: Some("2".to_string()),
            metric_label: "Status".to_string(),
        }
    }
}

/// Fields decoded from a category bucket key. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BucketKey {
    pub raw: String,
    pub operating_date: Option<NaiveDate>,
    pub callsign: Option<String>,
    pub carrier_code: Option<String>,
    pub flight_number: Option<String>,
    pub departure_icao: Option<String>,
    pub marketing_flight: Option<String>,
    pub departure_iata: Option<String>,
    pub carrier_name: Option<String>,
    pub carrier_iata: Option<String>,
    pub routing: Option<String>,
    pub scheduled_departure: Option<DateTime<Utc>>,
    pub actual_departure: Option<DateTime<Utc>>,
    pub scheduled_arrival: Option<DateTime<Utc>>,
    pub actual_arrival: Option<DateTime<Utc>>,
    pub pnr_pushed_at: Option<DateTime<Utc>>,
    pub api_pushed_at: Option<DateTime<Utc>>,
    pub pnr_status: Option<String>,
    pub api_status: Option<String>,
    pub flight_state: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl BucketKey {
    /// Origin and destination of a `AAA-BBB` routing.
    pub fn route_legs(&self) -> Option<(&str, &str)> {
        let (origin, destination) = self.routing.as_deref()?.split_once('-')?;
        if origin.is_empty() || destination.is_empty() {
            None
        } else {
            Some((origin, destination))
        }
    }
}

/// Stable identity of an event: its bucket key plus its time bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(raw_key: &str, time: i64) -> Self {
        Self(format!("{raw_key}@{time}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A flight placed in one time bucket with its status code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlightEvent {
    pub id: EventId,
    /// Time bucket key, epoch milliseconds.
    pub time: i64,
    pub status: i64,
    pub key: BucketKey,
}

impl FlightEvent {
    pub fn new(key: BucketKey, time: i64, status: i64) -> Self {
        Self {
            id: EventId::new(&key.raw, time),
            time,
            status,
            key,
        }
    }

    pub fn bucket_start(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.time)
    }
}

/// Value shown for one lane and time bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaneCell {
    pub value: i64,
    /// Representative event. Absent in single lane mode.
    pub event: Option<FlightEvent>,
}

/// One horizontal row of the swimlane.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lane {
    pub label: String,
    pub doc_count: u64,
    pub cells: BTreeMap<i64, LaneCell>,
    /// Events that collided on a time bucket, in insertion order.
    pub conflicts: Vec<FlightEvent>,
}

impl Lane {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            doc_count: 0,
            cells: BTreeMap::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn value_at(&self, time: i64) -> Option<i64> {
        self.cells.get(&time).map(|cell| cell.value)
    }

    pub fn representative_at(&self, time: i64) -> Option<&FlightEvent> {
        self.cells.get(&time).and_then(|cell| cell.event.as_ref())
    }

    pub fn values(&self) -> BTreeMap<i64, i64> {
        self.cells
            .iter()
            .map(|(time, cell)| (*time, cell.value))
            .collect()
    }

    pub fn conflicts_at(&self, time: i64) -> impl Iterator<Item = &FlightEvent> {
        self.conflicts.iter().filter(move |event| event.time == time)
    }
}

/// Result of one flattening pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwimlaneSnapshot {
    /// Lanes in the order their category was first seen.
    pub lanes: Vec<Lane>,
    /// Lane labels bottom up: index 0 is the lowest lane.
    pub lane_order: Vec<String>,
}

impl SwimlaneSnapshot {
    pub fn new(lanes: Vec<Lane>, lane_order: Vec<String>) -> Self {
        Self { lanes, lane_order }
    }

    pub fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }

    pub fn lane(&self, label: &str) -> Option<&Lane> {
        self.lanes.iter().find(|lane| lane.label == label)
    }

    /// Vertical position of `label`.
    pub fn lane_index(&self, label: &str) -> Option<usize> {
        self.lane_order.iter().position(|candidate| candidate == label)
    }

    /// Labels in first-seen order.
    pub fn labels(&self) -> Vec<&str> {
        self.lanes.iter().map(|lane| lane.label.as_str()).collect()
    }

    /// Lane label to time bucket to representative value.
    pub fn value_map(&self) -> HashMap<String, BTreeMap<i64, i64>> {
        self.lanes
            .iter()
            .map(|lane| (lane.label.clone(), lane.values()))
            .collect()
    }
}

/// Errors surfaced by the string and configuration entry points.
#[derive(Debug, thiserror::Error)]
pub enum SwimlaneError {
    #[error("input is missing required data")]
    MissingData,
    #[error("could not read input: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tables_map_known_codes_only() {
        let current = StatusTable::default();
        assert_eq!(current.label(20), Some("Scheduled"));
        assert_eq!(current.label(50), Some("Received on Time"));
        assert_eq!(current.label(70), Some("Missing"));
        assert_eq!(current.label(25), None);
        assert_eq!(current.label(120), None);

        let legacy = StatusTable::legacy();
        assert_eq!(legacy.label(5), Some("Received on Time"));
        assert_eq!(legacy.label(7), Some("Missing"));
        assert_eq!(legacy.label(0), None);
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: SwimlaneConfig = serde_json::from_str(
            r#"{
                "sort_mode": "asc",
                "schema_version": "v1",
                "status_labels": [{ "code": 3, "label": "Late" }]
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.sort_mode, SortMode::Asc);
        assert_eq!(cfg.schema_version, SchemaVersion::V1);
        assert_eq!(cfg.status_labels.label(3), Some("Late"));
        assert_eq!(cfg.status_labels.len(), 1);
        assert_eq!(cfg.label_max_chars, 27);
        assert_eq!(cfg.conflict_policy, ConflictPolicy::CollisionsOnly);
    }

    #[test]
    fn sort_mode_parses_reverse_alias() {
        assert_eq!("reverse".parse::<SortMode>().unwrap(), SortMode::None);
        assert_eq!("DESC".parse::<SortMode>().unwrap(), SortMode::Desc);
        assert!("sideways".parse::<SortMode>().is_err());
    }

    #[test]
    fn route_legs_need_both_ends() {
        let mut key = BucketKey {
            routing: Some("ZRH-LUX".to_string()),
            ..BucketKey::default()
        };
        assert_eq!(key.route_legs(), Some(("ZRH", "LUX")));

        key.routing = Some("ZRH-".to_string());
        assert_eq!(key.route_legs(), None);
    }
}
