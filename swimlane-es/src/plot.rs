//! Chart-ready series and tooltip content derived from a snapshot.

use serde::{Deserialize, Serialize};
use swimlane_core::{FlightEvent, StatusTable, SwimlaneConfig, SwimlaneSnapshot, ThresholdBand};

use crate::lanes::crop_label;

const UNKNOWN_SERIES: &str = "series_unknown";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotPoint {
    pub time: i64,
    /// Vertical centre of the lane.
    pub lane_position: f64,
    pub score: i64,
}

/// Points sharing one colour band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotSeries {
    pub label: String,
    pub color: String,
    /// Lower bound of the band, `None` for the unknown series.
    pub threshold: Option<i64>,
    pub points: Vec<PlotPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaneTick {
    pub position: f64,
    pub label: String,
    pub full_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlotModel {
    /// Unknown series first, then one per band in ascending order.
    pub series: Vec<PlotSeries>,
    pub lane_ticks: Vec<LaneTick>,
    pub y_max: usize,
}

/// Series slot of `value`: 0 below the lowest band, else 1 + the band index.
/// `bands` must be sorted by value.
pub fn series_index(value: i64, bands: &[ThresholdBand]) -> usize {
    bands
        .iter()
        .rposition(|band| value >= band.value)
        .map_or(0, |index| index + 1)
}

pub fn build_plot(snapshot: &SwimlaneSnapshot, config: &SwimlaneConfig) -> PlotModel {
    let mut bands = config.threshold_bands.clone();
    bands.sort_by_key(|band| band.value);

    let mut series = Vec::with_capacity(bands.len() + 1);
    series.push(PlotSeries {
        label: UNKNOWN_SERIES.to_string(),
        color: config.unknown_threshold_color.clone(),
        threshold: None,
        points: Vec::new(),
    });
    series.extend(bands.iter().enumerate().map(|(index, band)| PlotSeries {
        label: format!("series_{index}"),
        color: band.color.clone(),
        threshold: Some(band.value),
        points: Vec::new(),
    }));

    for lane in &snapshot.lanes {
        let Some(index) = snapshot.lane_index(&lane.label) else {
            continue;
        };
        let lane_position = index as f64 + 0.5;

        for (time, cell) in &lane.cells {
            series[series_index(cell.value, &bands)]
                .points
                .push(PlotPoint {
                    time: *time,
                    lane_position,
                    score: cell.value,
                });
        }
    }

    let lane_ticks = snapshot
        .lane_order
        .iter()
        .enumerate()
        .map(|(index, label)| LaneTick {
            position: index as f64 + 0.5,
            label: crop_label(label, config.label_max_chars),
            full_label: label.clone(),
        })
        .collect();

    PlotModel {
        series,
        lane_ticks,
        y_max: snapshot.lane_order.len(),
    }
}

/// Flights behind the marker at `lane`/`time`: the collided events when there
/// are any, else the representative alone.
pub fn events_at<'a>(snapshot: &'a SwimlaneSnapshot, lane: &str, time: i64) -> Vec<&'a FlightEvent> {
    let Some(lane) = snapshot.lane(lane) else {
        return Vec::new();
    };

    let collided: Vec<&FlightEvent> = lane.conflicts_at(time).collect();
    if !collided.is_empty() {
        return collided;
    }

    lane.representative_at(time).into_iter().collect()
}

/// Tooltip text for a marker: the bucket time, then one line per flight.
pub fn tooltip_lines(
    snapshot: &SwimlaneSnapshot,
    lane: &str,
    time: i64,
    labels: &StatusTable,
) -> Vec<String> {
    let events = events_at(snapshot, lane, time);
    if events.is_empty() {
        return Vec::new();
    }

    let mut lines = Vec::with_capacity(events.len() + 1);
    if let Some(start) = events[0].bucket_start() {
        lines.push(start.format("%B %-d %Y, %H:%M").to_string());
    }

    lines.extend(events.iter().map(|event| {
        format!(
            "{} - {} - {}",
            event.key.carrier_code.as_deref().unwrap_or_default(),
            event.key.flight_number.as_deref().unwrap_or_default(),
            labels.label(event.status).unwrap_or_default()
        )
    }));

    lines
}
