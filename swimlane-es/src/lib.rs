//! Search aggregation response to `SwimlaneSnapshot` flattener.

mod decode;
mod lanes;
mod plot;
mod resolve;

use serde_json::Value;
use swimlane_core::{
    AggregationLayout, FlightEvent, SwimlaneConfig, SwimlaneError, SwimlaneSnapshot,
};
use tracing::{debug, trace, warn};

pub use decode::decode_bucket_key;
pub use lanes::{crop_label, natural_cmp, order_lanes};
pub use plot::{
    build_plot, events_at, series_index, tooltip_lines, LaneTick, PlotModel, PlotPoint,
    PlotSeries,
};
pub use resolve::{LaneAccumulator, Placement};

/// Flatten an aggregation response given as a JSON string.
pub fn flatten_response_str(
    response_json: &str,
    layout: &AggregationLayout,
    config: &SwimlaneConfig,
) -> Result<SwimlaneSnapshot, SwimlaneError> {
    let value: Value = serde_json::from_str(response_json)
        .map_err(|err| SwimlaneError::Parse(err.to_string()))?;
    Ok(flatten_response_value(&value, layout, config))
}

/// Flatten an aggregation response.
///
/// Accepts a full search response or its `aggregations` object. Malformed
/// buckets are skipped; a layout without metric or time split yields an empty
/// snapshot.
pub fn flatten_response_value(
    response: &Value,
    layout: &AggregationLayout,
    config: &SwimlaneConfig,
) -> SwimlaneSnapshot {
    let aggregations = response.get("aggregations").unwrap_or(response);

    let (Some(metric_id), Some(time_split_id)) = (
        layout.metric_id.as_deref(),
        layout.time_split_id.as_deref(),
    ) else {
        warn!("swimlane layout lacks a metric or time split aggregation, no lanes produced");
        return SwimlaneSnapshot::default();
    };

    let mut lanes = LaneAccumulator::new(config.conflict_policy);

    match layout.view_by_id.as_deref() {
        Some(view_by_id) => {
            let buckets = category_buckets(aggregations.get(view_by_id));
            if buckets.is_empty() {
                debug!(view_by_id, "no category buckets in response");
            }
            for (raw_key, bucket) in buckets {
                add_category_bucket(&mut lanes, &raw_key, bucket, time_split_id, metric_id, config);
            }
        }
        None => add_single_lane(
            &mut lanes,
            &layout.metric_label,
            aggregations.get(time_split_id),
            metric_id,
        ),
    }

    let lanes = lanes.finish();
    let labels: Vec<String> = lanes.iter().map(|lane| lane.label.clone()).collect();
    let lane_order = order_lanes(&labels, config.sort_mode);

    debug!(lanes = lanes.len(), sort_mode = ?config.sort_mode, "flattened swimlane aggregation");
    SwimlaneSnapshot::new(lanes, lane_order)
}

fn add_category_bucket(
    lanes: &mut LaneAccumulator,
    raw_key: &str,
    bucket: &Value,
    time_split_id: &str,
    metric_id: &str,
    config: &SwimlaneConfig,
) {
    let key = decode_bucket_key(raw_key, config);
    let Some(label) = key.carrier_code.clone() else {
        debug!(key = raw_key, "bucket key has no carrier code, skipping");
        return;
    };

    let events: Vec<FlightEvent> = time_buckets(bucket.get(time_split_id))
        .into_iter()
        .filter_map(|time_bucket| {
            let Some(time) = time_bucket.get("key").and_then(integral) else {
                debug!(key = raw_key, "time bucket without a usable key, skipping");
                return None;
            };
            let Some(status) = metric_value(time_bucket, metric_id) else {
                debug!(key = raw_key, time, "time bucket without a status value, skipping");
                return None;
            };
            Some(FlightEvent::new(key.clone(), time, status))
        })
        .collect();

    if events.is_empty() {
        debug!(key = raw_key, "category bucket has no usable time buckets, skipping");
        return;
    }

    // One per merged flight, whatever its upstream document count.
    lanes.count(&label, 1);
    for event in events {
        let (time, status) = (event.time, event.status);
        let placement = lanes.insert(&label, event);
        trace!(lane = %label, time, status, ?placement, "placed flight event");
    }
}

fn add_single_lane(
    lanes: &mut LaneAccumulator,
    label: &str,
    time_split: Option<&Value>,
    metric_id: &str,
) {
    let buckets = time_buckets(time_split);
    let mut documents: u64 = 0;

    for bucket in buckets {
        let (Some(time), Some(value)) = (
            bucket.get("key").and_then(integral),
            metric_value(bucket, metric_id),
        ) else {
            debug!(lane = label, "time bucket without key or value, skipping");
            continue;
        };
        lanes.insert_value(label, time, value);
        documents = documents.saturating_add(doc_count(bucket));
    }

    if documents > 0 {
        lanes.count(label, documents);
    }
}

/// Category buckets as `(key, bucket)` pairs, from either a bucket array or a
/// keyed bucket object.
fn category_buckets(aggregation: Option<&Value>) -> Vec<(String, &Value)> {
    match aggregation.and_then(|agg| agg.get("buckets")) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|bucket| bucket.get("key").and_then(key_text).map(|key| (key, bucket)))
            .collect(),
        Some(Value::Object(map)) => map.iter().map(|(key, bucket)| (key.clone(), bucket)).collect(),
        _ => Vec::new(),
    }
}

fn time_buckets(aggregation: Option<&Value>) -> Vec<&Value> {
    match aggregation.and_then(|agg| agg.get("buckets")) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => Vec::new(),
    }
}

fn metric_value(bucket: &Value, metric_id: &str) -> Option<i64> {
    bucket.get(metric_id)?.get("value").and_then(integral)
}

fn doc_count(bucket: &Value) -> u64 {
    bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(1)
}

fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Integer reading of a number or numeric string. Fractions are rejected.
fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
