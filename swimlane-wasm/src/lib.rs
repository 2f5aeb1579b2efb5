//! Framework-neutral WASM <-> JavaScript bridge for the swimlane flattener.

use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use swimlane_core::{
    AggregationLayout, ConflictPolicy, SchemaVersion, SortMode, StatusTable, SwimlaneConfig,
    SwimlaneSnapshot, ThresholdBand,
};
use wasm_bindgen::prelude::*;

/// Host options. Anything left out keeps its default.
#[derive(Deserialize)]
struct JsSwimlaneConfig {
    #[serde(default)]
    schema_version: Option<SchemaVersion>,
    #[serde(default, alias = "alphabetSortLaneLabels")]
    sort_mode: Option<SortMode>,
    #[serde(default)]
    label_max_chars: Option<usize>,
    #[serde(default, alias = "thresholdBands")]
    threshold_bands: Option<Vec<ThresholdBand>>,
    #[serde(default, alias = "unknownThresholdColor")]
    unknown_threshold_color: Option<String>,
    #[serde(default)]
    status_labels: Option<StatusTable>,
    #[serde(default)]
    conflict_policy: Option<ConflictPolicy>,
    #[serde(default)]
    delimiter_substitute: Option<char>,
}

impl From<JsSwimlaneConfig> for SwimlaneConfig {
    fn from(cfg: JsSwimlaneConfig) -> Self {
        let mut base = SwimlaneConfig::default();
        if let Some(version) = cfg.schema_version {
            base.schema_version = version;
        }
        if let Some(mode) = cfg.sort_mode {
            base.sort_mode = mode;
        }
        if let Some(max) = cfg.label_max_chars {
            base.label_max_chars = max;
        }
        if let Some(bands) = cfg.threshold_bands {
            base.threshold_bands = bands;
        }
        if let Some(color) = cfg.unknown_threshold_color {
            base.unknown_threshold_color = color;
        }
        if let Some(labels) = cfg.status_labels {
            base.status_labels = labels;
        }
        if let Some(policy) = cfg.conflict_policy {
            base.conflict_policy = policy;
        }
        if let Some(substitute) = cfg.delimiter_substitute {
            base.delimiter_substitute = substitute;
        }
        base
    }
}

#[wasm_bindgen]
pub fn flatten_aggregations(
    response: JsValue,
    layout: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let response = from_value::<serde_json::Value>(response)
        .map_err(|err| JsValue::from_str(&format!("could not read aggregation response: {err}")))?;
    let layout: AggregationLayout = from_value(layout)
        .map_err(|err| JsValue::from_str(&format!("could not read aggregation layout: {err}")))?;
    let cfg = read_config(config)?;

    let snapshot = swimlane_es::flatten_response_value(&response, &layout, &cfg);

    to_value(&snapshot).map_err(|err| JsValue::from_str(&format!("could not serialize snapshot: {err}")))
}

/// Series and lane ticks for a snapshot returned by `flatten_aggregations`.
#[wasm_bindgen]
pub fn plot_model(snapshot: JsValue, config: Option<JsValue>) -> Result<JsValue, JsValue> {
    let snapshot = read_snapshot(snapshot)?;
    let cfg = read_config(config)?;

    to_value(&swimlane_es::build_plot(&snapshot, &cfg))
        .map_err(|err| JsValue::from_str(&format!("could not serialize plot: {err}")))
}

/// Tooltip lines for the marker at `lane` and `time`.
#[wasm_bindgen]
pub fn tooltip(
    snapshot: JsValue,
    lane: &str,
    time: f64,
    config: Option<JsValue>,
) -> Result<Vec<String>, JsValue> {
    let snapshot = read_snapshot(snapshot)?;
    let cfg = read_config(config)?;

    Ok(swimlane_es::tooltip_lines(
        &snapshot,
        lane,
        time as i64,
        &cfg.status_labels,
    ))
}

/// Label for a status code, empty when the code is not mapped.
#[wasm_bindgen]
pub fn status_label(code: i32, config: Option<JsValue>) -> Result<String, JsValue> {
    let cfg = read_config(config)?;
    Ok(cfg
        .status_labels
        .label(i64::from(code))
        .unwrap_or_default()
        .to_string())
}

fn read_config(config: Option<JsValue>) -> Result<SwimlaneConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsSwimlaneConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            Ok(SwimlaneConfig::from(cfg))
        }
        _ => Ok(SwimlaneConfig::default()),
    }
}

fn read_snapshot(snapshot: JsValue) -> Result<SwimlaneSnapshot, JsValue> {
    from_value(snapshot).map_err(|err| JsValue::from_str(&format!("could not read snapshot: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_config_overrides_only_given_fields() {
        let cfg: JsSwimlaneConfig = serde_json::from_value(serde_json::json!({
            "alphabetSortLaneLabels": "asc",
            "thresholdBands": [{ "value": 1, "color": "#fff" }],
            "status_labels": [{ "code": 2, "label": "Scheduled" }]
        }))
        .unwrap();

        let cfg = SwimlaneConfig::from(cfg);
        assert_eq!(cfg.sort_mode, SortMode::Asc);
        assert_eq!(cfg.threshold_bands, vec![ThresholdBand::new(1, "#fff")]);
        assert_eq!(cfg.status_labels.label(2), Some("Scheduled"));
        assert_eq!(cfg.schema_version, SchemaVersion::V2);
        assert_eq!(cfg.label_max_chars, 27);
    }
}
