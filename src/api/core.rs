//! WASM API for the chart editor
//!
//! The editor lives in WASM memory; JavaScript loads a chart once and then
//! issues edits and queries against it. Edits return the serialized
//! `EditOutcome`, whose effect flags tell the host what to refresh.

use std::sync::Mutex;

use lazy_static::lazy_static;
use wasm_bindgen::prelude::*;

use super::helpers::{
    chart_error, deserialize, editor_poisoned, no_chart_loaded, serialize, target_arg, time_arg,
};
use crate::chart::Chart;
use crate::config::EngineConfig;
use crate::editor::ChartEditor;
use crate::models::easing::Easing;
use crate::undo::EditOutcome;
use crate::{wasm_info, wasm_log, wasm_warn};

// WASM-owned editor storage (canonical source of truth)
lazy_static! {
    static ref EDITOR: Mutex<Option<ChartEditor>> = Mutex::new(None);
}

fn with_editor<T>(f: impl FnOnce(&mut ChartEditor) -> Result<T, JsValue>) -> Result<T, JsValue> {
    let mut guard = EDITOR
        .lock()
        .map_err(|_| editor_poisoned())?;
    let editor = guard.as_mut().ok_or_else(no_chart_loaded)?;
    f(editor)
}

fn outcome_to_js(outcome: EditOutcome) -> Result<JsValue, JsValue> {
    if !outcome.changed() {
        wasm_log!("  {:?}", outcome);
    }
    serialize(&outcome, "Outcome serialization error")
}

// ============================================================================
// Chart lifecycle
// ============================================================================

/// Load a chart from its JSON exchange form, replacing any loaded chart
/// and its history. `config_json` may be omitted for defaults.
#[wasm_bindgen(js_name = loadChart)]
pub fn load_chart(chart_json: &str, config_json: Option<String>) -> Result<(), JsValue> {
    wasm_info!("loadChart called ({} bytes)", chart_json.len());

    let config = match config_json {
        Some(json) => EngineConfig::from_json(&json).map_err(chart_error)?,
        None => EngineConfig::default(),
    };
    let editor = ChartEditor::from_json(chart_json, config).map_err(chart_error)?;
    wasm_info!("  Loaded {} judge line(s)", editor.chart().lines().len());

    *EDITOR
        .lock()
        .map_err(|_| editor_poisoned())? = Some(editor);
    Ok(())
}

/// Start an empty chart at a constant tempo
#[wasm_bindgen(js_name = createChart)]
pub fn create_chart(duration: JsValue, bpm: f64, line_count: usize) -> Result<(), JsValue> {
    wasm_info!("createChart called: bpm={}, lines={}", bpm, line_count);

    let duration = time_arg(duration)?;
    let mut chart = Chart::new(duration, bpm).map_err(chart_error)?;
    for i in 0..line_count {
        chart.add_line(format!("line {}", i));
    }
    *EDITOR
        .lock()
        .map_err(|_| editor_poisoned())? = Some(ChartEditor::new(chart));
    Ok(())
}

#[wasm_bindgen(js_name = exportChart)]
pub fn export_chart() -> Result<String, JsValue> {
    wasm_info!("exportChart called");
    with_editor(|editor| editor.to_json().map_err(chart_error))
}

// ============================================================================
// Queries
// ============================================================================

#[wasm_bindgen(js_name = getValueAt)]
pub fn get_value_at(line: usize, channel: u8, beats: JsValue) -> Result<f64, JsValue> {
    let target = target_arg(line, channel)?;
    let beats = time_arg(beats)?;
    with_editor(|editor| editor.chart().value_at(target, beats).map_err(chart_error))
}

#[wasm_bindgen(js_name = secondsAt)]
pub fn seconds_at(beats: JsValue) -> Result<f64, JsValue> {
    let beats = time_arg(beats)?;
    with_editor(|editor| Ok(editor.chart().seconds_at(beats)))
}

#[wasm_bindgen(js_name = beatsAt)]
pub fn beats_at(seconds: f64) -> Result<f64, JsValue> {
    if !seconds.is_finite() {
        wasm_warn!("beatsAt called with non-finite seconds {}", seconds);
    }
    with_editor(|editor| Ok(editor.chart().beats_at(seconds)))
}

/// Evenly spaced channel values between two beat positions
#[wasm_bindgen(js_name = sampleValues)]
pub fn sample_values(
    line: usize,
    channel: u8,
    from: JsValue,
    to: JsValue,
    count: usize,
) -> Result<js_sys::Float64Array, JsValue> {
    let target = target_arg(line, channel)?;
    let from = time_arg(from)?;
    let to = time_arg(to)?;
    with_editor(|editor| {
        let values = editor.sample_values(target, from, to, count).map_err(chart_error)?;
        Ok(js_sys::Float64Array::from(values.as_slice()))
    })
}

/// Nodes of one event list, for drawing and for addressing edits
#[wasm_bindgen(js_name = listNodes)]
pub fn list_nodes(line: usize, channel: u8) -> Result<JsValue, JsValue> {
    let target = target_arg(line, channel)?;
    with_editor(|editor| {
        let nodes = editor.list_nodes(target).map_err(chart_error)?;
        serialize(&nodes, "Node list serialization error")
    })
}

#[wasm_bindgen(js_name = getEditState)]
pub fn get_edit_state() -> Result<JsValue, JsValue> {
    with_editor(|editor| serialize(&editor.edit_state(), "Edit state serialization error"))
}

// ============================================================================
// Edits
// ============================================================================

#[wasm_bindgen(js_name = setEventValue)]
pub fn set_event_value(line: usize, channel: u8, node: u32, value: f64) -> Result<JsValue, JsValue> {
    wasm_info!("setEventValue called: line={}, channel={}, node={}, value={}", line, channel, node, value);
    let target = target_arg(line, channel)?;
    with_editor(|editor| outcome_to_js(editor.set_event_value(target, node, value).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = setEventEasing)]
pub fn set_event_easing(line: usize, channel: u8, node: u32, easing: JsValue) -> Result<JsValue, JsValue> {
    wasm_info!("setEventEasing called: line={}, channel={}, node={}", line, channel, node);
    let target = target_arg(line, channel)?;
    let easing: Easing = deserialize(easing, "Invalid easing")?;
    with_editor(|editor| outcome_to_js(editor.set_event_easing(target, node, easing).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = setBoundaryValues)]
pub fn set_boundary_values(
    line: usize,
    channel: u8,
    node: u32,
    end_value: f64,
    start_value: f64,
) -> Result<JsValue, JsValue> {
    wasm_info!("setBoundaryValues called: line={}, channel={}, node={}", line, channel, node);
    let target = target_arg(line, channel)?;
    with_editor(|editor| {
        outcome_to_js(
            editor
                .set_boundary_values(target, node, end_value, start_value)
                .map_err(chart_error)?,
        )
    })
}

#[wasm_bindgen(js_name = insertBoundary)]
pub fn insert_boundary(
    line: usize,
    channel: u8,
    time: JsValue,
    end_value: f64,
    start_value: f64,
) -> Result<JsValue, JsValue> {
    let target = target_arg(line, channel)?;
    let time = time_arg(time)?;
    wasm_info!("insertBoundary called: line={}, channel={}, time={}", line, channel, time);
    with_editor(|editor| {
        outcome_to_js(
            editor
                .insert_boundary(target, time, end_value, start_value)
                .map_err(chart_error)?,
        )
    })
}

#[wasm_bindgen(js_name = removeBoundary)]
pub fn remove_boundary(line: usize, channel: u8, node: u32) -> Result<JsValue, JsValue> {
    wasm_info!("removeBoundary called: line={}, channel={}, node={}", line, channel, node);
    let target = target_arg(line, channel)?;
    with_editor(|editor| outcome_to_js(editor.remove_boundary(target, node).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = retimeBoundary)]
pub fn retime_boundary(line: usize, channel: u8, node: u32, time: JsValue) -> Result<JsValue, JsValue> {
    let target = target_arg(line, channel)?;
    let time = time_arg(time)?;
    wasm_info!("retimeBoundary called: line={}, channel={}, node={}, time={}", line, channel, node, time);
    with_editor(|editor| outcome_to_js(editor.retime_boundary(target, node, time).map_err(chart_error)?))
}

/// Change the tempo in effect at `time`
#[wasm_bindgen(js_name = setBpm)]
pub fn set_bpm(time: JsValue, bpm: f64) -> Result<JsValue, JsValue> {
    let time = time_arg(time)?;
    wasm_info!("setBpm called: time={}, bpm={}", time, bpm);
    with_editor(|editor| outcome_to_js(editor.set_bpm(time, bpm).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = insertTempo)]
pub fn insert_tempo(time: JsValue, bpm: f64) -> Result<JsValue, JsValue> {
    let time = time_arg(time)?;
    wasm_info!("insertTempo called: time={}, bpm={}", time, bpm);
    with_editor(|editor| outcome_to_js(editor.insert_tempo(time, bpm).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = removeTempo)]
pub fn remove_tempo(node: u32) -> Result<JsValue, JsValue> {
    wasm_info!("removeTempo called: node={}", node);
    with_editor(|editor| outcome_to_js(editor.remove_tempo(node).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = retimeTempo)]
pub fn retime_tempo(node: u32, time: JsValue) -> Result<JsValue, JsValue> {
    let time = time_arg(time)?;
    wasm_info!("retimeTempo called: node={}, time={}", node, time);
    with_editor(|editor| outcome_to_js(editor.retime_tempo(node, time).map_err(chart_error)?))
}

#[wasm_bindgen(js_name = renameLine)]
pub fn rename_line(line: usize, name: &str) -> Result<JsValue, JsValue> {
    wasm_info!("renameLine called: line={}, name={:?}", line, name);
    with_editor(|editor| outcome_to_js(editor.rename_line(line, name).map_err(chart_error)?))
}

// ============================================================================
// History
// ============================================================================

#[wasm_bindgen]
pub fn undo() -> Result<JsValue, JsValue> {
    wasm_info!("undo called");
    with_editor(|editor| outcome_to_js(editor.undo().map_err(chart_error)?))
}

#[wasm_bindgen]
pub fn redo() -> Result<JsValue, JsValue> {
    wasm_info!("redo called");
    with_editor(|editor| outcome_to_js(editor.redo().map_err(chart_error)?))
}
