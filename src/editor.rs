//! Chart editor: a chart, its edit log and the engine configuration
//!
//! Hosts never mutate the chart directly. Every edit goes through
//! [`ChartEditor::apply`] (or one of the helpers built on it) so it can be
//! undone, and every call reports the side effects the host should handle.
//! Nodes are addressed by their arena index, which stays stable for the
//! life of a node.

use serde::{Deserialize, Serialize};

use crate::chart::{Chart, EventTarget};
use crate::config::EngineConfig;
use crate::errors::ChartResult;
use crate::models::easing::Easing;
use crate::models::time::RationalTime;
use crate::timeline::node::{NodeId, NodeKind};
use crate::undo::{EditLog, EditOutcome, Operation};

/// Undo/redo availability, for enabling host controls
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditState {
    pub can_undo: bool,
    pub can_redo: bool,
    pub undo_count: usize,
    pub redo_count: usize,
}

/// One linked node of an event list, as shown to the host
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub index: u32,
    pub kind: NodeKind,
    pub time: RationalTime,
    pub value: f64,
    /// Only Starts carry an easing
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub easing: Option<Easing>,
}

#[derive(Debug)]
pub struct ChartEditor {
    chart: Chart,
    log: EditLog,
    config: EngineConfig,
}

impl ChartEditor {
    pub fn new(chart: Chart) -> Self {
        Self::with_config(chart, EngineConfig::default())
    }

    pub fn with_config(chart: Chart, config: EngineConfig) -> Self {
        Self {
            chart,
            log: EditLog::new(config.undo_limit),
            config,
        }
    }

    /// Parse a chart and start with an empty history
    pub fn from_json(json: &str, config: EngineConfig) -> ChartResult<Self> {
        let chart = Chart::from_json(json, &config)?;
        Ok(Self::with_config(chart, config))
    }

    pub fn to_json(&self) -> ChartResult<String> {
        self.chart.to_json()
    }

    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn edit_state(&self) -> EditState {
        EditState {
            can_undo: self.log.can_undo(),
            can_redo: self.log.can_redo(),
            undo_count: self.log.undo_count(),
            redo_count: self.log.redo_count(),
        }
    }

    /// Replace the chart; the history no longer applies and is dropped
    pub fn replace_chart(&mut self, chart: Chart) {
        self.chart = chart;
        self.log.clear();
    }

    // ------------------------------------------------------------------
    // Edit log
    // ------------------------------------------------------------------

    pub fn apply(&mut self, op: Operation) -> ChartResult<EditOutcome> {
        self.log.apply(op, &mut self.chart)
    }

    pub fn undo(&mut self) -> ChartResult<EditOutcome> {
        self.log.undo(&mut self.chart)
    }

    pub fn redo(&mut self) -> ChartResult<EditOutcome> {
        self.log.redo(&mut self.chart)
    }

    // ------------------------------------------------------------------
    // Node addressing
    // ------------------------------------------------------------------

    pub fn event_node(&self, target: EventTarget, index: u32) -> ChartResult<NodeId> {
        self.chart.events(target)?.node_id(index)
    }

    pub fn tempo_node(&self, index: u32) -> ChartResult<NodeId> {
        self.chart.bpm().list().node_id(index)
    }

    /// Every Start and End of an event list in time order
    pub fn list_nodes(&self, target: EventTarget) -> ChartResult<Vec<NodeInfo>> {
        let list = self.chart.events(target)?;
        let mut nodes = Vec::with_capacity(list.len());
        for start in list.starts() {
            nodes.push(NodeInfo {
                index: start.index(),
                kind: NodeKind::Start,
                time: list.time(start)?,
                value: *list.value(start)?,
                easing: Some(list.easing(start)?),
            });
            if let Some(end) = list.end_of(start) {
                nodes.push(NodeInfo {
                    index: end.index(),
                    kind: NodeKind::End,
                    time: list.time(end)?,
                    value: *list.value(end)?,
                    easing: None,
                });
            }
        }
        Ok(nodes)
    }

    /// `count` evenly spaced channel values from `from` to `to` inclusive,
    /// for drawing a curve preview
    pub fn sample_values(
        &self,
        target: EventTarget,
        from: RationalTime,
        to: RationalTime,
        count: usize,
    ) -> ChartResult<Vec<f64>> {
        let list = self.chart.events(target)?;
        if count < 2 {
            return Ok(vec![list.value_at(from); count]);
        }
        let step = to.checked_sub(from)?.mul_ratio(1, count as i64 - 1)?;
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            let at = from.checked_add(step.mul_ratio(i as i64, 1)?)?;
            values.push(list.value_at(at));
        }
        Ok(values)
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    pub fn set_event_value(&mut self, target: EventTarget, index: u32, value: f64) -> ChartResult<EditOutcome> {
        let node = self.event_node(target, index)?;
        let op = Operation::set_value(&self.chart, target, node, value)?;
        self.apply(op)
    }

    pub fn set_event_easing(&mut self, target: EventTarget, index: u32, easing: Easing) -> ChartResult<EditOutcome> {
        let start = self.event_node(target, index)?;
        let op = Operation::set_easing(&self.chart, target, start, easing)?;
        self.apply(op)
    }

    /// Set both sides of the boundary in front of a Start as one step
    pub fn set_boundary_values(
        &mut self,
        target: EventTarget,
        start_index: u32,
        end_value: f64,
        start_value: f64,
    ) -> ChartResult<EditOutcome> {
        let start = self.event_node(target, start_index)?;
        let end = self.chart.events(target)?.prev(start)?;
        let op = Operation::composite(vec![
            Operation::set_value(&self.chart, target, end, end_value)?,
            Operation::set_value(&self.chart, target, start, start_value)?,
        ]);
        self.apply(op)
    }

    pub fn insert_boundary(
        &mut self,
        target: EventTarget,
        time: RationalTime,
        end_value: f64,
        start_value: f64,
    ) -> ChartResult<EditOutcome> {
        let op = Operation::insert_boundary(&self.chart, target, time, end_value, start_value)?;
        self.apply(op)
    }

    pub fn remove_boundary(&mut self, target: EventTarget, start_index: u32) -> ChartResult<EditOutcome> {
        let start = self.event_node(target, start_index)?;
        let op = Operation::remove_boundary(&self.chart, target, start)?;
        self.apply(op)
    }

    pub fn retime_boundary(
        &mut self,
        target: EventTarget,
        start_index: u32,
        time: RationalTime,
    ) -> ChartResult<EditOutcome> {
        let start = self.event_node(target, start_index)?;
        let op = Operation::retime_boundary(&self.chart, target, start, time)?;
        self.apply(op)
    }

    /// Set the tempo in effect at `time`
    pub fn set_bpm(&mut self, time: RationalTime, bpm: f64) -> ChartResult<EditOutcome> {
        let start = self.chart.bpm().list().get_node_at(time, false);
        let op = Operation::set_bpm(&self.chart, start, bpm)?;
        self.apply(op)
    }

    pub fn insert_tempo(&mut self, time: RationalTime, bpm: f64) -> ChartResult<EditOutcome> {
        let op = Operation::insert_tempo(&self.chart, time, bpm)?;
        self.apply(op)
    }

    pub fn remove_tempo(&mut self, start_index: u32) -> ChartResult<EditOutcome> {
        let start = self.tempo_node(start_index)?;
        let op = Operation::remove_tempo(&self.chart, start)?;
        self.apply(op)
    }

    pub fn retime_tempo(&mut self, start_index: u32, time: RationalTime) -> ChartResult<EditOutcome> {
        let start = self.tempo_node(start_index)?;
        let op = Operation::retime_tempo(&self.chart, start, time)?;
        self.apply(op)
    }

    pub fn rename_line(&mut self, line: usize, name: &str) -> ChartResult<EditOutcome> {
        let op = Operation::set_line_name(&self.chart, line, name)?;
        self.apply(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::EventChannel;
    use crate::undo::EffectFlags;

    fn beat(w: i64) -> RationalTime {
        RationalTime::from_integer(w)
    }

    fn editor() -> (ChartEditor, EventTarget) {
        let mut chart = Chart::new(beat(16), 120.0).unwrap();
        let line = chart.add_line("main");
        (ChartEditor::new(chart), EventTarget::new(line, EventChannel::MoveY))
    }

    #[test]
    fn test_list_nodes_in_time_order() {
        let (mut editor, target) = editor();
        editor.insert_boundary(target, beat(4), 1.0, 2.0).unwrap();
        let nodes = editor.list_nodes(target).unwrap();
        let kinds: Vec<NodeKind> = nodes.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Start, NodeKind::End, NodeKind::Start]);
        assert_eq!(nodes[1].time, beat(4));
        assert_eq!(nodes[2].value, 2.0);
        assert!(nodes[1].easing.is_none());
    }

    #[test]
    fn test_edit_state_tracks_history() {
        let (mut editor, target) = editor();
        assert!(!editor.edit_state().can_undo);
        editor.insert_boundary(target, beat(4), 1.0, 2.0).unwrap();
        editor.undo().unwrap();
        assert_eq!(
            editor.edit_state(),
            EditState {
                can_undo: false,
                can_redo: true,
                undo_count: 0,
                redo_count: 1,
            }
        );
    }

    #[test]
    fn test_boundary_values_undo_in_one_step() {
        let (mut editor, target) = editor();
        editor.insert_boundary(target, beat(4), 1.0, 2.0).unwrap();
        let start = editor.chart().events(target).unwrap().tail_start().index();
        let outcome = editor.set_boundary_values(target, start, 1.0, 8.0).unwrap();
        assert_eq!(outcome, EditOutcome::Applied(EffectFlags::DISPLAY));
        assert_eq!(editor.chart().value_at(target, beat(5)).unwrap(), 8.0);
        editor.undo().unwrap();
        assert_eq!(editor.chart().value_at(target, beat(5)).unwrap(), 2.0);
    }

    #[test]
    fn test_set_bpm_targets_segment_in_effect() {
        let (mut editor, _) = editor();
        editor.insert_tempo(beat(8), 240.0).unwrap();
        editor.set_bpm(beat(10), 120.0).unwrap();
        assert!((editor.chart().seconds_at(beat(16)) - 8.0).abs() < 1e-12);
        editor.undo().unwrap();
        assert!((editor.chart().seconds_at(beat(16)) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_rename_line_coalesces() {
        let (mut editor, target) = editor();
        editor.rename_line(target.line, "m").unwrap();
        editor.rename_line(target.line, "ma").unwrap();
        assert_eq!(editor.edit_state().undo_count, 1);
        editor.undo().unwrap();
        assert_eq!(editor.chart().line(target.line).unwrap().name, "main");
    }

    #[test]
    fn test_sample_values() {
        let (mut editor, target) = editor();
        editor.insert_boundary(target, beat(4), 8.0, 8.0).unwrap();
        let values = editor.sample_values(target, beat(0), beat(8), 5).unwrap();
        assert_eq!(values, vec![0.0, 4.0, 8.0, 8.0, 8.0]);
        assert_eq!(editor.sample_values(target, beat(2), beat(8), 1).unwrap(), vec![4.0]);
        assert!(editor.sample_values(target, beat(0), beat(8), 0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_node_index() {
        let (mut editor, target) = editor();
        assert!(editor.set_event_value(target, 99, 1.0).is_err());
        assert!(editor.remove_tempo(0).is_err());
    }

    #[test]
    fn test_replace_chart_clears_history() {
        let (mut editor, target) = editor();
        editor.insert_boundary(target, beat(4), 1.0, 2.0).unwrap();
        editor.replace_chart(Chart::new(beat(4), 90.0).unwrap());
        assert!(!editor.edit_state().can_undo);
    }
}
