//! Reversible chart edits
//!
//! Every edit is one variant of [`Operation`]. Constructors validate the edit
//! against the chart as it stands and capture what is needed to revert it;
//! an edit that would change nothing is built as *ineffective* and the log
//! records it as a no-op.
//!
//! Node ids captured by an operation stay valid across undo and redo:
//! removed nodes are only detached, and reverting links the same nodes back.

use std::ops::{BitOr, BitOrAssign};

use serde::Serialize;

use crate::chart::{Chart, EventTarget};
use crate::errors::{ChartError, ChartResult};
use crate::models::easing::Easing;
use crate::models::time::RationalTime;
use crate::timeline::bpm::{validate_bpm, RemovedSegment};
use crate::timeline::event_list::{IndexedEventList, InsertOutcome};
use crate::timeline::node::{NodeId, NodeKind};

/// Side effects an edit asks the host to handle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectFlags {
    /// Redraw what is on screen
    pub refresh_display: bool,
    /// Recompute derived counts (note timing, combo totals)
    pub recount: bool,
    /// Re-lay out the timeline view
    pub reflow: bool,
}

impl EffectFlags {
    pub const NONE: EffectFlags = EffectFlags {
        refresh_display: false,
        recount: false,
        reflow: false,
    };
    pub const DISPLAY: EffectFlags = EffectFlags {
        refresh_display: true,
        recount: false,
        reflow: false,
    };
    pub const STRUCTURE: EffectFlags = EffectFlags {
        refresh_display: true,
        recount: false,
        reflow: true,
    };
    pub const ALL: EffectFlags = EffectFlags {
        refresh_display: true,
        recount: true,
        reflow: true,
    };

    pub fn is_empty(self) -> bool {
        self == Self::NONE
    }
}

impl BitOr for EffectFlags {
    type Output = EffectFlags;

    fn bitor(self, rhs: Self) -> Self {
        EffectFlags {
            refresh_display: self.refresh_display || rhs.refresh_display,
            recount: self.recount || rhs.recount,
            reflow: self.reflow || rhs.reflow,
        }
    }
}

impl BitOrAssign for EffectFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Tag of an operation, compared before offering a coalesce
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    SetValue,
    SetEasing,
    InsertBoundary,
    RemoveBoundary,
    RetimeBoundary,
    SetBpm,
    InsertTempo,
    RemoveTempo,
    RetimeTempo,
    SetLineName,
    Composite,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetValueOp {
    target: EventTarget,
    node: NodeId,
    previous: f64,
    value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetEasingOp {
    target: EventTarget,
    start: NodeId,
    previous: Easing,
    easing: Easing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertBoundaryOp {
    target: EventTarget,
    time: RationalTime,
    end_value: f64,
    start_value: f64,
    ineffective: bool,
    /// Filled in by the first apply
    outcome: Option<InsertOutcome<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveBoundaryOp {
    target: EventTarget,
    before: NodeId,
    end: NodeId,
    start: NodeId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetimeBoundaryOp {
    target: EventTarget,
    end: NodeId,
    start: NodeId,
    previous: RationalTime,
    time: RationalTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetBpmOp {
    start: NodeId,
    previous: f64,
    bpm: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertTempoOp {
    time: RationalTime,
    bpm: f64,
    ineffective: bool,
    outcome: Option<InsertOutcome<f64>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveTempoOp {
    removed: RemovedSegment,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RetimeTempoOp {
    start: NodeId,
    previous: RationalTime,
    time: RationalTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetLineNameOp {
    line: usize,
    previous: String,
    name: String,
}

/// A reversible edit of a [`Chart`]
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    SetValue(SetValueOp),
    SetEasing(SetEasingOp),
    InsertBoundary(InsertBoundaryOp),
    RemoveBoundary(RemoveBoundaryOp),
    RetimeBoundary(RetimeBoundaryOp),
    SetBpm(SetBpmOp),
    InsertTempo(InsertTempoOp),
    RemoveTempo(RemoveTempoOp),
    RetimeTempo(RetimeTempoOp),
    SetLineName(SetLineNameOp),
    /// Fixed ordered group applied and reverted as one step
    Composite(Vec<Operation>),
}

/// The `(End, Start)` boundary pair in front of `start`
fn boundary_pair(list: &IndexedEventList<f64>, start: NodeId) -> ChartResult<(NodeId, NodeId)> {
    if list.kind(start)? != NodeKind::Start {
        return Err(ChartError::structural(format!(
            "node {} is not an event start",
            start.index()
        )));
    }
    let end = list.prev(start)?;
    if list.kind(end)? != NodeKind::End {
        return Err(ChartError::structural("the first event start has no boundary in front of it"));
    }
    Ok((end, start))
}

/// Check that the boundary `end -> start` may move to `time`
fn check_retime(list: &IndexedEventList<f64>, end: NodeId, start: NodeId, time: RationalTime) -> ChartResult<()> {
    let lower = list.time(list.prev(end)?)?;
    let upper = list.time(list.next(start)?).ok();
    if time < lower || upper.map_or(false, |upper| time > upper) {
        log::warn!("rejected boundary retime of node {} to {}", start.index(), time);
        return Err(ChartError::structural(format!(
            "moving the boundary to {} would break time order",
            time
        )));
    }
    Ok(())
}

fn check_value(value: f64) -> ChartResult<()> {
    if !value.is_finite() {
        log::warn!("rejected non-finite event value {}", value);
        return Err(ChartError::value(format!("event value must be finite, got {}", value)));
    }
    Ok(())
}

impl Operation {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Set the value of an event Start or End
    pub fn set_value(chart: &Chart, target: EventTarget, node: NodeId, value: f64) -> ChartResult<Self> {
        check_value(value)?;
        let previous = *chart.events(target)?.value(node)?;
        Ok(Operation::SetValue(SetValueOp {
            target,
            node,
            previous,
            value,
        }))
    }

    /// Set the easing of the event begun by `start`
    pub fn set_easing(chart: &Chart, target: EventTarget, start: NodeId, easing: Easing) -> ChartResult<Self> {
        let previous = chart.events(target)?.easing(start)?;
        Ok(Operation::SetEasing(SetEasingOp {
            target,
            start,
            previous,
            easing,
        }))
    }

    /// Split the event covering `time` with a boundary. On an existing
    /// boundary the values are overwritten instead.
    pub fn insert_boundary(
        chart: &Chart,
        target: EventTarget,
        time: RationalTime,
        end_value: f64,
        start_value: f64,
    ) -> ChartResult<Self> {
        check_value(end_value)?;
        check_value(start_value)?;
        let list = chart.events(target)?;
        let event = list.get_node_at(time, true);
        let ineffective = match list.merge_target(event, time)? {
            Some((end, start)) => {
                let end_same = end.map_or(true, |end| list.value(end).map_or(false, |v| *v == end_value));
                end_same && *list.value(start)? == start_value
            }
            None => false,
        };
        Ok(Operation::InsertBoundary(InsertBoundaryOp {
            target,
            time,
            end_value,
            start_value,
            ineffective,
            outcome: None,
        }))
    }

    /// Remove the boundary in front of `start`, joining the two events
    pub fn remove_boundary(chart: &Chart, target: EventTarget, start: NodeId) -> ChartResult<Self> {
        let list = chart.events(target)?;
        let (end, start) = boundary_pair(list, start)?;
        let before = list.prev(end)?;
        Ok(Operation::RemoveBoundary(RemoveBoundaryOp {
            target,
            before,
            end,
            start,
        }))
    }

    /// Move the boundary in front of `start` to `time`
    pub fn retime_boundary(
        chart: &Chart,
        target: EventTarget,
        start: NodeId,
        time: RationalTime,
    ) -> ChartResult<Self> {
        let list = chart.events(target)?;
        let (end, start) = boundary_pair(list, start)?;
        check_retime(list, end, start, time)?;
        Ok(Operation::RetimeBoundary(RetimeBoundaryOp {
            target,
            end,
            start,
            previous: list.time(start)?,
            time,
        }))
    }

    /// Set the tempo of the segment begun by `start`
    pub fn set_bpm(chart: &Chart, start: NodeId, bpm: f64) -> ChartResult<Self> {
        validate_bpm(bpm)?;
        let list = chart.bpm().list();
        if list.kind(start)? != NodeKind::Start {
            return Err(ChartError::structural("tempo can only be set on a segment start"));
        }
        Ok(Operation::SetBpm(SetBpmOp {
            start,
            previous: *list.value(start)?,
            bpm,
        }))
    }

    /// Start a tempo segment at `time`
    pub fn insert_tempo(chart: &Chart, time: RationalTime, bpm: f64) -> ChartResult<Self> {
        validate_bpm(bpm)?;
        let list = chart.bpm().list();
        let segment = list.get_node_at(time, true);
        let ineffective = match list.merge_target(segment, time)? {
            Some((_, start)) => *list.value(start)? == bpm,
            None => false,
        };
        Ok(Operation::InsertTempo(InsertTempoOp {
            time,
            bpm,
            ineffective,
            outcome: None,
        }))
    }

    /// Remove the tempo segment begun by `start`
    pub fn remove_tempo(chart: &Chart, start: NodeId) -> ChartResult<Self> {
        let removed = chart.bpm().boundary_of(start)?;
        Ok(Operation::RemoveTempo(RemoveTempoOp { removed }))
    }

    /// Move the start of a tempo segment to `time`
    pub fn retime_tempo(chart: &Chart, start: NodeId, time: RationalTime) -> ChartResult<Self> {
        chart.bpm().check_retime(start, time)?;
        Ok(Operation::RetimeTempo(RetimeTempoOp {
            start,
            previous: chart.bpm().list().time(start)?,
            time,
        }))
    }

    pub fn set_line_name(chart: &Chart, line: usize, name: impl Into<String>) -> ChartResult<Self> {
        let previous = chart.line(line)?.name.clone();
        Ok(Operation::SetLineName(SetLineNameOp {
            line,
            previous,
            name: name.into(),
        }))
    }

    /// Group edits into one undo step. Members are validated against the
    /// chart as it stands when each of them was built.
    pub fn composite(operations: Vec<Operation>) -> Self {
        Operation::Composite(operations)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::SetValue(_) => OperationKind::SetValue,
            Operation::SetEasing(_) => OperationKind::SetEasing,
            Operation::InsertBoundary(_) => OperationKind::InsertBoundary,
            Operation::RemoveBoundary(_) => OperationKind::RemoveBoundary,
            Operation::RetimeBoundary(_) => OperationKind::RetimeBoundary,
            Operation::SetBpm(_) => OperationKind::SetBpm,
            Operation::InsertTempo(_) => OperationKind::InsertTempo,
            Operation::RemoveTempo(_) => OperationKind::RemoveTempo,
            Operation::RetimeTempo(_) => OperationKind::RetimeTempo,
            Operation::SetLineName(_) => OperationKind::SetLineName,
            Operation::Composite(_) => OperationKind::Composite,
        }
    }

    /// Whether applying this operation would leave the chart unchanged
    pub fn is_ineffective(&self) -> bool {
        match self {
            Operation::SetValue(op) => op.previous == op.value,
            Operation::SetEasing(op) => op.previous == op.easing,
            Operation::InsertBoundary(op) => op.ineffective,
            Operation::RemoveBoundary(_) | Operation::RemoveTempo(_) => false,
            Operation::RetimeBoundary(op) => op.previous == op.time,
            Operation::SetBpm(op) => op.previous == op.bpm,
            Operation::InsertTempo(op) => op.ineffective,
            Operation::RetimeTempo(op) => op.previous == op.time,
            Operation::SetLineName(op) => op.previous == op.name,
            Operation::Composite(ops) => ops.iter().all(Operation::is_ineffective),
        }
    }

    /// Flags raised on apply, undo and redo
    pub fn effects(&self) -> EffectFlags {
        match self {
            Operation::SetValue(_) | Operation::SetEasing(_) | Operation::SetLineName(_) => EffectFlags::DISPLAY,
            Operation::InsertBoundary(_) | Operation::RemoveBoundary(_) | Operation::RetimeBoundary(_) => {
                EffectFlags::STRUCTURE
            }
            Operation::SetBpm(_)
            | Operation::InsertTempo(_)
            | Operation::RemoveTempo(_)
            | Operation::RetimeTempo(_) => EffectFlags::ALL,
            Operation::Composite(ops) => ops
                .iter()
                .filter(|op| !op.is_ineffective())
                .fold(EffectFlags::NONE, |flags, op| flags | op.effects()),
        }
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    pub fn apply(&mut self, chart: &mut Chart) -> ChartResult<()> {
        match self {
            Operation::SetValue(op) => {
                chart.events_mut(op.target)?.set_value(op.node, op.value)?;
            }
            Operation::SetEasing(op) => {
                chart.events_mut(op.target)?.set_easing(op.start, op.easing)?;
            }
            Operation::InsertBoundary(op) => {
                let list = chart.events_mut(op.target)?;
                match op.outcome.clone() {
                    None => {
                        let event = list.get_node_at(op.time, true);
                        op.outcome = Some(list.insert_pair(event, op.time, op.end_value, op.start_value)?);
                    }
                    Some(InsertOutcome::Inserted { end, start }) => {
                        let event = list.get_node_at(op.time, true);
                        list.splice_pair(event, end, start)?;
                    }
                    Some(InsertOutcome::Merged { end, start }) => {
                        if let Some((end, _)) = end {
                            list.set_value(end, op.end_value)?;
                        }
                        list.set_value(start.0, op.start_value)?;
                    }
                }
            }
            Operation::RemoveBoundary(op) => {
                chart.events_mut(op.target)?.remove_pair(op.end, op.start)?;
            }
            Operation::RetimeBoundary(op) => {
                chart.events_mut(op.target)?.retime_pair(op.end, op.start, op.time)?;
            }
            Operation::SetBpm(op) => {
                chart.bpm_mut().set_bpm(op.start, op.bpm)?;
            }
            Operation::InsertTempo(op) => {
                let bpm = chart.bpm_mut();
                match op.outcome.clone() {
                    None => op.outcome = Some(bpm.insert_segment(op.time, op.bpm)?),
                    Some(InsertOutcome::Inserted { end, start }) => {
                        let before = bpm.list().get_node_at(op.time, true);
                        bpm.restore_segment(RemovedSegment { before, end, start })?;
                    }
                    Some(InsertOutcome::Merged { start, .. }) => {
                        bpm.set_bpm(start.0, op.bpm)?;
                    }
                }
            }
            Operation::RemoveTempo(op) => {
                chart.bpm_mut().remove_segment(op.removed.start)?;
            }
            Operation::RetimeTempo(op) => {
                chart.bpm_mut().retime_segment(op.start, op.time)?;
            }
            Operation::SetLineName(op) => {
                chart.line_mut(op.line)?.name = op.name.clone();
            }
            Operation::Composite(ops) => {
                for op in ops.iter_mut().filter(|op| !op.is_ineffective()) {
                    op.apply(chart)?;
                }
            }
        }
        Ok(())
    }

    pub fn revert(&mut self, chart: &mut Chart) -> ChartResult<()> {
        match self {
            Operation::SetValue(op) => {
                chart.events_mut(op.target)?.set_value(op.node, op.previous)?;
            }
            Operation::SetEasing(op) => {
                chart.events_mut(op.target)?.set_easing(op.start, op.previous)?;
            }
            Operation::InsertBoundary(op) => {
                let list = chart.events_mut(op.target)?;
                match &op.outcome {
                    None => return Err(ChartError::structural("boundary insert was never applied")),
                    Some(InsertOutcome::Inserted { end, start }) => list.remove_pair(*end, *start)?,
                    Some(InsertOutcome::Merged { end, start }) => {
                        if let Some((end, value)) = end {
                            list.set_value(*end, *value)?;
                        }
                        list.set_value(start.0, start.1)?;
                    }
                }
            }
            Operation::RemoveBoundary(op) => {
                chart.events_mut(op.target)?.splice_pair(op.before, op.end, op.start)?;
            }
            Operation::RetimeBoundary(op) => {
                chart.events_mut(op.target)?.retime_pair(op.end, op.start, op.previous)?;
            }
            Operation::SetBpm(op) => {
                chart.bpm_mut().set_bpm(op.start, op.previous)?;
            }
            Operation::InsertTempo(op) => {
                let bpm = chart.bpm_mut();
                match &op.outcome {
                    None => return Err(ChartError::structural("tempo insert was never applied")),
                    Some(InsertOutcome::Inserted { start, .. }) => {
                        bpm.remove_segment(*start)?;
                    }
                    Some(merged) => bpm.restore_merged(merged)?,
                }
            }
            Operation::RemoveTempo(op) => {
                chart.bpm_mut().restore_segment(op.removed)?;
            }
            Operation::RetimeTempo(op) => {
                chart.bpm_mut().retime_segment(op.start, op.previous)?;
            }
            Operation::SetLineName(op) => {
                chart.line_mut(op.line)?.name = op.previous.clone();
            }
            Operation::Composite(ops) => {
                for op in ops.iter_mut().rev().filter(|op| !op.is_ineffective()) {
                    op.revert(chart)?;
                }
            }
        }
        Ok(())
    }

    /// Absorb `next` into this already-applied operation when both edit the
    /// same field of the same entity. The new value replaces ours; our
    /// `previous` stays, so one revert undoes the whole chain.
    pub fn try_coalesce(&mut self, next: &Operation) -> bool {
        match (self, next) {
            (Operation::SetValue(op), Operation::SetValue(next))
                if op.target == next.target && op.node == next.node =>
            {
                op.value = next.value;
                true
            }
            (Operation::SetEasing(op), Operation::SetEasing(next))
                if op.target == next.target && op.start == next.start =>
            {
                op.easing = next.easing;
                true
            }
            (Operation::RetimeBoundary(op), Operation::RetimeBoundary(next))
                if op.target == next.target && op.end == next.end && op.start == next.start =>
            {
                op.time = next.time;
                true
            }
            (Operation::SetBpm(op), Operation::SetBpm(next)) if op.start == next.start => {
                op.bpm = next.bpm;
                true
            }
            (Operation::RetimeTempo(op), Operation::RetimeTempo(next)) if op.start == next.start => {
                op.time = next.time;
                true
            }
            (Operation::SetLineName(op), Operation::SetLineName(next)) if op.line == next.line => {
                op.name = next.name.clone();
                true
            }
            _ => false,
        }
    }
}
