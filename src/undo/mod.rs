pub mod operation;

use std::collections::VecDeque;

use serde::Serialize;

use crate::chart::Chart;
use crate::config::DEFAULT_UNDO_LIMIT;
use crate::errors::ChartResult;

pub use operation::{EffectFlags, Operation, OperationKind};

/// What an edit log call did
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "effects", rename_all = "camelCase")]
pub enum EditOutcome {
    /// Pushed as a new undo step
    Applied(EffectFlags),
    /// Folded into the most recent undo step
    Coalesced(EffectFlags),
    /// The operation would change nothing; the log is untouched
    NoOp,
    Undone(EffectFlags),
    Redone(EffectFlags),
    NothingToUndo,
    NothingToRedo,
}

impl EditOutcome {
    /// Flags the host should act on
    pub fn effects(&self) -> EffectFlags {
        match self {
            EditOutcome::Applied(flags)
            | EditOutcome::Coalesced(flags)
            | EditOutcome::Undone(flags)
            | EditOutcome::Redone(flags) => *flags,
            _ => EffectFlags::NONE,
        }
    }

    /// Whether the chart changed
    pub fn changed(&self) -> bool {
        !matches!(
            self,
            EditOutcome::NoOp | EditOutcome::NothingToUndo | EditOutcome::NothingToRedo
        )
    }
}

/// Undo/redo history of chart edits with coalescing
#[derive(Debug)]
pub struct EditLog {
    /// Applied operations, oldest first
    applied: VecDeque<Operation>,
    /// Undone operations, most recently undone last
    undone: Vec<Operation>,
    /// Maximum number of undo steps to keep
    max_size: usize,
}

impl Default for EditLog {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}

impl EditLog {
    pub fn new(max_size: usize) -> Self {
        Self {
            applied: VecDeque::new(),
            undone: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    /// Run `op` against `chart` and record it.
    ///
    /// An ineffective operation is not run. When the most recent step edits
    /// the same field of the same entity, `op` is folded into it. Any new
    /// step drops the redo history.
    pub fn apply(&mut self, mut op: Operation, chart: &mut Chart) -> ChartResult<EditOutcome> {
        if op.is_ineffective() {
            log::debug!("{:?} changes nothing, skipped", op.kind());
            return Ok(EditOutcome::NoOp);
        }

        op.apply(chart)?;
        let flags = op.effects();
        self.undone.clear();

        if let Some(top) = self.applied.back_mut() {
            if top.kind() == op.kind() && top.try_coalesce(&op) {
                log::debug!("{:?} coalesced into the previous step", op.kind());
                return Ok(EditOutcome::Coalesced(flags));
            }
        }

        log::debug!("{:?} applied ({} undo steps)", op.kind(), self.applied.len() + 1);
        self.applied.push_back(op);
        if self.applied.len() > self.max_size {
            self.applied.pop_front();
        }
        Ok(EditOutcome::Applied(flags))
    }

    /// Revert the most recent step
    pub fn undo(&mut self, chart: &mut Chart) -> ChartResult<EditOutcome> {
        let Some(mut op) = self.applied.pop_back() else {
            return Ok(EditOutcome::NothingToUndo);
        };
        if let Err(err) = op.revert(chart) {
            log::error!("undo of {:?} failed: {}", op.kind(), err);
            self.applied.push_back(op);
            return Err(err);
        }
        let flags = op.effects();
        self.undone.push(op);
        Ok(EditOutcome::Undone(flags))
    }

    /// Re-apply the most recently undone step
    pub fn redo(&mut self, chart: &mut Chart) -> ChartResult<EditOutcome> {
        let Some(mut op) = self.undone.pop() else {
            return Ok(EditOutcome::NothingToRedo);
        };
        if let Err(err) = op.apply(chart) {
            log::error!("redo of {:?} failed: {}", op.kind(), err);
            self.undone.push(op);
            return Err(err);
        }
        let flags = op.effects();
        self.applied.push_back(op);
        Ok(EditOutcome::Redone(flags))
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.applied.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.applied.len()
    }

    pub fn redo_count(&self) -> usize {
        self.undone.len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Forget all history, e.g. after loading another chart
    pub fn clear(&mut self) {
        self.applied.clear();
        self.undone.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{EventChannel, EventTarget};
    use crate::models::time::RationalTime;

    fn beat(w: i64) -> RationalTime {
        RationalTime::from_integer(w)
    }

    fn setup() -> (Chart, EventTarget) {
        let mut chart = Chart::new(beat(16), 120.0).unwrap();
        let line = chart.add_line("main");
        (chart, EventTarget::new(line, EventChannel::Rotate))
    }

    fn set_first(chart: &Chart, target: EventTarget, value: f64) -> Operation {
        let start = chart.events(target).unwrap().first_start();
        Operation::set_value(chart, target, start, value).unwrap()
    }

    #[test]
    fn test_apply_undo_redo() {
        let (mut chart, target) = setup();
        let mut log = EditLog::default();
        let op = set_first(&chart, target, 45.0);
        assert_eq!(log.apply(op, &mut chart).unwrap(), EditOutcome::Applied(EffectFlags::DISPLAY));
        assert!(log.can_undo());

        assert_eq!(log.undo(&mut chart).unwrap(), EditOutcome::Undone(EffectFlags::DISPLAY));
        assert_eq!(chart.value_at(target, beat(1)).unwrap(), 0.0);
        assert!(log.can_redo());

        assert_eq!(log.redo(&mut chart).unwrap(), EditOutcome::Redone(EffectFlags::DISPLAY));
        assert_eq!(chart.value_at(target, beat(1)).unwrap(), 45.0);
    }

    #[test]
    fn test_underflow_is_a_signal() {
        let (mut chart, _) = setup();
        let mut log = EditLog::default();
        assert_eq!(log.undo(&mut chart).unwrap(), EditOutcome::NothingToUndo);
        assert_eq!(log.redo(&mut chart).unwrap(), EditOutcome::NothingToRedo);
        assert!(!EditOutcome::NothingToUndo.changed());
    }

    #[test]
    fn test_ineffective_is_noop() {
        let (mut chart, target) = setup();
        let mut log = EditLog::default();
        let op = set_first(&chart, target, 0.0);
        assert_eq!(log.apply(op, &mut chart).unwrap(), EditOutcome::NoOp);
        assert_eq!(log.undo_count(), 0);
    }

    #[test]
    fn test_chained_edits_coalesce() {
        let (mut chart, target) = setup();
        let mut log = EditLog::default();
        for step in 1..=10 {
            let op = set_first(&chart, target, step as f64 * 3.0);
            let outcome = log.apply(op, &mut chart).unwrap();
            if step == 1 {
                assert!(matches!(outcome, EditOutcome::Applied(_)));
            } else {
                assert!(matches!(outcome, EditOutcome::Coalesced(_)));
            }
        }
        assert_eq!(log.undo_count(), 1);
        assert_eq!(chart.value_at(target, beat(1)).unwrap(), 30.0);
        log.undo(&mut chart).unwrap();
        assert_eq!(chart.value_at(target, beat(1)).unwrap(), 0.0);
        assert!(!log.can_undo());
    }

    #[test]
    fn test_new_apply_cuts_redo_history() {
        let (mut chart, target) = setup();
        let other = EventTarget::new(target.line, EventChannel::MoveY);
        let mut log = EditLog::default();
        let first = set_first(&chart, target, 1.0);
        log.apply(first, &mut chart).unwrap();
        let second = set_first(&chart, other, 2.0);
        log.apply(second, &mut chart).unwrap();
        log.undo(&mut chart).unwrap();
        assert!(log.can_redo());

        let third = Operation::insert_boundary(&chart, target, beat(4), 5.0, 5.0).unwrap();
        log.apply(third, &mut chart).unwrap();
        assert!(!log.can_redo());
        assert_eq!(log.redo(&mut chart).unwrap(), EditOutcome::NothingToRedo);
        assert_eq!(chart.value_at(other, beat(1)).unwrap(), 0.0);
    }

    #[test]
    fn test_oldest_step_dropped_at_limit() {
        let (mut chart, target) = setup();
        let mut log = EditLog::new(3);
        for step in 1..=5 {
            let op = Operation::insert_boundary(&chart, target, beat(step), step as f64, step as f64).unwrap();
            log.apply(op, &mut chart).unwrap();
        }
        assert_eq!(log.undo_count(), 3);
        while log.can_undo() {
            log.undo(&mut chart).unwrap();
        }
        // The first two inserts are beyond reach
        assert_eq!(chart.events(target).unwrap().event_count(), 2);
    }

    #[test]
    fn test_equal_time_insert_undo_restores_value() {
        let (mut chart, target) = setup();
        let mut log = EditLog::default();
        let op = Operation::insert_boundary(&chart, target, beat(4), 10.0, 10.0).unwrap();
        log.apply(op, &mut chart).unwrap();
        let len = chart.events(target).unwrap().len();

        let op = Operation::insert_boundary(&chart, target, beat(4), 10.0, 99.0).unwrap();
        log.apply(op, &mut chart).unwrap();
        assert_eq!(chart.events(target).unwrap().len(), len);
        assert_eq!(chart.value_at(target, beat(4)).unwrap(), 99.0);

        log.undo(&mut chart).unwrap();
        assert_eq!(chart.value_at(target, beat(4)).unwrap(), 10.0);
    }

    #[test]
    fn test_undo_after_redo_of_structural_edits() {
        let (mut chart, target) = setup();
        let mut log = EditLog::default();
        let insert = Operation::insert_boundary(&chart, target, beat(4), 10.0, 20.0).unwrap();
        log.apply(insert, &mut chart).unwrap();
        let start = chart.events(target).unwrap().tail_start();
        let retime = Operation::retime_boundary(&chart, target, start, beat(6)).unwrap();
        log.apply(retime, &mut chart).unwrap();

        log.undo(&mut chart).unwrap();
        log.undo(&mut chart).unwrap();
        assert_eq!(chart.events(target).unwrap().len(), 1);
        log.redo(&mut chart).unwrap();
        log.redo(&mut chart).unwrap();
        assert_eq!(chart.value_at(target, beat(3)).unwrap(), 5.0);
        assert_eq!(chart.value_at(target, beat(6)).unwrap(), 20.0);
        chart.events(target).unwrap().check_invariants().unwrap();
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_string(&EditOutcome::Undone(EffectFlags::DISPLAY)).unwrap();
        assert_eq!(
            json,
            r#"{"outcome":"undone","effects":{"refreshDisplay":true,"recount":false,"reflow":false}}"#
        );
        let json = serde_json::to_string(&EditOutcome::NoOp).unwrap();
        assert_eq!(json, r#"{"outcome":"noOp"}"#);
    }
}
