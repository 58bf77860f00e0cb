//! Tempo map: beats ↔ seconds over piecewise-constant BPM segments
//!
//! The tempo map is an `IndexedEventList<f64>` of bpm values whose End nodes
//! mirror their Start. Every node caches the seconds elapsed from chart start
//! to its time, and a second jump index keyed by those seconds serves the
//! inverse conversion. A tempo edit changes every cached integral after it,
//! so each edit rebuilds the caches and both indices.

use serde::{Deserialize, Serialize};

use crate::errors::{ChartError, ChartResult};
use crate::models::easing::Easing;
use crate::models::time::RationalTime;
use crate::timeline::event_list::{IndexedEventList, InsertOutcome, DEFAULT_MAX_BUCKETS};
use crate::timeline::jump_index::{JumpIndex, StartWalker};
use crate::timeline::node::{NodeId, NodeKind};

/// Tempo from `start_time` until the next segment
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BpmSegment {
    pub start_time: RationalTime,
    pub bpm: f64,
}

impl BpmSegment {
    pub fn new(start_time: RationalTime, bpm: f64) -> Self {
        Self { start_time, bpm }
    }
}

/// A detached tempo boundary, kept so it can be linked back in
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RemovedSegment {
    pub before: NodeId,
    pub end: NodeId,
    pub start: NodeId,
}

pub(crate) fn validate_bpm(bpm: f64) -> ChartResult<()> {
    if !bpm.is_finite() || bpm <= 0.0 {
        log::warn!("rejected tempo {}", bpm);
        return Err(ChartError::value(format!("bpm must be positive and finite, got {}", bpm)));
    }
    Ok(())
}

/// Start navigation keyed by cached seconds
struct SecondsWalker<'a> {
    list: &'a IndexedEventList<f64>,
    seconds: &'a [f64],
}

impl StartWalker<f64> for SecondsWalker<'_> {
    fn first_start(&self) -> NodeId {
        self.list.first_start()
    }

    fn next_start(&self, id: NodeId) -> Option<NodeId> {
        self.list.next_start(id)
    }

    fn prev_start(&self, id: NodeId) -> Option<NodeId> {
        self.list.prev_start(id)
    }

    fn key(&self, id: NodeId) -> Option<f64> {
        self.list.kind(id).ok()?;
        self.seconds.get(id.index() as usize).copied()
    }
}

#[derive(Debug)]
pub struct BpmTimeline {
    list: IndexedEventList<f64>,
    /// Cumulative seconds at each node's time, by arena index
    seconds: Vec<f64>,
    seconds_index: JumpIndex<f64>,
    max_buckets: usize,
}

impl BpmTimeline {
    /// A single constant tempo
    pub fn constant(bpm: f64, duration: RationalTime) -> ChartResult<Self> {
        Self::build(&[BpmSegment::new(RationalTime::ZERO, bpm)], duration)
    }

    pub fn build(segments: &[BpmSegment], duration: RationalTime) -> ChartResult<Self> {
        Self::build_with_max_buckets(segments, duration, DEFAULT_MAX_BUCKETS)
    }

    /// Build from segments ordered by start time, the first at beat 0
    pub fn build_with_max_buckets(
        segments: &[BpmSegment],
        duration: RationalTime,
        max_buckets: usize,
    ) -> ChartResult<Self> {
        let (first, rest) = segments
            .split_first()
            .ok_or_else(|| ChartError::value("a tempo map needs at least one segment"))?;
        if first.start_time != RationalTime::ZERO {
            return Err(ChartError::structural(format!(
                "first tempo segment starts at {}, expected 0",
                first.start_time
            )));
        }
        for segment in segments {
            validate_bpm(segment.bpm)?;
        }
        for pair in segments.windows(2) {
            if pair[1].start_time <= pair[0].start_time {
                return Err(ChartError::structural(format!(
                    "tempo segment at {} does not come after {}",
                    pair[1].start_time, pair[0].start_time
                )));
            }
        }

        let mut list = IndexedEventList::starting_at(
            RationalTime::ZERO,
            first.bpm,
            Easing::LINEAR,
            duration,
            max_buckets,
        );
        let mut previous_bpm = first.bpm;
        for segment in rest {
            list.append_pair_unindexed(segment.start_time, previous_bpm, segment.bpm, Easing::LINEAR)?;
            previous_bpm = segment.bpm;
        }

        let mut timeline = Self {
            list,
            seconds: Vec::new(),
            seconds_index: JumpIndex::empty(0.0),
            max_buckets: max_buckets.max(1),
        };
        timeline.rebuild()?;
        Ok(timeline)
    }

    /// Recompute End mirrors, cached integrals and both jump indices
    pub fn rebuild(&mut self) -> ChartResult<()> {
        let starts: Vec<NodeId> = self.list.starts().collect();
        for &start in &starts {
            if let Some(end) = self.list.end_of(start) {
                let bpm = *self.list.point_parts(start).1;
                self.list.set_value(end, bpm)?;
            }
        }
        self.list.rebuild_index();

        let mut elapsed = 0.0;
        for &start in &starts {
            let (start_time, &bpm) = self.list.point_parts(start);
            self.cache(start, elapsed);
            if let Some(end) = self.list.end_of(start) {
                let (end_time, _) = self.list.point_parts(end);
                elapsed += end_time.beats_since(start_time) * 60.0 / bpm;
                self.cache(end, elapsed);
            }
        }

        let span = self.to_seconds(self.duration()).max(1.0);
        let buckets = starts.len().clamp(1, self.max_buckets);
        let walker = SecondsWalker {
            list: &self.list,
            seconds: &self.seconds,
        };
        self.seconds_index = JumpIndex::build(&walker, span, buckets);
        log::debug!(
            "tempo map rebuilt: {} segments, {:.3}s over {} beats",
            starts.len(),
            span,
            self.duration()
        );
        Ok(())
    }

    fn cache(&mut self, id: NodeId, elapsed: f64) {
        let slot = id.index() as usize;
        if self.seconds.len() <= slot {
            self.seconds.resize(slot + 1, 0.0);
        }
        self.seconds[slot] = elapsed;
    }

    fn cached(&self, id: NodeId) -> f64 {
        self.seconds.get(id.index() as usize).copied().unwrap_or(0.0)
    }

    pub fn list(&self) -> &IndexedEventList<f64> {
        &self.list
    }

    pub fn duration(&self) -> RationalTime {
        self.list.effective_beats()
    }

    pub fn set_duration(&mut self, duration: RationalTime) -> ChartResult<()> {
        self.list.set_effective_beats(duration);
        self.rebuild()
    }

    pub fn segments(&self) -> Vec<BpmSegment> {
        self.list
            .starts()
            .map(|start| {
                let (start_time, &bpm) = self.list.point_parts(start);
                BpmSegment::new(start_time, bpm)
            })
            .collect()
    }

    /// Tempo in effect at `beats`
    pub fn bpm_at(&self, beats: RationalTime) -> f64 {
        let start = self.list.get_node_at(beats, false);
        *self.list.point_parts(start).1
    }

    /// Seconds elapsed from chart start at `beats`. Beats outside the tempo
    /// map extrapolate with the nearest segment's tempo.
    pub fn to_seconds(&self, beats: RationalTime) -> f64 {
        let start = self.list.get_node_at(beats, false);
        let (start_time, &bpm) = self.list.point_parts(start);
        self.cached(start) + beats.beats_since(start_time) * 60.0 / bpm
    }

    /// Like [`to_seconds`](Self::to_seconds) for a float beat position
    pub fn to_seconds_f64(&self, beats: f64) -> f64 {
        let located = match RationalTime::from_f64_snapped(beats, 1 << 16) {
            Ok(time) => time,
            Err(_) => return f64::NAN,
        };
        let start = self.list.get_node_at(located, false);
        let (start_time, &bpm) = self.list.point_parts(start);
        self.cached(start) + (beats - start_time.to_f64()) * 60.0 / bpm
    }

    /// Beat position at `seconds` from chart start
    pub fn to_beats(&self, seconds: f64) -> f64 {
        let walker = SecondsWalker {
            list: &self.list,
            seconds: &self.seconds,
        };
        let start = self.seconds_index.lookup(&walker, seconds, false);
        let (start_time, &bpm) = self.list.point_parts(start);
        start_time.to_f64() + (seconds - self.cached(start)) * bpm / 60.0
    }

    // ------------------------------------------------------------------
    // Edits. Each returns what is needed to revert it.
    // ------------------------------------------------------------------

    /// Change the tempo of the segment begun by `start`
    pub fn set_bpm(&mut self, start: NodeId, bpm: f64) -> ChartResult<f64> {
        validate_bpm(bpm)?;
        if self.list.kind(start)? != NodeKind::Start {
            return Err(ChartError::structural("tempo can only be set on a segment start"));
        }
        let previous = self.list.set_value(start, bpm)?;
        self.rebuild()?;
        Ok(previous)
    }

    /// Start a new tempo segment at `time`. A segment already starting at
    /// `time` has its tempo overwritten instead.
    pub fn insert_segment(&mut self, time: RationalTime, bpm: f64) -> ChartResult<InsertOutcome<f64>> {
        validate_bpm(bpm)?;
        let target = self.list.get_node_at(time, true);
        let target_bpm = *self.list.point_parts(target).1;
        let outcome = self.list.insert_pair(target, time, target_bpm, bpm)?;
        self.rebuild()?;
        Ok(outcome)
    }

    /// Link back a segment boundary produced by [`insert_segment`](Self::insert_segment)
    /// or taken out by [`remove_segment`](Self::remove_segment)
    pub fn restore_segment(&mut self, removed: RemovedSegment) -> ChartResult<()> {
        self.list.splice_pair(removed.before, removed.end, removed.start)?;
        self.rebuild()?;
        Ok(())
    }

    /// Remove the segment begun by `start`; the previous segment's tempo
    /// extends over it. The first segment cannot be removed.
    pub fn remove_segment(&mut self, start: NodeId) -> ChartResult<RemovedSegment> {
        let removed = self.boundary_of(start)?;
        self.list.remove_pair(removed.end, removed.start)?;
        self.rebuild()?;
        Ok(removed)
    }

    /// Move the start of the segment begun by `start` to `time`
    pub fn retime_segment(&mut self, start: NodeId, time: RationalTime) -> ChartResult<RationalTime> {
        let boundary = self.check_retime(start, time)?;
        let previous = self.list.retime_pair(boundary.end, boundary.start, time)?;
        self.rebuild()?;
        Ok(previous)
    }

    /// The boundary in front of `start`, if it may move to `time`. Segment
    /// starts stay strictly increasing, so the boundary cannot land on a
    /// neighbouring segment start.
    pub fn check_retime(&self, start: NodeId, time: RationalTime) -> ChartResult<RemovedSegment> {
        let boundary = self.boundary_of(start)?;
        let lower = self.list.time(boundary.before)?;
        let upper = self.list.time(self.list.next(start)?).ok();
        if time <= lower || upper.map_or(false, |upper| time >= upper) {
            log::warn!("rejected tempo retime of segment {} to {}", start.index(), time);
            return Err(ChartError::structural(format!(
                "moving the tempo boundary to {} would overlap a neighbouring segment",
                time
            )));
        }
        Ok(boundary)
    }

    /// Restore tempo values overwritten by a merging insert
    pub fn restore_merged(&mut self, outcome: &InsertOutcome<f64>) -> ChartResult<()> {
        if let InsertOutcome::Merged { start: (start, bpm), .. } = outcome {
            self.list.set_value(*start, *bpm)?;
            self.rebuild()?;
        }
        Ok(())
    }

    /// The boundary pair in front of a (non-first) segment start
    pub fn boundary_of(&self, start: NodeId) -> ChartResult<RemovedSegment> {
        if self.list.kind(start)? != NodeKind::Start {
            return Err(ChartError::structural("expected a tempo segment start"));
        }
        let end = self.list.prev(start)?;
        if self.list.kind(end)? != NodeKind::End {
            return Err(ChartError::structural("the first tempo segment has no boundary"));
        }
        let before = self.list.prev(end)?;
        Ok(RemovedSegment { before, end, start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat(w: i64) -> RationalTime {
        RationalTime::from_integer(w)
    }

    fn two_tempo() -> BpmTimeline {
        BpmTimeline::build(
            &[BpmSegment::new(beat(0), 120.0), BpmSegment::new(beat(8), 240.0)],
            beat(16),
        )
        .unwrap()
    }

    #[test]
    fn test_two_tempo_scenario() {
        let timeline = two_tempo();
        assert_eq!(timeline.to_seconds(beat(0)), 0.0);
        assert!((timeline.to_seconds(beat(8)) - 4.0).abs() < 1e-12);
        assert!((timeline.to_seconds(beat(16)) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_conversion() {
        let timeline = two_tempo();
        assert!((timeline.to_beats(4.0) - 8.0).abs() < 1e-9);
        assert!((timeline.to_beats(5.0) - 12.0).abs() < 1e-9);
        assert!((timeline.to_beats(1.0) - 2.0).abs() < 1e-9);
        for q in 0..=64 {
            let b = RationalTime::new(0, q, 4).unwrap();
            let back = timeline.to_beats(timeline.to_seconds(b));
            assert!((back - b.to_f64()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_extrapolation_outside_map() {
        let timeline = two_tempo();
        assert!((timeline.to_seconds(beat(-2)) + 1.0).abs() < 1e-12);
        assert!((timeline.to_seconds(beat(20)) - 7.0).abs() < 1e-12);
        assert!((timeline.to_beats(7.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_float_beats() {
        let timeline = two_tempo();
        assert!((timeline.to_seconds_f64(10.0) - 4.5).abs() < 1e-9);
        assert!(timeline.to_seconds_f64(f64::NAN).is_nan());
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(BpmTimeline::build(&[], beat(4)).is_err());
        assert!(BpmTimeline::build(&[BpmSegment::new(beat(1), 120.0)], beat(4)).is_err());
        assert!(BpmTimeline::build(&[BpmSegment::new(beat(0), 0.0)], beat(4)).is_err());
        let unordered = [
            BpmSegment::new(beat(0), 120.0),
            BpmSegment::new(beat(4), 100.0),
            BpmSegment::new(beat(4), 90.0),
        ];
        assert!(BpmTimeline::build(&unordered, beat(8)).is_err());
    }

    #[test]
    fn test_set_bpm_recomputes_downstream() {
        let mut timeline = two_tempo();
        let first = timeline.list().first_start();
        let previous = timeline.set_bpm(first, 60.0).unwrap();
        assert_eq!(previous, 120.0);
        assert!((timeline.to_seconds(beat(8)) - 8.0).abs() < 1e-12);
        assert!((timeline.to_seconds(beat(16)) - 10.0).abs() < 1e-12);
        assert!((timeline.to_beats(9.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_insert_remove_restore_segment() {
        let mut timeline = two_tempo();
        let outcome = timeline.insert_segment(beat(4), 60.0).unwrap();
        let (end, start) = match outcome {
            InsertOutcome::Inserted { end, start } => (end, start),
            other => panic!("expected insert, got {:?}", other),
        };
        // 4 beats at 120 + 4 beats at 60 = 2 + 4
        assert!((timeline.to_seconds(beat(8)) - 6.0).abs() < 1e-12);
        assert_eq!(timeline.segments().len(), 3);

        let removed = timeline.remove_segment(start).unwrap();
        assert_eq!(removed.end, end);
        assert!((timeline.to_seconds(beat(8)) - 4.0).abs() < 1e-12);

        timeline.restore_segment(removed).unwrap();
        assert!((timeline.to_seconds(beat(8)) - 6.0).abs() < 1e-12);
        timeline.list().check_invariants().unwrap();
    }

    #[test]
    fn test_insert_on_existing_segment_overwrites() {
        let mut timeline = two_tempo();
        let outcome = timeline.insert_segment(beat(8), 480.0).unwrap();
        assert!(matches!(outcome, InsertOutcome::Merged { .. }));
        assert_eq!(timeline.segments().len(), 2);
        assert_eq!(timeline.bpm_at(beat(10)), 480.0);
        assert_eq!(timeline.bpm_at(beat(2)), 120.0);

        timeline.restore_merged(&outcome).unwrap();
        assert_eq!(timeline.bpm_at(beat(10)), 240.0);
    }

    #[test]
    fn test_first_segment_cannot_be_removed() {
        let mut timeline = two_tempo();
        let first = timeline.list().first_start();
        assert!(timeline.remove_segment(first).is_err());
    }

    #[test]
    fn test_retime_segment() {
        let mut timeline = two_tempo();
        let second = timeline.list().tail_start();
        let previous = timeline.retime_segment(second, beat(4)).unwrap();
        assert_eq!(previous, beat(8));
        // 4 beats at 120 + 12 beats at 240
        assert!((timeline.to_seconds(beat(16)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_retime_segment_keeps_starts_strictly_increasing() {
        let mut timeline = two_tempo();
        timeline.insert_segment(beat(12), 60.0).unwrap();
        let second = timeline.list().next(timeline.list().next(timeline.list().first_start()).unwrap()).unwrap();
        assert_eq!(timeline.list().time(second).unwrap(), beat(8));

        assert!(timeline.retime_segment(second, beat(0)).is_err());
        assert!(timeline.retime_segment(second, beat(12)).is_err());
        assert!(timeline.check_retime(second, beat(12)).is_err());
        timeline.retime_segment(second, beat(11)).unwrap();

        let rebuilt = BpmTimeline::build(&timeline.segments(), beat(16)).unwrap();
        assert_eq!(rebuilt.segments(), timeline.segments());
    }

    #[test]
    fn test_rebuild_mirrors_end_values() {
        let mut timeline = two_tempo();
        let first = timeline.list().first_start();
        timeline.set_bpm(first, 90.0).unwrap();
        let end = timeline.list().end_of(first).unwrap();
        assert_eq!(*timeline.list().value(end).unwrap(), 90.0);
        assert!(timeline.rebuild().is_ok());
        timeline.list().check_invariants().unwrap();
    }
}
