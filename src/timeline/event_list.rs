//! Time-ordered event list with a jump index
//!
//! Layout of a list holding `n` events:
//!
//! ```text
//! Head, S0, E0, S1, E1, ..., S(n-1), E(n-1), Sn, Tail
//! ```
//!
//! Each `Si -> Ei` pair is one event. `Ei` and `S(i+1)` share a time and form
//! a *boundary pair*; there are no gaps between events. `Sn` is the tail
//! start: its value holds forever. A list always has at least one Start.
//!
//! Every structural mutation re-samples the jump index over the smallest
//! range of nodes that encloses the change.

use std::mem;

use crate::errors::{ChartError, ChartResult};
use crate::models::easing::Easing;
use crate::models::time::RationalTime;
use crate::models::value::EventValue;
use crate::timeline::jump_index::{JumpIndex, StartWalker};
use crate::timeline::node::{next_list_id, EventPoint, Node, NodeId, NodeKind, HEAD_SLOT, TAIL_SLOT};

/// Upper bound on jump index buckets unless configured otherwise
pub const DEFAULT_MAX_BUCKETS: usize = 4096;

/// Result of [`IndexedEventList::insert_pair`]
#[derive(Clone, Debug, PartialEq)]
pub enum InsertOutcome<V> {
    /// A new boundary pair was linked in
    Inserted { end: NodeId, start: NodeId },
    /// The time hit an existing boundary; its values were overwritten.
    /// Holds the overwritten nodes and their previous values.
    Merged {
        end: Option<(NodeId, V)>,
        start: (NodeId, V),
    },
}

#[derive(Debug)]
struct Arena<V> {
    list: u32,
    nodes: Vec<Node<V>>,
}

impl<V> Arena<V> {
    fn id(&self, slot: u32) -> NodeId {
        NodeId::new(self.list, slot)
    }

    fn node(&self, slot: u32) -> &Node<V> {
        &self.nodes[slot as usize]
    }

    fn node_mut(&mut self, slot: u32) -> &mut Node<V> {
        &mut self.nodes[slot as usize]
    }

    fn kind(&self, slot: u32) -> NodeKind {
        self.node(slot).kind
    }

    fn time(&self, slot: u32) -> Option<RationalTime> {
        self.node(slot).time()
    }

    /// Point of a slot known to be Start or End
    fn point(&self, slot: u32) -> &EventPoint<V> {
        match &self.node(slot).point {
            Some(point) => point,
            None => unreachable!("sentinel slot {} has no event point", slot),
        }
    }

    fn point_mut(&mut self, slot: u32) -> &mut EventPoint<V> {
        match &mut self.node_mut(slot).point {
            Some(point) => point,
            None => unreachable!("sentinel slot {} has no event point", slot),
        }
    }

    fn first_start_slot(&self) -> u32 {
        self.node(HEAD_SLOT).next
    }

    fn next_start_slot(&self, slot: u32) -> Option<u32> {
        let next = self.node(slot).next;
        match self.kind(next) {
            NodeKind::End => Some(self.node(next).next),
            NodeKind::Start => Some(next),
            _ => None,
        }
    }

    fn prev_start_slot(&self, slot: u32) -> Option<u32> {
        let prev = self.node(slot).prev;
        match self.kind(prev) {
            NodeKind::End => Some(self.node(prev).prev),
            NodeKind::Start => Some(prev),
            _ => None,
        }
    }

    fn resolve(&self, id: NodeId) -> ChartResult<u32> {
        if id.list() != self.list {
            return Err(ChartError::structural(format!(
                "node {} belongs to another list",
                id.index()
            )));
        }
        match self.nodes.get(id.index() as usize) {
            Some(node) if node.attached => Ok(id.index()),
            Some(_) => Err(ChartError::structural(format!("node {} is detached", id.index()))),
            None => Err(ChartError::structural(format!("unknown node {}", id.index()))),
        }
    }

    fn resolve_kind(&self, id: NodeId, kind: NodeKind) -> ChartResult<u32> {
        let slot = self.resolve(id)?;
        if self.kind(slot) != kind {
            return Err(ChartError::structural(format!(
                "node {} is {:?}, expected {:?}",
                id.index(),
                self.kind(slot),
                kind
            )));
        }
        Ok(slot)
    }

    fn resolve_event(&self, id: NodeId) -> ChartResult<u32> {
        let slot = self.resolve(id)?;
        if self.kind(slot).is_sentinel() {
            return Err(ChartError::structural(format!(
                "node {} is a sentinel and carries no event data",
                id.index()
            )));
        }
        Ok(slot)
    }

    fn resolve_detached(&self, id: NodeId, kind: NodeKind) -> ChartResult<u32> {
        if id.list() != self.list {
            return Err(ChartError::structural(format!(
                "node {} belongs to another list",
                id.index()
            )));
        }
        match self.nodes.get(id.index() as usize) {
            Some(node) if node.attached => Err(ChartError::structural(format!(
                "node {} is already linked",
                id.index()
            ))),
            Some(node) if node.kind != kind => Err(ChartError::structural(format!(
                "node {} is {:?}, expected {:?}",
                id.index(),
                node.kind,
                kind
            ))),
            Some(_) => Ok(id.index()),
            None => Err(ChartError::structural(format!("unknown node {}", id.index()))),
        }
    }

    fn link(&mut self, prev: u32, slot: u32, next: u32) {
        self.node_mut(prev).next = slot;
        self.node_mut(next).prev = slot;
        let node = self.node_mut(slot);
        node.prev = prev;
        node.next = next;
        node.attached = true;
    }
}

impl<V> StartWalker<RationalTime> for Arena<V> {
    fn first_start(&self) -> NodeId {
        self.id(self.first_start_slot())
    }

    fn next_start(&self, id: NodeId) -> Option<NodeId> {
        self.next_start_slot(id.index()).map(|slot| self.id(slot))
    }

    fn prev_start(&self, id: NodeId) -> Option<NodeId> {
        self.prev_start_slot(id.index()).map(|slot| self.id(slot))
    }

    fn key(&self, id: NodeId) -> Option<RationalTime> {
        self.resolve(id).ok().and_then(|slot| self.time(slot))
    }
}

/// Doubly linked, time-ordered sequence of events with sub-linear lookup
#[derive(Debug)]
pub struct IndexedEventList<V> {
    arena: Arena<V>,
    len: usize,
    effective_beats: RationalTime,
    max_buckets: usize,
    index: JumpIndex<RationalTime>,
}

impl<V: EventValue> IndexedEventList<V> {
    /// A list holding `initial` from beat 0 onwards
    pub fn new(initial: V, effective_beats: RationalTime) -> Self {
        Self::with_max_buckets(initial, effective_beats, DEFAULT_MAX_BUCKETS)
    }

    pub fn with_max_buckets(initial: V, effective_beats: RationalTime, max_buckets: usize) -> Self {
        Self::starting_at(
            RationalTime::ZERO,
            initial,
            Easing::LINEAR,
            effective_beats,
            max_buckets,
        )
    }

    pub(crate) fn starting_at(
        time: RationalTime,
        value: V,
        easing: Easing,
        effective_beats: RationalTime,
        max_buckets: usize,
    ) -> Self {
        let mut nodes = vec![Node::head(), Node::tail()];
        nodes.push(Node::event(NodeKind::Start, time, value, easing));
        let mut arena = Arena {
            list: next_list_id(),
            nodes,
        };
        arena.link(HEAD_SLOT, 2, TAIL_SLOT);

        let mut list = Self {
            arena,
            len: 1,
            effective_beats,
            max_buckets: max_buckets.max(1),
            index: JumpIndex::empty(RationalTime::ZERO),
        };
        list.rebuild_index();
        list
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Number of linked Start and End nodes
    pub fn len(&self) -> usize {
        self.len
    }

    /// A list always holds at least its first Start
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of events with an End, i.e. excluding the tail start
    pub fn event_count(&self) -> usize {
        self.len / 2
    }

    pub fn head(&self) -> NodeId {
        self.arena.id(HEAD_SLOT)
    }

    pub fn tail(&self) -> NodeId {
        self.arena.id(TAIL_SLOT)
    }

    pub fn first_start(&self) -> NodeId {
        self.arena.first_start()
    }

    /// The final Start, whose value holds past the last boundary
    pub fn tail_start(&self) -> NodeId {
        self.arena.id(self.arena.node(TAIL_SLOT).prev)
    }

    pub fn next_start(&self, start: NodeId) -> Option<NodeId> {
        let slot = self.arena.resolve(start).ok()?;
        self.arena.next_start_slot(slot).map(|s| self.arena.id(s))
    }

    pub fn prev_start(&self, start: NodeId) -> Option<NodeId> {
        let slot = self.arena.resolve(start).ok()?;
        self.arena.prev_start_slot(slot).map(|s| self.arena.id(s))
    }

    /// End of the event begun by `start`; `None` for the tail start
    pub fn end_of(&self, start: NodeId) -> Option<NodeId> {
        let slot = self.arena.resolve_kind(start, NodeKind::Start).ok()?;
        let next = self.arena.node(slot).next;
        (self.arena.kind(next) == NodeKind::End).then(|| self.arena.id(next))
    }

    pub fn next(&self, id: NodeId) -> ChartResult<NodeId> {
        let slot = self.arena.resolve(id)?;
        if slot == TAIL_SLOT {
            return Err(ChartError::structural("tail has no successor"));
        }
        Ok(self.arena.id(self.arena.node(slot).next))
    }

    pub fn prev(&self, id: NodeId) -> ChartResult<NodeId> {
        let slot = self.arena.resolve(id)?;
        if slot == HEAD_SLOT {
            return Err(ChartError::structural("head has no predecessor"));
        }
        Ok(self.arena.id(self.arena.node(slot).prev))
    }

    /// All Starts in time order
    pub fn starts(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(self.first_start()), move |&id| self.next_start(id))
    }

    /// Look up a linked node by its arena index
    pub fn node_id(&self, index: u32) -> ChartResult<NodeId> {
        let id = self.arena.id(index);
        self.arena.resolve(id)?;
        Ok(id)
    }

    pub fn kind(&self, id: NodeId) -> ChartResult<NodeKind> {
        Ok(self.arena.kind(self.arena.resolve(id)?))
    }

    pub fn time(&self, id: NodeId) -> ChartResult<RationalTime> {
        let slot = self.arena.resolve_event(id)?;
        Ok(self.arena.point(slot).time)
    }

    pub fn value(&self, id: NodeId) -> ChartResult<&V> {
        let slot = self.arena.resolve_event(id)?;
        Ok(&self.arena.point(slot).value)
    }

    /// Time and value of a Start or End handed out by this list itself
    pub(crate) fn point_parts(&self, id: NodeId) -> (RationalTime, &V) {
        let point = self.arena.point(id.index());
        (point.time, &point.value)
    }

    pub fn easing(&self, id: NodeId) -> ChartResult<Easing> {
        let slot = self.arena.resolve_kind(id, NodeKind::Start)?;
        Ok(self.arena.point(slot).easing)
    }

    pub fn effective_beats(&self) -> RationalTime {
        self.effective_beats
    }

    /// Change the effective span; the jump index is rebuilt
    pub fn set_effective_beats(&mut self, effective_beats: RationalTime) {
        self.effective_beats = effective_beats;
        self.rebuild_index();
    }

    pub fn bucket_count(&self) -> usize {
        self.index.bucket_count()
    }

    /// Span covered by the jump index: the effective span, stretched to the
    /// last Start if events run past it, and never shorter than one beat
    fn index_span(&self) -> RationalTime {
        let last = self.arena.time(self.arena.node(TAIL_SLOT).prev).unwrap_or(RationalTime::ZERO);
        self.effective_beats.max(last).max(RationalTime::from_integer(1))
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// The Start whose event covers `beats`.
    ///
    /// Beats before the first Start clamp to it; beats past the last Start
    /// resolve to the tail start. With `use_previous`, a beat exactly on a
    /// boundary resolves to the event ending there instead of the one
    /// beginning there.
    pub fn get_node_at(&self, beats: RationalTime, use_previous: bool) -> NodeId {
        self.index.lookup(&self.arena, beats, use_previous)
    }

    /// Reference O(n) version of [`get_node_at`](Self::get_node_at)
    pub fn get_node_at_linear(&self, beats: RationalTime, use_previous: bool) -> NodeId {
        let mut cur = self.arena.first_start_slot();
        while let Some(next) = self.arena.next_start_slot(cur) {
            match self.arena.time(next) {
                Some(t) if t < beats || (!use_previous && t == beats) => cur = next,
                _ => break,
            }
        }
        self.arena.id(cur)
    }

    /// Interpolated value at `beats`, clamped outside the covered range
    pub fn value_at(&self, beats: RationalTime) -> V {
        let start = self.get_node_at(beats, false).index();
        let start_point = self.arena.point(start);
        let end = self.arena.node(start).next;
        if self.arena.kind(end) != NodeKind::End {
            return start_point.value.clone();
        }
        let end_point = self.arena.point(end);

        let duration = end_point.time.beats_since(start_point.time);
        if duration <= 0.0 {
            return end_point.value.clone();
        }
        let progress = beats.beats_since(start_point.time) / duration;
        let weight = start_point.easing.apply(progress);
        V::interpolate(&start_point.value, &end_point.value, weight)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Split the event begun by `target` with a boundary pair at `time`.
    ///
    /// The new End takes `end_value`, the new Start takes `start_value` and
    /// inherits the target's easing. If `time` equals the target's own time
    /// or its End's time, nothing is linked: the existing boundary values
    /// are overwritten and the previous values are returned.
    pub fn insert_pair(
        &mut self,
        target: NodeId,
        time: RationalTime,
        end_value: V,
        start_value: V,
    ) -> ChartResult<InsertOutcome<V>> {
        if let Some((end, start)) = self.merge_target(target, time)? {
            let end = match end {
                Some(end) => {
                    let old = mem::replace(&mut self.arena.point_mut(end.index()).value, end_value);
                    Some((end, old))
                }
                None => None,
            };
            let old = mem::replace(&mut self.arena.point_mut(start.index()).value, start_value);
            log::debug!("insert at {} merged into existing boundary", time);
            return Ok(InsertOutcome::Merged {
                end,
                start: (start, old),
            });
        }

        let easing = self.arena.point(target.index()).easing;
        let end = self.allocate(NodeKind::End, time, end_value, Easing::LINEAR);
        let start = self.allocate(NodeKind::Start, time, start_value, easing);
        self.splice_pair(target, end, start)?;
        Ok(InsertOutcome::Inserted { end, start })
    }

    /// The existing boundary an insert at `time` into the event begun by
    /// `target` would overwrite, as `(End before it, Start)`. `None` when
    /// the insert would link a new pair. Fails when `time` lies outside
    /// the event.
    pub fn merge_target(
        &self,
        target: NodeId,
        time: RationalTime,
    ) -> ChartResult<Option<(Option<NodeId>, NodeId)>> {
        let target_slot = self.arena.resolve_kind(target, NodeKind::Start)?;
        let target_time = self.arena.point(target_slot).time;
        let after = self.arena.node(target_slot).next;
        let segment_end = self.arena.time(after);

        if time < target_time || segment_end.map_or(false, |end| time > end) {
            log::warn!("insert at {} rejected: outside the event starting at {}", time, target_time);
            return Err(ChartError::structural(format!(
                "time {} lies outside the event starting at {}",
                time, target_time
            )));
        }

        if time == target_time {
            let prev = self.arena.node(target_slot).prev;
            let end = (self.arena.kind(prev) == NodeKind::End).then(|| self.arena.id(prev));
            return Ok(Some((end, target)));
        }
        if segment_end == Some(time) {
            let next_start = self.arena.node(after).next;
            return Ok(Some((Some(self.arena.id(after)), self.arena.id(next_start))));
        }
        Ok(None)
    }

    fn allocate(&mut self, kind: NodeKind, time: RationalTime, value: V, easing: Easing) -> NodeId {
        let slot = self.arena.nodes.len() as u32;
        self.arena.nodes.push(Node::event(kind, time, value, easing));
        self.arena.id(slot)
    }

    /// Link a detached boundary pair into the event begun by `target`.
    /// Used to put back a pair taken out by [`remove_pair`](Self::remove_pair).
    pub fn splice_pair(&mut self, target: NodeId, end: NodeId, start: NodeId) -> ChartResult<()> {
        let target_slot = self.arena.resolve_kind(target, NodeKind::Start)?;
        let end_slot = self.arena.resolve_detached(end, NodeKind::End)?;
        let start_slot = self.arena.resolve_detached(start, NodeKind::Start)?;

        let time = self.arena.point(end_slot).time;
        if self.arena.point(start_slot).time != time {
            return Err(ChartError::structural("boundary pair nodes disagree on time"));
        }
        let after = self.arena.node(target_slot).next;
        let in_order = self.arena.point(target_slot).time <= time
            && self.arena.time(after).map_or(true, |next| time <= next);
        if !in_order {
            return Err(ChartError::structural(format!(
                "splicing a boundary at {} would break time order",
                time
            )));
        }

        self.arena.link(target_slot, end_slot, after);
        self.arena.link(end_slot, start_slot, after);
        self.len += 2;
        log::debug!("linked boundary pair at {} ({} nodes)", time, self.len);
        self.refresh_after_mutation(target_slot, after);
        Ok(())
    }

    /// Unlink the boundary pair `end -> start`, merging the two events
    /// around it. The nodes stay in the arena, detached.
    pub fn remove_pair(&mut self, end: NodeId, start: NodeId) -> ChartResult<()> {
        let end_slot = self.arena.resolve_kind(end, NodeKind::End)?;
        let start_slot = self.arena.resolve_kind(start, NodeKind::Start)?;
        if self.arena.node(end_slot).next != start_slot {
            return Err(ChartError::structural(format!(
                "nodes {} and {} are not an adjacent boundary pair",
                end.index(),
                start.index()
            )));
        }
        let before = self.arena.node(end_slot).prev;
        let after = self.arena.node(start_slot).next;
        if self.arena.kind(before) != NodeKind::Start {
            return Err(ChartError::structural("boundary pair is not preceded by a Start"));
        }
        if !matches!(self.arena.kind(after), NodeKind::End | NodeKind::Tail) {
            return Err(ChartError::structural("boundary pair is not followed by an End or the tail"));
        }

        self.arena.node_mut(before).next = after;
        self.arena.node_mut(after).prev = before;
        self.arena.node_mut(end_slot).attached = false;
        self.arena.node_mut(start_slot).attached = false;
        self.len -= 2;
        log::debug!("unlinked boundary pair {}/{} ({} nodes)", end.index(), start.index(), self.len);
        self.refresh_after_mutation(before, after);
        Ok(())
    }

    /// Move the boundary pair `end -> start` to `time`, which must stay
    /// within the neighbouring events. Returns the previous time.
    pub fn retime_pair(&mut self, end: NodeId, start: NodeId, time: RationalTime) -> ChartResult<RationalTime> {
        let end_slot = self.arena.resolve_kind(end, NodeKind::End)?;
        let start_slot = self.arena.resolve_kind(start, NodeKind::Start)?;
        if self.arena.node(end_slot).next != start_slot {
            return Err(ChartError::structural(format!(
                "nodes {} and {} are not an adjacent boundary pair",
                end.index(),
                start.index()
            )));
        }
        let before = self.arena.node(end_slot).prev;
        let after = self.arena.node(start_slot).next;
        let lower = self.arena.time(before);
        let upper = self.arena.time(after);
        let in_order = lower.map_or(true, |l| l <= time) && upper.map_or(true, |u| time <= u);
        if !in_order {
            return Err(ChartError::structural(format!(
                "moving the boundary to {} would break time order",
                time
            )));
        }

        let previous = mem::replace(&mut self.arena.point_mut(end_slot).time, time);
        self.arena.point_mut(start_slot).time = time;
        self.refresh_after_mutation(before, after);
        Ok(previous)
    }

    /// Replace the value of a Start or End, returning the previous one
    pub fn set_value(&mut self, id: NodeId, value: V) -> ChartResult<V> {
        let slot = self.arena.resolve_event(id)?;
        Ok(mem::replace(&mut self.arena.point_mut(slot).value, value))
    }

    /// Replace the easing of the event begun by `start`
    pub fn set_easing(&mut self, start: NodeId, easing: Easing) -> ChartResult<Easing> {
        let slot = self.arena.resolve_kind(start, NodeKind::Start)?;
        Ok(mem::replace(&mut self.arena.point_mut(slot).easing, easing))
    }

    /// Append a boundary pair after the tail start without touching the
    /// index. Bulk builders call [`rebuild_index`](Self::rebuild_index)
    /// once they are done.
    pub(crate) fn append_pair_unindexed(
        &mut self,
        time: RationalTime,
        end_value: V,
        start_value: V,
        easing: Easing,
    ) -> ChartResult<(NodeId, NodeId)> {
        let last = self.arena.node(TAIL_SLOT).prev;
        if self.arena.time(last).map_or(false, |t| time < t) {
            return Err(ChartError::structural(format!(
                "appending a boundary at {} would break time order",
                time
            )));
        }
        let end = self.allocate(NodeKind::End, time, end_value, Easing::LINEAR);
        let start = self.allocate(NodeKind::Start, time, start_value, easing);
        self.arena.link(last, end.index(), TAIL_SLOT);
        self.arena.link(end.index(), start.index(), TAIL_SLOT);
        self.len += 2;
        Ok((end, start))
    }

    // ------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------

    /// Re-sample the jump index over the window between `from` and `to`,
    /// the nodes just outside a mutated span
    pub fn update_range(&mut self, from: NodeId, to: NodeId) -> ChartResult<()> {
        let from_slot = self.arena.resolve(from)?;
        let to_slot = self.arena.resolve(to)?;
        if to_slot == HEAD_SLOT || from_slot == TAIL_SLOT {
            return Err(ChartError::structural("update range runs backwards"));
        }
        self.resample(from_slot, to_slot);
        Ok(())
    }

    fn refresh_after_mutation(&mut self, from_slot: u32, to_slot: u32) {
        let starts = self.len / 2 + 1;
        let buckets = self.index.bucket_count();
        let outgrown = starts > buckets.saturating_mul(2) && buckets < self.max_buckets;
        if outgrown || self.index_span() > self.index.span() {
            self.rebuild_index();
        } else {
            self.resample(from_slot, to_slot);
        }
    }

    fn resample(&mut self, from_slot: u32, to_slot: u32) {
        let anchor = match self.arena.kind(from_slot) {
            NodeKind::Head => None,
            NodeKind::Start => Some(from_slot),
            NodeKind::End => Some(self.arena.node(from_slot).prev),
            NodeKind::Tail => Some(self.arena.node(TAIL_SLOT).prev),
        };
        let anchor = anchor.map(|slot| self.arena.id(slot));
        let to_key = self.arena.time(to_slot);
        self.index.update_range(&self.arena, anchor, to_key);
    }

    /// Re-sample the whole index, sizing it to the current node count
    pub fn rebuild_index(&mut self) {
        let buckets = (self.len / 2 + 1).clamp(1, self.max_buckets);
        let span = self.index_span();
        self.index = JumpIndex::build(&self.arena, span, buckets);
        log::debug!("jump index rebuilt: {} buckets over {} beats", buckets, span);
    }

    /// Walk the whole list and verify ordering, pairing and index health
    pub fn check_invariants(&self) -> ChartResult<()> {
        let mut slot = self.arena.first_start_slot();
        let mut expected = NodeKind::Start;
        let mut count = 0;
        let mut last_time: Option<RationalTime> = None;
        while slot != TAIL_SLOT {
            let node = self.arena.node(slot);
            if node.kind != expected || !node.attached {
                return Err(ChartError::structural(format!(
                    "slot {} is {:?}, expected linked {:?}",
                    slot, node.kind, expected
                )));
            }
            let time = self.arena.point(slot).time;
            if last_time.map_or(false, |t| time < t) {
                return Err(ChartError::structural(format!("time goes backwards at slot {}", slot)));
            }
            if node.kind == NodeKind::Start && self.arena.kind(node.prev) == NodeKind::End {
                if self.arena.time(node.prev) != Some(time) {
                    return Err(ChartError::structural(format!("gap before slot {}", slot)));
                }
            }
            if self.arena.node(node.next).prev != slot {
                return Err(ChartError::structural(format!("broken back link after slot {}", slot)));
            }
            last_time = Some(time);
            expected = match node.kind {
                NodeKind::Start => NodeKind::End,
                _ => NodeKind::Start,
            };
            count += 1;
            slot = node.next;
        }
        if expected != NodeKind::End {
            return Err(ChartError::structural("list does not end on a Start"));
        }
        if count != self.len {
            return Err(ChartError::structural(format!(
                "node count {} disagrees with walk {}",
                self.len, count
            )));
        }
        for checkpoint in self.index.checkpoints() {
            self.arena.resolve_kind(*checkpoint, NodeKind::Start)?;
        }
        let monotonic = self
            .index
            .checkpoints()
            .windows(2)
            .all(|w| self.arena.time(w[0].index()) <= self.arena.time(w[1].index()));
        if !monotonic {
            return Err(ChartError::structural("jump index checkpoints out of order"));
        }
        Ok(())
    }
}
