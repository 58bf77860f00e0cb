//! Arena nodes of an indexed event list
//!
//! Nodes live in a `Vec` owned by their list and are addressed by
//! [`NodeId`]. Slots 0 and 1 are the Head and Tail sentinels. Removed nodes
//! are only detached, never freed, so an id held by an undo entry stays
//! valid for re-linking.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::models::easing::Easing;
use crate::models::time::RationalTime;

pub(crate) const HEAD_SLOT: u32 = 0;
pub(crate) const TAIL_SLOT: u32 = 1;

static NEXT_LIST_ID: AtomicU32 = AtomicU32::new(1);

pub(crate) fn next_list_id() -> u32 {
    NEXT_LIST_ID.fetch_add(1, Ordering::Relaxed)
}

/// Stable handle to a node of one particular list
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    list: u32,
    slot: u32,
}

impl NodeId {
    pub(crate) fn new(list: u32, slot: u32) -> Self {
        Self { list, slot }
    }

    /// Arena slot of this node, unique within its list
    pub fn index(&self) -> u32 {
        self.slot
    }

    pub(crate) fn list(&self) -> u32 {
        self.list
    }
}

/// Position of a node in the Head/Start/End/Tail layout
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Head,
    Start,
    End,
    Tail,
}

impl NodeKind {
    pub fn is_sentinel(self) -> bool {
        matches!(self, NodeKind::Head | NodeKind::Tail)
    }
}

/// Time and value of a non-sentinel node. The easing is only read on
/// Start nodes, where it shapes the event that begins there.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EventPoint<V> {
    pub time: RationalTime,
    pub value: V,
    pub easing: Easing,
}

#[derive(Clone, Debug)]
pub(crate) struct Node<V> {
    pub kind: NodeKind,
    /// `None` exactly for the two sentinels
    pub point: Option<EventPoint<V>>,
    pub prev: u32,
    pub next: u32,
    pub attached: bool,
}

impl<V> Node<V> {
    pub fn head() -> Self {
        Self {
            kind: NodeKind::Head,
            point: None,
            prev: HEAD_SLOT,
            next: TAIL_SLOT,
            attached: true,
        }
    }

    pub fn tail() -> Self {
        Self {
            kind: NodeKind::Tail,
            point: None,
            prev: HEAD_SLOT,
            next: TAIL_SLOT,
            attached: true,
        }
    }

    /// A detached node, linked in by the list
    pub fn event(kind: NodeKind, time: RationalTime, value: V, easing: Easing) -> Self {
        Self {
            kind,
            point: Some(EventPoint { time, value, easing }),
            prev: HEAD_SLOT,
            next: TAIL_SLOT,
            attached: false,
        }
    }

    pub fn time(&self) -> Option<RationalTime> {
        self.point.as_ref().map(|p| p.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ids_are_unique() {
        let a = next_list_id();
        let b = next_list_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_sentinels_carry_no_point() {
        let head: Node<f64> = Node::head();
        let tail: Node<f64> = Node::tail();
        assert!(head.kind.is_sentinel() && tail.kind.is_sentinel());
        assert!(head.time().is_none() && tail.time().is_none());
    }

    #[test]
    fn test_event_nodes_start_detached() {
        let node = Node::event(NodeKind::Start, RationalTime::from_integer(2), 1.0, Easing::LINEAR);
        assert!(!node.attached);
        assert_eq!(node.time(), Some(RationalTime::from_integer(2)));
    }
}
