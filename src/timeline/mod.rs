//! Indexed event sequences
//!
//! - `node`: arena slots and stable node handles
//! - `jump_index`: sampled checkpoints for sub-linear lookup
//! - `event_list`: the generic list of events
//! - `records`: flat exchange form of a list
//! - `bpm`: the tempo map built on an event list

pub mod node;
pub mod jump_index;
pub mod event_list;
pub mod records;
pub mod bpm;

pub use bpm::{BpmSegment, BpmTimeline};
pub use event_list::{IndexedEventList, InsertOutcome};
pub use node::{NodeId, NodeKind};
pub use records::EventRecord;
