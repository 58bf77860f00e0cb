//! Exchange records: the flat shape event lists are saved and loaded as
//!
//! ```json
//! { "startTime": [0, 0, 1], "endTime": [4, 0, 1], "start": 0.0, "end": 10.0,
//!   "easing": { "curve": "linear" } }
//! ```
//!
//! Records must be gapless: each record ends where the next one starts.

use serde::{Deserialize, Serialize};

use crate::errors::{ChartError, ChartResult};
use crate::models::easing::Easing;
use crate::models::time::RationalTime;
use crate::models::value::EventValue;
use crate::timeline::event_list::{IndexedEventList, DEFAULT_MAX_BUCKETS};

/// One event as exchanged with the serialization layer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord<V> {
    pub start_time: RationalTime,
    pub end_time: RationalTime,
    pub start: V,
    pub end: V,
    #[serde(default)]
    pub easing: Easing,
}

impl<V> EventRecord<V> {
    pub fn new(start_time: RationalTime, end_time: RationalTime, start: V, end: V) -> Self {
        Self {
            start_time,
            end_time,
            start,
            end,
            easing: Easing::LINEAR,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }
}

impl<V: EventValue> IndexedEventList<V> {
    /// Build a list from gapless records
    pub fn import(records: &[EventRecord<V>], effective_beats: RationalTime) -> ChartResult<Self> {
        Self::import_with_max_buckets(records, effective_beats, DEFAULT_MAX_BUCKETS)
    }

    pub fn import_with_max_buckets(
        records: &[EventRecord<V>],
        effective_beats: RationalTime,
        max_buckets: usize,
    ) -> ChartResult<Self> {
        let (first, rest) = records
            .split_first()
            .ok_or_else(|| ChartError::value("an event list needs at least one record"))?;

        for (i, record) in records.iter().enumerate() {
            if record.end_time < record.start_time {
                return Err(ChartError::structural(format!(
                    "record {} ends at {} before it starts at {}",
                    i, record.end_time, record.start_time
                )));
            }
        }
        for (i, pair) in records.windows(2).enumerate() {
            if pair[0].end_time != pair[1].start_time {
                return Err(ChartError::structural(format!(
                    "records {} and {} leave a gap or overlap ({} vs {})",
                    i,
                    i + 1,
                    pair[0].end_time,
                    pair[1].start_time
                )));
            }
        }

        let mut list = Self::starting_at(
            first.start_time,
            first.start.clone(),
            first.easing,
            effective_beats,
            max_buckets,
        );
        let mut previous = first;
        for record in rest {
            list.append_pair_unindexed(
                record.start_time,
                previous.end.clone(),
                record.start.clone(),
                record.easing,
            )?;
            previous = record;
        }
        // Tail start holds the last end value
        list.append_pair_unindexed(
            previous.end_time,
            previous.end.clone(),
            previous.end.clone(),
            Easing::LINEAR,
        )?;
        list.rebuild_index();
        log::debug!("imported {} records into {} nodes", records.len(), list.len());
        Ok(list)
    }

    /// Dump back to records. A trailing zero-length record is added when
    /// the tail start's held value cannot be recovered from the last record.
    pub fn dump(&self) -> Vec<EventRecord<V>> {
        let mut records = Vec::with_capacity(self.event_count() + 1);
        let mut last_end: Option<V> = None;
        for start in self.starts() {
            let (start_time, start_value) = self.point_parts(start);
            let easing = self.easing(start).unwrap_or_default();
            match self.end_of(start) {
                Some(end) => {
                    let (end_time, end_value) = self.point_parts(end);
                    records.push(EventRecord {
                        start_time,
                        end_time,
                        start: start_value.clone(),
                        end: end_value.clone(),
                        easing,
                    });
                    last_end = Some(end_value.clone());
                }
                None => {
                    if last_end.as_ref() != Some(start_value) {
                        records.push(EventRecord {
                            start_time,
                            end_time: start_time,
                            start: start_value.clone(),
                            end: start_value.clone(),
                            easing,
                        });
                    }
                }
            }
        }
        records
    }
}
