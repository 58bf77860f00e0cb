//! Sampled checkpoints for sub-linear random access into an event list
//!
//! The effective span is cut into `n` equal buckets. `checkpoints[i]` is the
//! last Start whose key is at or before the lower bound of bucket `i`. A
//! lookup picks a bucket from the float approximation of the key, then walks
//! the list with exact comparisons, so a float rounding error can only cost a
//! few extra steps, never a wrong answer.

use std::fmt::Debug;

use crate::models::time::RationalTime;
use crate::timeline::node::NodeId;

/// Key a jump index is sampled by (beats, or seconds for the tempo map)
pub trait IndexKey: Copy + PartialOrd + Debug {
    /// Float approximation, used only to pick a bucket
    fn approx(&self) -> f64;

    /// Lower bound of bucket `i` out of `buckets` over `[0, span]`
    fn bucket_bound(span: Self, buckets: usize, i: usize) -> Self;
}

impl IndexKey for RationalTime {
    fn approx(&self) -> f64 {
        self.to_f64()
    }

    fn bucket_bound(span: Self, buckets: usize, i: usize) -> Self {
        // Lookups end with exact walks, so an approximate bound is enough
        span.mul_ratio(i as i64, buckets.max(1) as i64)
            .or_else(|_| RationalTime::from_f64_snapped(span.to_f64() * i as f64 / buckets.max(1) as f64, 1 << 16))
            .unwrap_or(span)
    }
}

impl IndexKey for f64 {
    fn approx(&self) -> f64 {
        *self
    }

    fn bucket_bound(span: Self, buckets: usize, i: usize) -> Self {
        span * i as f64 / buckets.max(1) as f64
    }
}

/// Navigation over the Start nodes of a list, keyed by `K`
pub trait StartWalker<K> {
    fn first_start(&self) -> NodeId;
    fn next_start(&self, id: NodeId) -> Option<NodeId>;
    fn prev_start(&self, id: NodeId) -> Option<NodeId>;
    /// `None` for sentinels and detached nodes
    fn key(&self, id: NodeId) -> Option<K>;
}

#[derive(Clone, Debug)]
pub struct JumpIndex<K> {
    span: K,
    checkpoints: Vec<NodeId>,
}

impl<K: IndexKey> JumpIndex<K> {
    /// An index with no checkpoints; every lookup scans from the first Start
    pub fn empty(span: K) -> Self {
        Self {
            span,
            checkpoints: Vec::new(),
        }
    }

    /// Sample `buckets` checkpoints (at least one) over `[0, span]`
    pub fn build<W: StartWalker<K>>(walker: &W, span: K, buckets: usize) -> Self {
        let buckets = buckets.max(1);
        let first = walker.first_start();
        let mut index = Self {
            span,
            checkpoints: vec![first; buckets],
        };
        index.resample(walker, 0, buckets - 1, first);
        index
    }

    pub fn bucket_count(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn span(&self) -> K {
        self.span
    }

    pub fn checkpoints(&self) -> &[NodeId] {
        &self.checkpoints
    }

    fn bound(&self, i: usize) -> K {
        K::bucket_bound(self.span, self.checkpoints.len(), i)
    }

    fn bucket_of(&self, key: K) -> usize {
        let n = self.checkpoints.len();
        let span = self.span.approx();
        if n == 0 || !(span > 0.0) {
            return 0;
        }
        let pos = key.approx() / span * n as f64;
        if !(pos > 0.0) {
            return 0;
        }
        (pos.floor() as usize).min(n - 1)
    }

    /// The Start covering `key`. Keys before the first Start clamp to it,
    /// keys past the last Start resolve to the last one. With
    /// `use_previous`, a key landing exactly on a Start resolves to the
    /// Start before it.
    pub fn lookup<W: StartWalker<K>>(&self, walker: &W, key: K, use_previous: bool) -> NodeId {
        let mut cur = self
            .checkpoints
            .get(self.bucket_of(key))
            .copied()
            .unwrap_or_else(|| walker.first_start());

        while let Some(k) = walker.key(cur) {
            let too_late = if use_previous { k >= key } else { k > key };
            if !too_late {
                break;
            }
            match walker.prev_start(cur) {
                Some(prev) => cur = prev,
                None => break,
            }
        }

        while let Some(next) = walker.next_start(cur) {
            match walker.key(next) {
                Some(k) if k < key || (!use_previous && k == key) => cur = next,
                _ => break,
            }
        }
        cur
    }

    /// Re-sample the buckets touched by a mutation between `from` (the last
    /// unchanged Start before the mutated span, `None` for the list head) and
    /// `to` (the key of the first unchanged node after it, `None` for the
    /// tail). One bucket of margin is taken on each side.
    pub fn update_range<W: StartWalker<K>>(&mut self, walker: &W, from: Option<NodeId>, to: Option<K>) {
        let n = self.checkpoints.len();
        if n == 0 {
            return;
        }
        let lo = from
            .and_then(|id| walker.key(id))
            .map(|k| self.bucket_of(k).saturating_sub(1))
            .unwrap_or(0);
        let hi = to
            .map(|k| (self.bucket_of(k) + 1).min(n - 1))
            .unwrap_or(n - 1);
        let anchor = from.unwrap_or_else(|| walker.first_start());
        log::trace!("jump index: resampling buckets {}..={} of {}", lo, hi, n);
        self.resample(walker, lo, hi, anchor);
    }

    fn resample<W: StartWalker<K>>(&mut self, walker: &W, lo: usize, hi: usize, anchor: NodeId) {
        let mut cur = anchor;
        let first_bound = self.bound(lo);
        while let Some(k) = walker.key(cur) {
            if k <= first_bound {
                break;
            }
            match walker.prev_start(cur) {
                Some(prev) => cur = prev,
                None => break,
            }
        }

        for i in lo..=hi {
            let bound = self.bound(i);
            while let Some(next) = walker.next_start(cur) {
                match walker.key(next) {
                    Some(k) if k <= bound => cur = next,
                    _ => break,
                }
            }
            self.checkpoints[i] = cur;
        }
    }
}
