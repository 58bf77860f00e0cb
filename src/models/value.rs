//! Values carried by event nodes

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A quantity an event can transition between
pub trait EventValue: Clone + PartialEq + Debug + Serialize + DeserializeOwned {
    /// Value at interpolation weight `weight` (already eased) between `start`
    /// and `end`. Weights may leave `[0, 1]` for overshooting curves.
    fn interpolate(start: &Self, end: &Self, weight: f64) -> Self;
}

impl EventValue for f64 {
    fn interpolate(start: &Self, end: &Self, weight: f64) -> Self {
        start + (end - start) * weight
    }
}
