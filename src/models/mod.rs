//! Value types shared by every timeline: beat positions, easing curves and
//! the interpolation contract of event values.

pub mod time;
pub mod easing;
pub mod value;

pub use easing::{Easing, EasingCurve};
pub use time::RationalTime;
pub use value::EventValue;
