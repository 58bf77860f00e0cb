//! Easing curves for event interpolation
//!
//! An [`Easing`] maps event progress `t ∈ [0, 1]` to an interpolation weight.
//! A curve may be clipped to a sub-range `[left, right]` of itself, in which
//! case the clipped piece is stretched back so that 0 maps to 0 and 1 to 1.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Named easing curve
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum EasingCurve {
    #[default]
    Linear,
    /// Holds the start value until the event ends
    Constant,
    SineIn,
    SineOut,
    SineInOut,
    QuadIn,
    QuadOut,
    QuadInOut,
    CubicIn,
    CubicOut,
    CubicInOut,
    QuartIn,
    QuartOut,
    QuartInOut,
    QuintIn,
    QuintOut,
    QuintInOut,
    ExpoIn,
    ExpoOut,
    ExpoInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    ElasticIn,
    ElasticOut,
    BounceIn,
    BounceOut,
    BounceInOut,
}

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC_C4: f64 = (2.0 * PI) / 3.0;

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

impl EasingCurve {
    /// Evaluate the curve at `t`, which must lie in `[0, 1]`
    pub fn eval(self, t: f64) -> f64 {
        use EasingCurve::*;
        match self {
            Linear => t,
            Constant => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            SineIn => 1.0 - (t * PI / 2.0).cos(),
            SineOut => (t * PI / 2.0).sin(),
            SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            QuadIn => t * t,
            QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            CubicIn => t.powi(3),
            CubicOut => 1.0 - (1.0 - t).powi(3),
            CubicInOut => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            QuartIn => t.powi(4),
            QuartOut => 1.0 - (1.0 - t).powi(4),
            QuartInOut => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) / 2.0
                }
            }
            QuintIn => t.powi(5),
            QuintOut => 1.0 - (1.0 - t).powi(5),
            QuintInOut => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) / 2.0
                }
            }
            ExpoIn => {
                if t == 0.0 {
                    0.0
                } else {
                    2f64.powf(10.0 * t - 10.0)
                }
            }
            ExpoOut => {
                if t == 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
            ExpoInOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    2f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            CircIn => 1.0 - (1.0 - t * t).sqrt(),
            CircOut => (1.0 - (t - 1.0).powi(2)).sqrt(),
            CircInOut => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            BackIn => BACK_C3 * t.powi(3) - BACK_C1 * t * t,
            BackOut => 1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2),
            BackInOut => {
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0)
                        / 2.0
                }
            }
            ElasticIn => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
                }
            }
            ElasticOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else {
                    2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
                }
            }
            BounceIn => 1.0 - bounce_out(1.0 - t),
            BounceOut => bounce_out(t),
            BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }
}

fn default_left() -> f64 {
    0.0
}

fn default_right() -> f64 {
    1.0
}

/// Easing descriptor attached to the Start node of an event
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Easing {
    pub curve: EasingCurve,
    /// Clip start on the curve's own `[0, 1]` domain
    #[serde(default = "default_left")]
    pub left: f64,
    /// Clip end on the curve's own `[0, 1]` domain
    #[serde(default = "default_right")]
    pub right: f64,
}

impl Default for Easing {
    fn default() -> Self {
        Self::new(EasingCurve::Linear)
    }
}

impl From<EasingCurve> for Easing {
    fn from(curve: EasingCurve) -> Self {
        Self::new(curve)
    }
}

impl Easing {
    pub const LINEAR: Easing = Easing {
        curve: EasingCurve::Linear,
        left: 0.0,
        right: 1.0,
    };

    pub fn new(curve: EasingCurve) -> Self {
        Self {
            curve,
            left: 0.0,
            right: 1.0,
        }
    }

    /// A clipped easing using only `[left, right]` of `curve`
    pub fn clipped(curve: EasingCurve, left: f64, right: f64) -> Self {
        Self { curve, left, right }
    }

    pub fn is_clipped(&self) -> bool {
        self.left != 0.0 || self.right != 1.0
    }

    /// Interpolation weight at progress `t`; `t` is clamped to `[0, 1]`
    pub fn apply(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        if !self.is_clipped() {
            return self.curve.eval(t);
        }
        let left = self.left.clamp(0.0, 1.0);
        let right = self.right.clamp(0.0, 1.0);
        let low = self.curve.eval(left);
        let high = self.curve.eval(right);
        if (high - low).abs() < f64::EPSILON {
            return t;
        }
        let u = left + t * (right - left);
        (self.curve.eval(u) - low) / (high - low)
    }
}
