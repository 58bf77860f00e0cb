//! Exact beat time as a mixed fraction
//!
//! A `RationalTime` is the triple `[whole, numerator, denominator]` counted in
//! beats from chart start. Comparisons are exact over the whole `i64` range:
//! they widen to `i128`. Arithmetic is checked and fails with
//! [`ChartError::Value`] when a result does not fit the triple.
//! [`RationalTime::to_f64`] is the only float path and is meant for index
//! bucketing and display.

use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedMul, CheckedSub};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::errors::{ChartError, ChartResult};

type Ratio128 = Ratio<i128>;

/// Beat position `whole + numerator / denominator`
///
/// Every value can be normalized without leaving `i64`; [`new`](Self::new)
/// rejects triples that cannot.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(try_from = "[i64; 3]", into = "[i64; 3]")]
pub struct RationalTime {
    whole: i64,
    numerator: i64,
    denominator: i64,
}

impl RationalTime {
    pub const ZERO: RationalTime = RationalTime {
        whole: 0,
        numerator: 0,
        denominator: 1,
    };

    /// Create a time from a raw triple. The triple is stored as given;
    /// call [`normalize`](Self::normalize) to reduce it.
    pub fn new(whole: i64, numerator: i64, denominator: i64) -> ChartResult<Self> {
        let invalid = ChartError::InvalidTime {
            whole,
            numerator,
            denominator,
        };
        if denominator == 0 {
            return Err(invalid);
        }
        let time = Self {
            whole,
            numerator,
            denominator,
        };
        // The normalized form must be representable too
        Self::from_ratio(time.to_ratio()).map_err(|_| invalid)?;
        Ok(time)
    }

    pub const fn from_integer(whole: i64) -> Self {
        Self {
            whole,
            numerator: 0,
            denominator: 1,
        }
    }

    /// Snap a float beat position to the nearest `1/subdivision` grid point
    pub fn from_f64_snapped(beats: f64, subdivision: u32) -> ChartResult<Self> {
        if subdivision == 0 {
            return Err(ChartError::value("snap subdivision must be positive"));
        }
        if !beats.is_finite() {
            return Err(ChartError::value(format!("cannot snap non-finite beat {}", beats)));
        }
        let ticks = (beats * subdivision as f64).round() as i64;
        Self::from_ratio(Ratio128::new(ticks as i128, subdivision as i128))
    }

    pub fn whole(&self) -> i64 {
        self.whole
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Reduce in place: denominator 1 for integral values, otherwise a
    /// proper fraction in lowest terms with any carry moved into `whole`.
    pub fn normalize(&mut self) {
        *self = self.normalized();
    }

    pub fn normalized(self) -> Self {
        // Construction guarantees the normalized form fits
        Self::from_ratio(self.to_ratio()).unwrap_or(self)
    }

    pub fn is_integral(&self) -> bool {
        self.to_ratio().is_integer()
    }

    pub fn checked_add(self, rhs: Self) -> ChartResult<Self> {
        self.to_ratio()
            .checked_add(&rhs.to_ratio())
            .ok_or_else(|| overflow("adding", self, rhs))
            .and_then(Self::from_ratio)
    }

    pub fn checked_sub(self, rhs: Self) -> ChartResult<Self> {
        self.to_ratio()
            .checked_sub(&rhs.to_ratio())
            .ok_or_else(|| overflow("subtracting", self, rhs))
            .and_then(Self::from_ratio)
    }

    pub fn checked_mul(self, rhs: Self) -> ChartResult<Self> {
        self.to_ratio()
            .checked_mul(&rhs.to_ratio())
            .ok_or_else(|| overflow("multiplying", self, rhs))
            .and_then(Self::from_ratio)
    }

    /// Multiply by `numerator / denominator`
    pub fn mul_ratio(self, numerator: i64, denominator: i64) -> ChartResult<Self> {
        let factor = Self::new(0, numerator, denominator)?;
        self.checked_mul(factor)
    }

    /// `self - earlier` in beats, as a float. Exact up to the final
    /// rounding unless the difference overflows, in which case the float
    /// positions are subtracted.
    pub fn beats_since(self, earlier: Self) -> f64 {
        match self.to_ratio().checked_sub(&earlier.to_ratio()) {
            Some(delta) => ratio_to_f64(&delta),
            None => self.to_f64() - earlier.to_f64(),
        }
    }

    /// Approximate value in beats
    pub fn to_f64(&self) -> f64 {
        self.whole as f64 + self.numerator as f64 / self.denominator as f64
    }

    pub(crate) fn to_ratio(self) -> Ratio128 {
        // |whole * denominator| < 2^126, so this never overflows.
        // Ratio::new folds the sign of the denominator and reduces.
        Ratio128::new(
            self.whole as i128 * self.denominator as i128 + self.numerator as i128,
            self.denominator as i128,
        )
    }

    /// Floor-normalize a reduced ratio, failing when a part leaves `i64`
    pub(crate) fn from_ratio(r: Ratio128) -> ChartResult<Self> {
        let (numer, denom) = (*r.numer(), *r.denom());
        let out_of_range = || ChartError::value(format!("beat time {}/{} is out of range", numer, denom));
        let whole = i64::try_from(numer.div_euclid(denom)).map_err(|_| out_of_range())?;
        let rem = numer.rem_euclid(denom);
        if rem == 0 {
            return Ok(Self::from_integer(whole));
        }
        Ok(Self {
            whole,
            numerator: i64::try_from(rem).map_err(|_| out_of_range())?,
            denominator: i64::try_from(denom).map_err(|_| out_of_range())?,
        })
    }
}

fn overflow(op: &str, lhs: RationalTime, rhs: RationalTime) -> ChartError {
    ChartError::value(format!("overflow {} beat times {} and {}", op, lhs, rhs))
}

fn ratio_to_f64(r: &Ratio128) -> f64 {
    let whole = r.numer().div_euclid(*r.denom());
    let rem = r.numer().rem_euclid(*r.denom());
    whole as f64 + rem as f64 / *r.denom() as f64
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<i64> for RationalTime {
    fn from(whole: i64) -> Self {
        Self::from_integer(whole)
    }
}

impl TryFrom<[i64; 3]> for RationalTime {
    type Error = ChartError;

    fn try_from(triple: [i64; 3]) -> Result<Self, Self::Error> {
        Self::new(triple[0], triple[1], triple[2])
    }
}

impl From<RationalTime> for [i64; 3] {
    fn from(t: RationalTime) -> Self {
        [t.whole, t.numerator, t.denominator]
    }
}

impl PartialEq for RationalTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RationalTime {}

impl PartialOrd for RationalTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RationalTime {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ratio's ordering compares without cross-multiplying
        self.to_ratio().cmp(&other.to_ratio())
    }
}

impl Hash for RationalTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let n = self.normalized();
        n.whole.hash(state);
        n.numerator.hash(state);
        n.denominator.hash(state);
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.normalized();
        if n.numerator == 0 {
            write!(f, "{}", n.whole)
        } else {
            write!(f, "{}+{}/{}", n.whole, n.numerator, n.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(w: i64, n: i64, d: i64) -> RationalTime {
        RationalTime::new(w, n, d).unwrap()
    }

    #[test]
    fn test_zero_denominator_rejected() {
        let err = RationalTime::new(1, 1, 0).unwrap_err();
        assert!(matches!(err, ChartError::InvalidTime { denominator: 0, .. }));
    }

    #[test]
    fn test_normalize_carries_into_whole() {
        let mut time = t(1, 7, 4);
        time.normalize();
        assert_eq!((time.whole(), time.numerator(), time.denominator()), (2, 3, 4));
    }

    #[test]
    fn test_normalize_integral_forces_denominator_one() {
        let time = t(0, 6, 3).normalized();
        assert_eq!((time.whole(), time.numerator(), time.denominator()), (2, 0, 1));
    }

    #[test]
    fn test_normalize_negative_denominator() {
        let time = t(0, 1, -2).normalized();
        // -1/2 == -1 + 1/2
        assert_eq!((time.whole(), time.numerator(), time.denominator()), (-1, 1, 2));
    }

    #[test]
    fn test_equality_is_by_value() {
        assert_eq!(t(1, 2, 4), t(1, 1, 2));
        assert_ne!(t(1, 1, 3), t(1, 1, 2));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(t(1, 1, 2).checked_add(t(0, 3, 4)).unwrap(), t(2, 1, 4));
        assert_eq!(t(1, 1, 2).checked_sub(t(0, 3, 4)).unwrap(), t(0, 3, 4));
        assert_eq!(t(1, 1, 2).checked_mul(t(2, 0, 1)).unwrap(), t(3, 0, 1));
        assert_eq!(t(3, 0, 1).mul_ratio(1, 3).unwrap(), t(1, 0, 1));
        assert!(t(3, 0, 1).mul_ratio(1, 0).is_err());
    }

    #[test]
    fn test_ordering_exact() {
        // 1/3 and 333333333/1000000000 are close as floats but ordered exactly
        let third = t(0, 1, 3);
        let approx = t(0, 333_333_333, 1_000_000_000);
        assert!(approx < third);
        assert!(third > approx);
    }

    #[test]
    fn test_serde_triple() {
        let json = serde_json::to_string(&t(4, 1, 2)).unwrap();
        assert_eq!(json, "[4,1,2]");
        let back: RationalTime = serde_json::from_str("[4,2,4]").unwrap();
        assert_eq!(back, t(4, 1, 2));
        assert!(serde_json::from_str::<RationalTime>("[1,1,0]").is_err());
    }

    #[test]
    fn test_snap() {
        assert_eq!(RationalTime::from_f64_snapped(1.26, 4).unwrap(), t(1, 1, 4));
        assert!(RationalTime::from_f64_snapped(f64::NAN, 4).is_err());
        assert!(RationalTime::from_f64_snapped(1.0, 0).is_err());
    }

    #[test]
    fn test_wide_values_compare_without_overflow() {
        let huge = t(1 << 62, 1, 4);
        assert!(huge > RationalTime::ZERO);
        assert!(huge < t(i64::MAX, 0, 1));
        assert_eq!(t(i64::MAX, 0, 1), t(i64::MAX, 0, 1).normalized());
        assert!(t(i64::MIN, 1, i64::MAX) > t(i64::MIN, 0, 1));
    }

    #[test]
    fn test_unrepresentable_triple_rejected() {
        // Normalizes to a whole part past i64::MAX
        assert!(matches!(
            RationalTime::new(i64::MAX, 2, 1),
            Err(ChartError::InvalidTime { .. })
        ));
        assert!(serde_json::from_str::<RationalTime>(&format!("[{}, 3, 2]", i64::MAX)).is_err());
        // Negative denominators fold into the numerator
        assert!(RationalTime::new(0, i64::MIN, -1).is_err());
    }

    #[test]
    fn test_checked_arithmetic_overflow() {
        let b = t(0, 1, 1_000_000_007);
        let c = t(0, 1, 1_000_000_009);
        let d = t(0, 1, 999_999_937);
        let sum = b.checked_add(c).and_then(|bc| bc.checked_add(d));
        assert!(matches!(sum, Err(ChartError::Value(_))));

        let max = t(i64::MAX, 0, 1);
        assert!(max.checked_add(t(1, 0, 1)).is_err());
        assert!(t(i64::MIN, 0, 1).checked_sub(t(1, 0, 1)).is_err());
        assert!(max.checked_mul(t(2, 0, 1)).is_err());
        assert!((max.beats_since(t(i64::MIN, 0, 1)) - 2f64.powi(64)).abs() < 1e6);
    }

    #[test]
    fn test_beats_since() {
        assert_eq!(t(3, 1, 2).beats_since(t(1, 1, 4)), 2.25);
        assert_eq!(t(1, 0, 1).beats_since(t(2, 0, 1)), -1.0);
    }

    #[test]
    fn test_display() {
        assert_eq!(t(1, 2, 4).to_string(), "1+1/2");
        assert_eq!(t(0, 4, 2).to_string(), "2");
    }
}
