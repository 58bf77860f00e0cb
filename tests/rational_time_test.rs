use chart_timeline::{ChartError, RationalTime};
use proptest::prelude::*;

fn time() -> impl Strategy<Value = RationalTime> {
    (-1000i64..1000, -1000i64..1000, 1i64..1000)
        .prop_map(|(w, n, d)| RationalTime::new(w, n, d).unwrap())
}

/// Whole parts across the full range and denominators near `i64::MAX`
fn wide_time() -> impl Strategy<Value = RationalTime> {
    (
        any::<i64>(),
        any::<i64>(),
        prop_oneof![1i64..1000, 999_999_000i64..1_000_001_000, (i64::MAX - 1000)..i64::MAX],
    )
        .prop_filter_map("unrepresentable", |(w, n, d)| RationalTime::new(w, n, d).ok())
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

proptest! {
    #[test]
    fn normalize_reduces_to_proper_fraction(t in time()) {
        let n = t.normalized();
        if t.is_integral() {
            prop_assert_eq!(n.denominator(), 1);
            prop_assert_eq!(n.numerator(), 0);
        } else {
            prop_assert!(n.denominator() > 1);
            prop_assert!(0 <= n.numerator() && n.numerator() < n.denominator());
            prop_assert_eq!(gcd(n.numerator(), n.denominator()), 1);
        }
        prop_assert_eq!(n, t);
    }

    #[test]
    fn exactly_one_ordering_holds(a in time(), b in time()) {
        let lt = a < b;
        let eq = a == b;
        let gt = a > b;
        prop_assert_eq!([lt, eq, gt].iter().filter(|x| **x).count(), 1);
    }

    #[test]
    fn subtraction_undoes_addition(a in time(), b in time()) {
        let sum = a.checked_add(b).unwrap();
        prop_assert_eq!(sum.checked_sub(b).unwrap(), a);
    }

    #[test]
    fn wide_times_compare_and_add_without_panicking(a in wide_time(), b in wide_time()) {
        let lt = a < b;
        let gt = a > b;
        prop_assert!(!(lt && gt));
        prop_assert_eq!(a == b, a.cmp(&b) == std::cmp::Ordering::Equal);
        // Either an exact result or an error, never a panic or a wrap
        match a.checked_add(b) {
            Ok(sum) => {
                prop_assert_eq!(sum.cmp(&a), b.cmp(&RationalTime::ZERO));
                if let Ok(back) = sum.checked_sub(b) {
                    prop_assert_eq!(back, a);
                }
            }
            Err(err) => prop_assert!(matches!(err, ChartError::Value(_))),
        }
        if let Ok(diff) = a.checked_sub(b) {
            prop_assert_eq!(diff.cmp(&RationalTime::ZERO), a.cmp(&b));
        }
    }

    #[test]
    fn wide_triples_are_accepted_or_rejected(w in any::<i64>(), n in any::<i64>(), d in any::<i64>()) {
        match RationalTime::new(w, n, d) {
            Ok(t) => {
                let m = t.normalized();
                prop_assert_eq!(m, t);
                prop_assert!(m.denominator() > 0);
            }
            Err(err) => prop_assert!(matches!(err, ChartError::InvalidTime { .. }), "expected InvalidTime, got {:?}", err),
        }
    }

    #[test]
    fn ordering_agrees_with_float_value(a in time(), b in time()) {
        if a < b {
            prop_assert!(a.to_f64() <= b.to_f64());
        }
    }
}

#[test]
fn equal_values_with_different_triples() {
    let a = RationalTime::new(1, 2, 4).unwrap();
    let b = RationalTime::new(1, 1, 2).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.normalized().numerator(), 1);
}

#[test]
fn zero_denominator_is_rejected() {
    let err = RationalTime::new(3, 1, 0).unwrap_err();
    assert!(matches!(err, ChartError::InvalidTime { denominator: 0, .. }));
    assert!(serde_json::from_str::<RationalTime>("[3, 1, 0]").is_err());
}

#[test]
fn negative_results_floor_the_whole_part() {
    let t = RationalTime::from_integer(1)
        .checked_sub(RationalTime::new(1, 1, 2).unwrap())
        .unwrap();
    let n = t.normalized();
    assert_eq!((n.whole(), n.numerator(), n.denominator()), (-1, 1, 2));
}

#[test]
fn sums_past_the_triple_range_are_errors() {
    let b = RationalTime::new(0, 1, 1_000_000_007).unwrap();
    let c = RationalTime::new(0, 1, 1_000_000_009).unwrap();
    let d = RationalTime::new(0, 1, 999_999_937).unwrap();
    let bc = b.checked_add(c).unwrap();
    assert!(matches!(bc.checked_add(d), Err(ChartError::Value(_))));

    let huge = RationalTime::new(1 << 62, 1, 4).unwrap();
    assert!(huge > RationalTime::ZERO);
    let loaded: RationalTime = serde_json::from_str(&format!("[{}, 1, 4]", 1i64 << 62)).unwrap();
    assert_eq!(loaded, huge);
}
