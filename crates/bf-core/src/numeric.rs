/// Floating point type used throughout the host-side system.
pub type Real = f64;

/// Returns the first non-finite entry of `values`, if any.
pub fn first_non_finite(values: &[Real]) -> Option<(usize, Real)> {
    values
        .iter()
        .copied()
        .enumerate()
        .find(|(_, v)| !v.is_finite())
}

/// Linear interpolation between `a` and `b` at fraction `t` (not clamped).
#[inline]
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn lerp_stays_between_endpoints(a in -1e6_f64..1e6, b in -1e6_f64..1e6, t in 0.0_f64..=1.0) {
            let v = lerp(a, b, t);
            let slack = 1e-9 * (a.abs() + b.abs() + 1.0);
            prop_assert!(v >= a.min(b) - slack && v <= a.max(b) + slack);
        }
    }

    #[test]
    fn first_non_finite_reports_index() {
        assert_eq!(first_non_finite(&[1.0, 2.0]), None);
        let (idx, v) = first_non_finite(&[1.0, Real::INFINITY, Real::NAN]).unwrap();
        assert_eq!(idx, 1);
        assert!(v.is_infinite());
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }
}
