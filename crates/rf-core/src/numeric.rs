use crate::{RfError, RfResult};

/// Absolute and relative slack for comparing accumulated times and volumes.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: f64,
    pub rel: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

impl Tolerances {
    /// Slack used when checking that sub-steps add up to a report step.
    pub const fn time() -> Self {
        Self {
            abs: 1e-6,
            rel: 1e-12,
        }
    }
}

pub fn nearly_equal(a: f64, b: f64, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    diff <= tol.abs || diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(value: f64, what: &'static str) -> RfResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RfError::NonFinite { what, value })
    }
}

/// Finite and strictly greater than zero.
pub fn ensure_positive(value: f64, what: &'static str) -> RfResult<f64> {
    if ensure_finite(value, what)? > 0.0 {
        Ok(value)
    } else {
        Err(RfError::NonPositive { what, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sub_step_sums_match_within_time_slack() {
        let covered: f64 = [86_400.0 / 3.0; 3].iter().sum();
        assert!(nearly_equal(covered, 86_400.0, Tolerances::time()));
        assert!(!nearly_equal(86_399.0, 86_400.0, Tolerances::time()));
    }

    #[test]
    fn non_finite_values_are_named_in_the_error() {
        let err = ensure_finite(f64::NAN, "pore_volume_m3").unwrap_err();
        assert!(err.to_string().starts_with("pore_volume_m3"));
    }

    #[test]
    fn positive_check_rejects_zero_negative_and_infinite() {
        assert!(matches!(
            ensure_positive(0.0, "volume_m3"),
            Err(RfError::NonPositive { .. })
        ));
        assert!(ensure_positive(-1.0, "volume_m3").is_err());
        assert!(matches!(
            ensure_positive(f64::INFINITY, "volume_m3"),
            Err(RfError::NonFinite { .. })
        ));
        assert_eq!(ensure_positive(2.5, "volume_m3"), Ok(2.5));
    }

    proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e9_f64..1e9, b in -1e9_f64..1e9) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }
    }
}
