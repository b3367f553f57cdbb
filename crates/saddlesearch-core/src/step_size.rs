//! Barzilai-Borwein step-size estimation.
//!
//! The BB rule approximates a Newton step from a secant pair without forming
//! the Hessian: given the displacement `dx` since the last accepted iteration
//! and the corresponding change `dp` in the search direction, the estimate is
//!
//! `beta = | <dx, P dp> / <dp, P dp> |`
//!
//! under the current preconditioned inner product. The sign is normalized to
//! non-negative by construction.
//!
//! # References
//!
//! - Barzilai & Borwein, "Two-point step size gradient methods" (1988)

use crate::{
    precon::Preconditioner,
    types::{DVector, Scalar},
};
use num_traits::Float;

/// Preconditioned Barzilai-Borwein secant estimate of a step size.
///
/// Degenerate secants are a defined failure path, not a silent NaN source:
/// with a vanishing denominator the estimate is NaN when the numerator is
/// nonzero (the caller terminates as a line-search failure) and zero when
/// the secant pair itself vanished (nothing moved, so no step is taken).
pub fn barzilai_borwein<T, P>(dx: &DVector<T>, dp: &DVector<T>, precon: &P) -> T
where
    T: Scalar,
    P: Preconditioner<T>,
{
    let denominator = precon.inner(dp, dp);
    if !Float::is_finite(denominator) {
        return T::nan();
    }
    if denominator == T::zero() {
        let numerator = precon.inner(dx, dp);
        return if numerator == T::zero() {
            T::zero()
        } else {
            T::nan()
        };
    }
    <T as Float>::abs(precon.inner(dx, dp) / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precon::IdentityPrecon;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_secant_estimate_identity_metric() {
        let dx = DVector::from_vec(vec![1.0, 2.0]);
        let dp = DVector::from_vec(vec![2.0, 0.0]);
        // |<dx, dp>| / <dp, dp> = 2 / 4
        assert_relative_eq!(barzilai_borwein(&dx, &dp, &IdentityPrecon), 0.5);
    }

    #[test]
    fn test_sign_normalization() {
        let dx = DVector::from_vec(vec![-3.0, 0.0]);
        let dp = DVector::from_vec(vec![1.0, 0.0]);
        assert_relative_eq!(barzilai_borwein(&dx, &dp, &IdentityPrecon), 3.0);
    }

    #[test]
    fn test_degenerate_denominator_is_nan() {
        let dx = DVector::from_vec(vec![1.0, 1.0]);
        let dp = DVector::zeros(2);
        assert!(barzilai_borwein(&dx, &dp, &IdentityPrecon).is_nan());
    }

    #[test]
    fn test_vanished_secant_pair_is_zero() {
        let dx = DVector::<f64>::zeros(2);
        let dp = DVector::zeros(2);
        assert_relative_eq!(barzilai_borwein(&dx, &dp, &IdentityPrecon), 0.0);
    }

    proptest! {
        #[test]
        fn prop_estimate_is_nonnegative_or_nan(
            dx in prop::collection::vec(-1e3f64..1e3, 3),
            dp in prop::collection::vec(-1e3f64..1e3, 3),
        ) {
            let dx = DVector::from_vec(dx);
            let dp = DVector::from_vec(dp);
            let step = barzilai_borwein(&dx, &dp, &IdentityPrecon);
            prop_assert!(step.is_nan() || step >= 0.0);
        }
    }
}
