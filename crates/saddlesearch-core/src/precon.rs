//! Preconditioner abstraction for saddle-point search.
//!
//! A preconditioner is a symmetric positive-definite linear operator `P(x)`
//! supplying an inner product `<a, P b>`, the induced norm, the product
//! `P v`, and the inverse solve `P \ r`. The search controllers consume this
//! interface; constructing and updating a concrete operator is the caller's
//! concern. The operator may depend on the current position and is refreshed
//! through [`Preconditioner::prepare`] exactly once per iteration, which is
//! its sole mutation point.

use crate::{
    error::Result,
    types::{DVector, Scalar},
};
use num_traits::Float;
use std::fmt::Debug;

/// Symmetric positive-definite metric used to rescale gradients and
/// search directions.
pub trait Preconditioner<T: Scalar>: Debug {
    /// Refreshes the operator from the current position.
    ///
    /// Called at most once per iteration, before any inner products or
    /// solves of that iteration. The default implementation is a no-op,
    /// matching position-independent operators.
    fn prepare(&mut self, x: &DVector<T>) -> Result<()> {
        let _ = x;
        Ok(())
    }

    /// Applies the operator: returns `P v`.
    fn apply(&self, v: &DVector<T>) -> DVector<T>;

    /// Solves `P u = r` for `u`.
    fn solve(&self, r: &DVector<T>) -> Result<DVector<T>>;

    /// Inner product `<a, P b>`.
    fn inner(&self, a: &DVector<T>, b: &DVector<T>) -> T;

    /// Norm induced by the inner product.
    fn norm(&self, v: &DVector<T>) -> T {
        <T as Float>::sqrt(self.inner(v, v))
    }

    /// Returns the name of this preconditioner.
    fn name(&self) -> &str {
        "Generic Preconditioner"
    }
}

/// Identity preconditioner (no preconditioning).
///
/// The default metric: the inner product is the Euclidean dot product and
/// solves return the input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPrecon;

impl<T: Scalar> Preconditioner<T> for IdentityPrecon {
    fn apply(&self, v: &DVector<T>) -> DVector<T> {
        v.clone_owned()
    }

    fn solve(&self, r: &DVector<T>) -> Result<DVector<T>> {
        Ok(r.clone_owned())
    }

    fn inner(&self, a: &DVector<T>, b: &DVector<T>) -> T {
        a.dot(b)
    }

    fn name(&self) -> &str {
        "Identity"
    }
}

/// Rank-one Sherman-Morrison-Woodbury update of a base operator,
/// `P = P0 + shift * (P0 v)(P0 v)'`.
///
/// The dimer iteration uses this to rescale the metric along the current
/// dimer direction from the finite-difference curvature estimate. With
/// `shift = 0` the wrapper reduces exactly to the base operator, which is
/// how the non-rescaled path is expressed.
///
/// The closed-form solve assumes the direction was normalized in the base
/// metric beforehand (`<v, P0 v> = 1` up to roundoff); the stored value of
/// `<v, P0 v>` is used, so mild deviations stay consistent.
#[derive(Debug)]
pub struct RankOneUpdate<'a, T: Scalar, P: Preconditioner<T>> {
    base: &'a P,
    v: DVector<T>,
    pv: DVector<T>,
    vpv: T,
    shift: T,
}

impl<'a, T: Scalar, P: Preconditioner<T>> RankOneUpdate<'a, T, P> {
    /// Wraps `base` with a rank-one update along `v` of magnitude `shift`.
    pub fn new(base: &'a P, v: DVector<T>, shift: T) -> Self {
        let pv = base.apply(&v);
        let vpv = v.dot(&pv);
        Self {
            base,
            v,
            pv,
            vpv,
            shift,
        }
    }
}

impl<T: Scalar, P: Preconditioner<T>> Preconditioner<T> for RankOneUpdate<'_, T, P> {
    fn apply(&self, u: &DVector<T>) -> DVector<T> {
        self.base.apply(u) + &self.pv * (self.shift * self.pv.dot(u))
    }

    fn solve(&self, r: &DVector<T>) -> Result<DVector<T>> {
        let base = self.base.solve(r)?;
        let denom = T::one() + self.shift * self.vpv;
        if <T as Float>::abs(denom) <= T::EPSILON {
            // Degenerate update; fall back to the base solve.
            return Ok(base);
        }
        Ok(base - &self.v * (self.shift / denom * self.v.dot(r)))
    }

    fn inner(&self, a: &DVector<T>, b: &DVector<T>) -> T {
        self.base.inner(a, b) + self.shift * self.pv.dot(a) * self.pv.dot(b)
    }

    fn name(&self) -> &str {
        "RankOneUpdate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_preconditioner() {
        let precon = IdentityPrecon;
        let a = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let b = DVector::from_vec(vec![-1.0, 0.5, 2.0]);

        assert_relative_eq!(Preconditioner::<f64>::inner(&precon, &a, &b), a.dot(&b));
        assert_relative_eq!(Preconditioner::<f64>::norm(&precon, &a), a.norm());
        assert_eq!(precon.solve(&a).unwrap(), a);
        assert_eq!(Preconditioner::<f64>::apply(&precon, &b), b);
    }

    #[test]
    fn test_rank_one_update_zero_shift_is_base() {
        let base = IdentityPrecon;
        let v = DVector::from_vec(vec![0.0, 1.0]);
        let updated = RankOneUpdate::new(&base, v, 0.0);

        let r = DVector::from_vec(vec![3.0, -2.0]);
        assert_eq!(updated.solve(&r).unwrap(), r);
        assert_relative_eq!(updated.inner(&r, &r), r.norm_squared());
    }

    #[test]
    fn test_rank_one_update_solve_inverts_apply() {
        let base = IdentityPrecon;
        let v = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        let updated = RankOneUpdate::new(&base, v, 0.75);

        let r = DVector::from_vec(vec![2.0, -1.0, 4.0]);
        let u = updated.solve(&r).unwrap();
        let back = updated.apply(&u);
        for i in 0..3 {
            assert_relative_eq!(back[i], r[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rank_one_solve_inverts_apply_random() {
        use rand::{rngs::SmallRng, Rng, SeedableRng};

        let mut rng = SmallRng::seed_from_u64(42);
        let base = IdentityPrecon;
        for _ in 0..10 {
            let mut v: DVector<f64> = DVector::from_fn(4, |_, _| rng.gen_range(-1.0..1.0));
            let n = Preconditioner::<f64>::norm(&base, &v);
            v /= n;
            let shift = rng.gen_range(-0.5..2.0);
            let updated = RankOneUpdate::new(&base, v, shift);

            let r: DVector<f64> = DVector::from_fn(4, |_, _| rng.gen_range(-1.0..1.0));
            let u = updated.solve(&r).unwrap();
            let back = updated.apply(&u);
            for i in 0..4 {
                assert_relative_eq!(back[i], r[i], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_rank_one_update_shifts_along_direction_only() {
        let base = IdentityPrecon;
        let v = DVector::from_vec(vec![0.0, 1.0]);
        let updated = RankOneUpdate::new(&base, v.clone(), 3.0);

        // P = I + 3 e2 e2', so <e2, P e2> = 4 while <e1, P e1> = 1.
        let e1 = DVector::from_vec(vec![1.0, 0.0]);
        assert_relative_eq!(updated.inner(&v, &v), 4.0);
        assert_relative_eq!(updated.inner(&e1, &e1), 1.0);
        assert_relative_eq!(updated.norm(&v), 2.0);
    }
}
