//! Oracle interfaces for the energy landscape and for relaxation rate fields.
//!
//! The search controllers never own the physics: the energy `E`, its gradient
//! `dE`, and the ODE right-hand side `f` are supplied by the caller through
//! the traits defined here. Oracles are assumed deterministic for a given
//! input; this is required for the secant step estimates and for reproducible
//! runs.

use crate::{
    error::{Result, SaddleError},
    types::{infinity_norm, DMatrix, DVector, Scalar},
};
use std::cell::Cell;
use std::fmt::Debug;
use std::marker::PhantomData;

/// A scalar energy landscape with gradient, `E: R^n -> R`, `dE: R^n -> R^n`.
///
/// Both evaluations are dimension-preserving and must not mutate shared
/// state; a failing evaluation is reported through [`SaddleError`] and
/// unwinds the run.
pub trait EnergyLandscape<T: Scalar>: Debug {
    /// Evaluates the energy at a point.
    fn energy(&self, x: &DVector<T>) -> Result<T>;

    /// Evaluates the gradient of the energy at a point.
    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>>;
}

/// Right-hand-side oracle for relaxation-type search methods,
/// `f: (t, x, iteration) -> (rate, residual)`.
///
/// Besides the rate `x' = F(t, x)`, the oracle reports a scalar convergence
/// residual, which lets an adaptive integrator double as an optimizer
/// driver: the run terminates once the reported residual falls below the
/// configured tolerance.
pub trait RateField<T: Scalar>: Debug {
    /// Evaluates the rate and the convergence residual.
    fn rate(&self, t: T, x: &DVector<T>, iteration: usize) -> Result<(DVector<T>, T)>;
}

/// Adapter wrapping a pair of closures as an [`EnergyLandscape`].
pub struct FnLandscape<E, G> {
    energy: E,
    gradient: G,
}

impl<E, G> FnLandscape<E, G> {
    /// Creates a landscape from an energy closure and a gradient closure.
    pub fn new(energy: E, gradient: G) -> Self {
        Self { energy, gradient }
    }
}

impl<E, G> Debug for FnLandscape<E, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnLandscape").finish_non_exhaustive()
    }
}

impl<T, E, G> EnergyLandscape<T> for FnLandscape<E, G>
where
    T: Scalar,
    E: Fn(&DVector<T>) -> T,
    G: Fn(&DVector<T>) -> DVector<T>,
{
    fn energy(&self, x: &DVector<T>) -> Result<T> {
        Ok((self.energy)(x))
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        Ok((self.gradient)(x))
    }
}

/// Adapter wrapping a closure as a [`RateField`].
pub struct FnRateField<F> {
    field: F,
}

impl<F> FnRateField<F> {
    /// Creates a rate field from a closure returning `(rate, residual)`.
    pub fn new(field: F) -> Self {
        Self { field }
    }
}

impl<F> Debug for FnRateField<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnRateField").finish_non_exhaustive()
    }
}

impl<T, F> RateField<T> for FnRateField<F>
where
    T: Scalar,
    F: Fn(T, &DVector<T>, usize) -> (DVector<T>, T),
{
    fn rate(&self, t: T, x: &DVector<T>, iteration: usize) -> Result<(DVector<T>, T)> {
        Ok((self.field)(t, x, iteration))
    }
}

/// Steepest-descent rate field `x' = -dE(x)` derived from a landscape.
///
/// The reported residual is the infinity norm of the gradient, so an
/// adaptive integrator driven by this field relaxes toward a critical point
/// of the landscape.
#[derive(Debug)]
pub struct GradientFlow<'a, T: Scalar, L: EnergyLandscape<T>> {
    landscape: &'a L,
    _phantom: PhantomData<T>,
}

impl<'a, T: Scalar, L: EnergyLandscape<T>> GradientFlow<'a, T, L> {
    /// Wraps a landscape as a descent field.
    pub fn new(landscape: &'a L) -> Self {
        Self {
            landscape,
            _phantom: PhantomData,
        }
    }
}

impl<T: Scalar, L: EnergyLandscape<T>> RateField<T> for GradientFlow<'_, T, L> {
    fn rate(&self, _t: T, x: &DVector<T>, _iteration: usize) -> Result<(DVector<T>, T)> {
        let g = self.landscape.gradient(x)?;
        let residual = infinity_norm(&g);
        Ok((-g, residual))
    }
}

/// A quadratic landscape `E(x) = x' A x / 2` for tests and benchmarks.
///
/// With an indefinite `A` this is the canonical saddle fixture: the origin
/// is a critical point whose Hessian is `A` itself.
#[derive(Debug, Clone)]
pub struct QuadraticForm<T: Scalar> {
    /// The (symmetric) quadratic form matrix.
    pub a: DMatrix<T>,
}

impl<T: Scalar> QuadraticForm<T> {
    /// Creates a quadratic landscape from a symmetric matrix.
    pub fn new(a: DMatrix<T>) -> Result<Self> {
        if a.nrows() != a.ncols() {
            return Err(SaddleError::dimension_mismatch(
                format!("square matrix, {} rows", a.nrows()),
                format!("{} columns", a.ncols()),
            ));
        }
        Ok(Self { a })
    }

    /// Creates a diagonal quadratic landscape from its spectrum.
    pub fn diagonal(spectrum: &DVector<T>) -> Self {
        Self {
            a: DMatrix::from_diagonal(spectrum),
        }
    }
}

impl<T: Scalar> EnergyLandscape<T> for QuadraticForm<T> {
    fn energy(&self, x: &DVector<T>) -> Result<T> {
        Ok(x.dot(&(&self.a * x)) * <T as Scalar>::from_f64(0.5))
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        Ok(&self.a * x)
    }
}

/// Wrapper counting oracle evaluations, for tests of evaluation accounting.
#[derive(Debug)]
pub struct CountingLandscape<'a, T: Scalar, L: EnergyLandscape<T>> {
    inner: &'a L,
    num_energy: Cell<usize>,
    num_gradient: Cell<usize>,
    _phantom: PhantomData<T>,
}

impl<'a, T: Scalar, L: EnergyLandscape<T>> CountingLandscape<'a, T, L> {
    /// Wraps a landscape with zeroed counters.
    pub fn new(inner: &'a L) -> Self {
        Self {
            inner,
            num_energy: Cell::new(0),
            num_gradient: Cell::new(0),
            _phantom: PhantomData,
        }
    }

    /// Number of energy evaluations performed through this wrapper.
    pub fn num_energy(&self) -> usize {
        self.num_energy.get()
    }

    /// Number of gradient evaluations performed through this wrapper.
    pub fn num_gradient(&self) -> usize {
        self.num_gradient.get()
    }
}

impl<T: Scalar, L: EnergyLandscape<T>> EnergyLandscape<T> for CountingLandscape<'_, T, L> {
    fn energy(&self, x: &DVector<T>) -> Result<T> {
        self.num_energy.set(self.num_energy.get() + 1);
        self.inner.energy(x)
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        self.num_gradient.set(self.num_gradient.get() + 1);
        self.inner.gradient(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quadratic_saddle_values() {
        let saddle = QuadraticForm::diagonal(&DVector::from_vec(vec![1.0, -1.0]));
        let x = DVector::from_vec(vec![2.0, 3.0]);

        // E = (4 - 9) / 2
        assert_relative_eq!(saddle.energy(&x).unwrap(), -2.5, epsilon = 1e-14);

        let g = saddle.gradient(&x).unwrap();
        assert_relative_eq!(g[0], 2.0, epsilon = 1e-14);
        assert_relative_eq!(g[1], -3.0, epsilon = 1e-14);
    }

    #[test]
    fn test_quadratic_form_rejects_rectangular() {
        let a = DMatrix::<f64>::zeros(2, 3);
        assert!(QuadraticForm::new(a).is_err());
    }

    #[test]
    fn test_fn_landscape() {
        let landscape = FnLandscape::new(
            |x: &DVector<f64>| x.norm_squared(),
            |x: &DVector<f64>| x * 2.0,
        );
        let x = DVector::from_vec(vec![1.0, 2.0]);
        assert_relative_eq!(landscape.energy(&x).unwrap(), 5.0);
        assert_relative_eq!(landscape.gradient(&x).unwrap()[1], 4.0);
    }

    #[test]
    fn test_counting_wrapper() {
        let saddle = QuadraticForm::diagonal(&DVector::from_vec(vec![1.0, -1.0]));
        let counting = CountingLandscape::new(&saddle);
        let x = DVector::from_vec(vec![1.0, 1.0]);

        let _ = counting.energy(&x).unwrap();
        let _ = counting.gradient(&x).unwrap();
        let _ = counting.gradient(&x).unwrap();

        assert_eq!(counting.num_energy(), 1);
        assert_eq!(counting.num_gradient(), 2);
    }

    #[test]
    fn test_gradient_flow_residual() {
        let bowl = QuadraticForm::diagonal(&DVector::from_vec(vec![1.0, 1.0]));
        let flow = GradientFlow::new(&bowl);
        let x = DVector::from_vec(vec![3.0, -4.0]);

        let (rate, residual) = flow.rate(0.0, &x, 0).unwrap();
        assert_relative_eq!(rate[0], -3.0);
        assert_relative_eq!(rate[1], 4.0);
        assert_relative_eq!(residual, 4.0);
    }
}
