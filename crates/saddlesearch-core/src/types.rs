//! Type definitions and aliases for saddle-point search.
//!
//! This module provides the scalar abstraction, vector aliases, and the
//! numerical constants used throughout the library.

use nalgebra::{Dyn, OMatrix, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in saddle-point search (f32 or f64).
///
/// This trait combines all the necessary numeric traits required by the
/// dimer iteration and the adaptive ODE integrators.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance on the translation (force) residual.
    const DEFAULT_FORCE_TOLERANCE: Self;

    /// Default tolerance on the rotation (curvature) residual.
    const DEFAULT_CURVATURE_TOLERANCE: Self;

    /// Default finite-difference dimer length.
    const DEFAULT_DIMER_LENGTH: Self;

    /// Minimum value for line search step size.
    const MIN_STEP_SIZE: Self;

    /// Maximum value for line search step size.
    const MAX_STEP_SIZE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert to f64 (for logging/display).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn to_f64(self) -> f64 {
        num_traits::cast(self).expect("Failed to convert to f64")
    }

    /// Convert from usize (for iteration counts).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_FORCE_TOLERANCE: Self = 1e-3;
    const DEFAULT_CURVATURE_TOLERANCE: Self = 1e-1;
    const DEFAULT_DIMER_LENGTH: Self = 1e-3;
    const MIN_STEP_SIZE: Self = 1e-10;
    const MAX_STEP_SIZE: Self = 1e3;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_FORCE_TOLERANCE: Self = 1e-5;
    const DEFAULT_CURVATURE_TOLERANCE: Self = 1e-2;
    const DEFAULT_DIMER_LENGTH: Self = 1e-3;
    const MIN_STEP_SIZE: Self = 1e-16;
    const MAX_STEP_SIZE: Self = 1e6;
}

/// Type alias for a dynamically-sized vector.
pub type DVector<T> = OVector<T, Dyn>;

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// Infinity norm of a vector, the residual measure used throughout.
pub fn infinity_norm<T: Scalar>(v: &DVector<T>) -> T {
    v.iter()
        .fold(T::zero(), |acc, &c| {
            <T as Float>::max(acc, <T as Float>::abs(c))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_trait_f32() {
        assert_eq!(f32::EPSILON, std::f32::EPSILON);
        assert!(f32::DEFAULT_FORCE_TOLERANCE > 0.0);
        assert!(f32::DEFAULT_CURVATURE_TOLERANCE > f32::DEFAULT_FORCE_TOLERANCE);
        assert!(f32::MIN_STEP_SIZE < f32::MAX_STEP_SIZE);
    }

    #[test]
    fn test_scalar_trait_f64() {
        assert_eq!(f64::EPSILON, std::f64::EPSILON);
        assert!(f64::DEFAULT_FORCE_TOLERANCE > 0.0);
        assert!(f64::DEFAULT_CURVATURE_TOLERANCE > f64::DEFAULT_FORCE_TOLERANCE);
        assert!(f64::MIN_STEP_SIZE < f64::MAX_STEP_SIZE);
    }

    #[test]
    fn test_scalar_conversions() {
        let val_f64 = 3.14159;
        let val_f32 = <f32 as Scalar>::from_f64(val_f64);
        assert_relative_eq!(val_f32 as f64, val_f64, epsilon = 1e-6);

        let back_f64 = Scalar::to_f64(val_f32);
        assert_relative_eq!(back_f64, val_f32 as f64);
    }

    #[test]
    fn test_vector_type_aliases() {
        let _dv: DVector<f64> = DVector::zeros(10);
        let _dm: DMatrix<f64> = DMatrix::identity(3, 3);
    }

    #[test]
    fn test_infinity_norm() {
        let v = DVector::from_vec(vec![1.0, -3.0, 2.0]);
        assert_relative_eq!(infinity_norm(&v), 3.0);
        assert_relative_eq!(infinity_norm(&DVector::<f64>::zeros(4)), 0.0);
    }
}
