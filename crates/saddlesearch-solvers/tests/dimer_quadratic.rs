//! Integration tests for the BB dimer on quadratic and smooth landscapes.

use approx::assert_relative_eq;
use pretty_assertions::assert_eq;
use saddlesearch_core::prelude::*;
use saddlesearch_solvers::{BBDimer, BBDimerConfig};

/// E(x) = (x1^2 - x2^2) / 2: index-1 saddle at the origin.
fn plane_saddle() -> QuadraticForm<f64> {
    QuadraticForm::diagonal(&DVector::from_vec(vec![1.0, -1.0]))
}

#[test]
fn converges_to_plane_saddle_from_unit_start() {
    let saddle = plane_saddle();
    let mut dimer = BBDimer::unpreconditioned(BBDimerConfig::default()).unwrap();

    let x0 = DVector::from_vec(vec![1.0, 1.0]);
    let v0 = DVector::from_vec(vec![0.0, 1.0]);
    let result = dimer.run(&saddle, &x0, &v0).unwrap();

    assert!(result.converged);
    assert!(infinity_norm(&result.x) < dimer.config().tol_trans);
    assert_eq!(result.log.len(), result.iterations);
    assert!(result.iterations < 50);
}

#[test]
fn gradient_count_grows_by_two_per_iteration() {
    let saddle = plane_saddle();
    let mut dimer = BBDimer::unpreconditioned(BBDimerConfig::default()).unwrap();

    let x0 = DVector::from_vec(vec![0.8, 1.2]);
    let v0 = DVector::from_vec(vec![0.3, 1.0]);
    let result = dimer.run(&saddle, &x0, &v0).unwrap();

    let counts = result.log.num_gradient();
    for (i, &count) in counts.iter().enumerate() {
        assert_eq!(count, 2 * (i + 1));
    }
    for pair in counts.windows(2) {
        assert!(pair[1] > pair[0]);
    }
}

#[test]
fn success_flag_matches_independently_recomputed_residuals() {
    let saddle = plane_saddle();
    let config = BBDimerConfig::default();
    let tol_trans = config.tol_trans;
    let tol_rot = config.tol_rot;
    let length = config.dimer_length;
    let mut dimer = BBDimer::unpreconditioned(config).unwrap();

    let x0 = DVector::from_vec(vec![0.6, 0.9]);
    let v0 = DVector::from_vec(vec![0.2, 1.0]);
    let result = dimer.run(&saddle, &x0, &v0).unwrap();

    // Recompute both residuals from the returned state with the same
    // finite-difference construction, bypassing the internal log.
    let v: DVector<f64> = &result.v / result.v.norm();
    let g_plus = saddle.gradient(&(&result.x + &v * (length / 2.0))).unwrap();
    let g_minus = saddle.gradient(&(&result.x - &v * (length / 2.0))).unwrap();
    let hv = (&g_plus - &g_minus) / length;
    let de0 = (&g_plus + &g_minus) * 0.5;
    let lambda = v.dot(&hv);
    let q_rot = &v * lambda - &hv;

    let res_trans = infinity_norm(&de0);
    let res_rot = infinity_norm(&q_rot);
    assert_eq!(
        result.converged,
        res_trans <= tol_trans && res_rot <= tol_rot
    );
    assert!(result.converged);
}

#[test]
fn degenerate_secant_never_corrupts_the_state() {
    // A constant gradient has no critical point and stops changing the
    // search directions, so the BB secants degenerate from the second
    // iteration on. The run must exhaust its budget with a finite state and
    // an intact log; no NaN may leak into the position.
    let tilted = FnLandscape::new(
        |x: &DVector<f64>| x[0] + x[1],
        |_x: &DVector<f64>| DVector::from_vec(vec![1.0, 1.0]),
    );
    let config = BBDimerConfig::default().with_max_gradient_evals(50);
    let mut dimer = BBDimer::unpreconditioned(config).unwrap();

    let x0 = DVector::from_vec(vec![0.0, 0.0]);
    let v0 = DVector::from_vec(vec![1.0, 0.0]);
    let result = dimer.run(&tilted, &x0, &v0).unwrap();

    assert!(!result.converged);
    assert_eq!(result.termination, TerminationReason::BudgetExhausted);
    assert!(result.x.iter().all(|c| c.is_finite()));
    assert!(result.v.iter().all(|c| c.is_finite()));
    assert!(!result.log.is_empty());
}

#[test]
fn failing_energy_oracle_surfaces_as_line_search_failure() {
    // The gradient is fine but every energy evaluation fails, so an
    // adaptive line search can never accept a step: the run stops softly
    // with the state gathered so far.
    #[derive(Debug)]
    struct GradientOnly;
    impl EnergyLandscape<f64> for GradientOnly {
        fn energy(&self, _x: &DVector<f64>) -> Result<f64> {
            Err(SaddleError::oracle_failure("energy unavailable"))
        }
        fn gradient(&self, x: &DVector<f64>) -> Result<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0], -x[1]]))
        }
    }

    let line_search = ArmijoBacktracking::new(LineSearchParams::default()).unwrap();
    let mut dimer = BBDimer::new(BBDimerConfig::default(), IdentityPrecon, line_search).unwrap();

    let x0 = DVector::from_vec(vec![1.0, 1.0]);
    let v0 = DVector::from_vec(vec![0.3, 1.0]);
    let result = dimer.run(&GradientOnly, &x0, &v0).unwrap();

    assert!(!result.converged);
    assert_eq!(result.termination, TerminationReason::LineSearchFailed);
    assert_eq!(result.iterations, 1);
}

#[test]
fn reruns_are_bit_for_bit_identical() {
    let run = || {
        let saddle = plane_saddle();
        let mut dimer = BBDimer::unpreconditioned(BBDimerConfig::default()).unwrap();
        let x0 = DVector::from_vec(vec![0.7, 1.1]);
        let v0 = DVector::from_vec(vec![0.4, 1.0]);
        dimer.run(&saddle, &x0, &v0).unwrap()
    };

    let a = run();
    let b = run();

    assert_eq!(a.x, b.x);
    assert_eq!(a.v, b.v);
    assert_eq!(a.log, b.log);
    assert_eq!(a.termination, b.termination);
    assert_eq!(a.energy_evaluations, b.energy_evaluations);
    assert_eq!(a.gradient_evaluations, b.gradient_evaluations);
}

#[test]
fn converges_on_anisotropic_four_dimensional_saddle() {
    let saddle = QuadraticForm::diagonal(&DVector::from_vec(vec![2.0, 1.0, 0.5, -1.0]));
    let config = BBDimerConfig::default().with_max_gradient_evals(4000);
    let mut dimer = BBDimer::unpreconditioned(config).unwrap();

    let x0 = DVector::from_vec(vec![0.2, -0.3, 0.4, 0.5]);
    let v0 = DVector::from_vec(vec![0.1, 0.1, 0.1, 1.0]);
    let result = dimer.run(&saddle, &x0, &v0).unwrap();

    assert!(result.converged);
    assert!(infinity_norm(&result.x) < 1e-4);
    // The direction must align with the unique negative mode.
    let v: DVector<f64> = &result.v / result.v.norm();
    assert!(v[3].abs() > 0.99);
}

#[test]
fn armijo_line_search_converges_and_accounts_energy() {
    let saddle = plane_saddle();
    let line_search = ArmijoBacktracking::new(LineSearchParams::default()).unwrap();
    let mut dimer = BBDimer::new(BBDimerConfig::default(), IdentityPrecon, line_search).unwrap();

    let x0 = DVector::from_vec(vec![1.0, 1.0]);
    let v0 = DVector::from_vec(vec![0.2, 1.0]);
    let result = dimer.run(&saddle, &x0, &v0).unwrap();

    assert!(result.converged);
    assert!(result.energy_evaluations > 0);
    // The log's energy column is the cumulative count at each iteration.
    let energies = result.log.num_energy();
    for pair in energies.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
    assert!(*energies.last().unwrap() <= result.energy_evaluations);
}

#[test]
fn observer_receives_one_record_per_iteration() {
    let saddle = plane_saddle();
    let mut dimer = BBDimer::unpreconditioned(BBDimerConfig::default()).unwrap();
    let mut observer = RecordingObserver::new();

    let x0 = DVector::from_vec(vec![0.9, 0.8]);
    let v0 = DVector::from_vec(vec![0.1, 1.0]);
    let result = dimer
        .run_with_observer(&saddle, &x0, &v0, &mut observer)
        .unwrap();

    assert_eq!(observer.records.len(), result.iterations);
    assert_eq!(observer.finished, Some(result.termination));
    for (record, &logged) in observer.records.iter().zip(result.log.num_gradient()) {
        assert_eq!(record.num_gradient, logged);
        assert!(record.accepted);
    }
}

#[test]
fn converges_on_smooth_nonquadratic_saddle() {
    // E = cos(x1) + x2^2 / 2 has an index-1 saddle at the origin.
    let landscape = FnLandscape::new(
        |x: &DVector<f64>| x[0].cos() + 0.5 * x[1] * x[1],
        |x: &DVector<f64>| DVector::from_vec(vec![-x[0].sin(), x[1]]),
    );
    let config = BBDimerConfig::default().with_max_gradient_evals(4000);
    let mut dimer = BBDimer::unpreconditioned(config).unwrap();

    let x0 = DVector::from_vec(vec![0.4, 0.3]);
    let v0 = DVector::from_vec(vec![1.0, 0.1]);
    let result = dimer.run(&landscape, &x0, &v0).unwrap();

    assert!(result.converged);
    assert_relative_eq!(result.x[0], 0.0, epsilon = 1e-4);
    assert_relative_eq!(result.x[1], 0.0, epsilon = 1e-4);
}
