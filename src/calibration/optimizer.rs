//! Box-constrained nonlinear least squares
//!
//! A damped Gauss-Newton (Levenberg-Marquardt) solver with a
//! finite-difference Jacobian and candidate steps clamped to a parameter
//! box. The trust region is implicit in the damping factor: rejected steps
//! raise it (shrinking the step), accepted steps lower it.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::core::{ModelError, ModelResult};

/// Inclusive box bounds on the parameter vector
#[derive(Debug, Clone)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> ModelResult<Self> {
        if lower.is_empty() || lower.len() != upper.len() {
            return Err(ModelError::invalid_input(
                "bounds must be non-empty and of equal length",
            ));
        }
        if lower.iter().zip(&upper).any(|(lo, hi)| lo >= hi) {
            return Err(ModelError::invalid_input(
                "each lower bound must be below its upper bound",
            ));
        }
        Ok(Self { lower, upper })
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    /// Project a point onto the box
    pub fn clamp(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .map(|(v, (lo, hi))| v.clamp(*lo, *hi))
            .collect()
    }
}

/// Solver configuration
#[derive(Debug, Clone, Copy)]
pub struct LeastSquaresOptions {
    /// Hard ceiling on residual-function evaluations
    pub max_evaluations: usize,
    /// Stop when an accepted step improves the objective by less than this
    pub objective_tolerance: f64,
    /// Stop when the clamped step norm falls below this
    pub step_tolerance: f64,
    /// Stop when the gradient norm falls below this
    pub gradient_tolerance: f64,
    /// Initial damping factor
    pub initial_damping: f64,
    /// Damping multiplier after a rejected step
    pub damping_up: f64,
    /// Damping multiplier after an accepted step
    pub damping_down: f64,
    /// Relative step for the finite-difference Jacobian
    pub jacobian_step: f64,
}

impl Default for LeastSquaresOptions {
    fn default() -> Self {
        Self {
            max_evaluations: 1000,
            objective_tolerance: 1e-8,
            step_tolerance: 1e-8,
            gradient_tolerance: 1e-8,
            initial_damping: 1e-3,
            damping_up: 4.0,
            damping_down: 0.25,
            jacobian_step: 1e-4,
        }
    }
}

/// Why the solver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    GradientTolerance,
    StepTolerance,
    ObjectiveTolerance,
    EvaluationBudget,
    NumericalFailure,
}

impl Termination {
    /// Tolerance-based stops count as convergence; budget exhaustion and
    /// numerical breakdown do not.
    pub fn converged(self) -> bool {
        matches!(
            self,
            Termination::GradientTolerance
                | Termination::StepTolerance
                | Termination::ObjectiveTolerance
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::GradientTolerance => "gradient below tolerance",
            Termination::StepTolerance => "step below tolerance",
            Termination::ObjectiveTolerance => "objective improvement below tolerance",
            Termination::EvaluationBudget => "evaluation budget exhausted",
            Termination::NumericalFailure => "numerical failure in trust-region step",
        };
        f.write_str(s)
    }
}

/// Solver output
#[derive(Debug, Clone)]
pub struct LeastSquaresSolution {
    pub x: Vec<f64>,
    pub residuals: Vec<f64>,
    pub objective: f64,
    pub evaluations: usize,
    pub termination: Termination,
}

impl LeastSquaresSolution {
    pub fn converged(&self) -> bool {
        self.termination.converged()
    }
}

#[inline]
fn half_sum_of_squares(residuals: &[f64]) -> f64 {
    0.5 * residuals.iter().map(|r| r * r).sum::<f64>()
}

/// Forward-difference Jacobian with bound-aware steps: a column whose bump
/// would leave the box is bumped in the opposite direction instead.
fn finite_difference_jacobian<F>(
    x: &[f64],
    base: &[f64],
    bounds: &Bounds,
    rel_step: f64,
    residual_fn: &mut F,
    evaluations: &mut usize,
) -> DMatrix<f64>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let m = base.len();
    let n = x.len();
    let mut jac = DMatrix::zeros(m, n);

    for c in 0..n {
        let mut bumped = x.to_vec();
        let h = (x[c].abs() * rel_step).max(1e-7);

        bumped[c] = (x[c] + h).min(bounds.upper[c]);
        if (bumped[c] - x[c]).abs() < 1e-14 {
            bumped[c] = (x[c] - h).max(bounds.lower[c]);
        }
        let denom = bumped[c] - x[c];
        if denom.abs() < 1e-14 {
            continue;
        }

        let shifted = residual_fn(&bumped);
        *evaluations += 1;
        for r in 0..m {
            jac[(r, c)] = (shifted[r] - base[r]) / denom;
        }
    }

    jac
}

/// Minimize ½‖residual_fn(x)‖² subject to the box bounds.
///
/// Stops on any of the configured tolerances or when the evaluation budget
/// runs out; the best point found so far is always returned.
pub fn levenberg_marquardt<F>(
    initial: &[f64],
    bounds: &Bounds,
    options: &LeastSquaresOptions,
    mut residual_fn: F,
) -> ModelResult<LeastSquaresSolution>
where
    F: FnMut(&[f64]) -> Vec<f64>,
{
    let n = bounds.dim();
    if initial.len() != n {
        return Err(ModelError::optimization(
            "initial vector dimension does not match bounds",
        ));
    }

    let mut x = bounds.clamp(initial);
    let mut evaluations = 0usize;
    let mut residuals = residual_fn(&x);
    evaluations += 1;
    if residuals.is_empty() {
        return Err(ModelError::optimization("empty residual vector"));
    }

    let mut objective = half_sum_of_squares(&residuals);
    if !objective.is_finite() {
        return Err(ModelError::optimization(
            "objective not finite at the initial point",
        ));
    }

    let mut damping = options.initial_damping.max(1e-12);
    let mut termination = Termination::EvaluationBudget;

    // Each iteration spends n evaluations on the Jacobian plus one on the
    // candidate; stop before overrunning the budget.
    while evaluations + n + 1 <= options.max_evaluations {
        let jac = finite_difference_jacobian(
            &x,
            &residuals,
            bounds,
            options.jacobian_step,
            &mut residual_fn,
            &mut evaluations,
        );

        let r_vec = DVector::from_column_slice(&residuals);
        let jt = jac.transpose();
        let mut normal = &jt * &jac;
        let gradient = &jt * r_vec;

        let gradient_norm = gradient.norm();
        if !gradient_norm.is_finite() {
            termination = Termination::NumericalFailure;
            break;
        }
        if gradient_norm <= options.gradient_tolerance {
            termination = Termination::GradientTolerance;
            break;
        }

        for i in 0..n {
            normal[(i, i)] += damping * (normal[(i, i)].abs() + 1.0);
        }

        let Some(step) = normal.lu().solve(&(-&gradient)) else {
            damping *= options.damping_up;
            if damping > 1e12 {
                termination = Termination::NumericalFailure;
                break;
            }
            continue;
        };

        let mut candidate = x.clone();
        for i in 0..n {
            candidate[i] += step[i];
        }
        candidate = bounds.clamp(&candidate);

        let step_norm = candidate
            .iter()
            .zip(&x)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt();
        if step_norm <= options.step_tolerance {
            termination = Termination::StepTolerance;
            break;
        }

        let candidate_residuals = residual_fn(&candidate);
        evaluations += 1;
        let candidate_objective = half_sum_of_squares(&candidate_residuals);

        if candidate_objective.is_finite() && candidate_objective < objective {
            let improvement = objective - candidate_objective;
            x = candidate;
            residuals = candidate_residuals;
            objective = candidate_objective;
            damping = (damping * options.damping_down).max(1e-12);
            tracing::debug!(objective, damping, step_norm, "accepted step");

            if improvement <= options.objective_tolerance * objective.max(1.0) {
                termination = Termination::ObjectiveTolerance;
                break;
            }
        } else {
            damping *= options.damping_up;
            if damping > 1e12 {
                termination = Termination::NumericalFailure;
                break;
            }
        }
    }

    Ok(LeastSquaresSolution {
        x,
        residuals,
        objective,
        evaluations,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_bounds_validation() {
        assert!(Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).is_ok());
        assert!(Bounds::new(vec![0.0], vec![1.0, 1.0]).is_err());
        assert!(Bounds::new(vec![1.0], vec![1.0]).is_err());
        assert!(Bounds::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_clamp() {
        let b = Bounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
        assert_eq!(b.clamp(&[2.0, -3.0]), vec![1.0, -1.0]);
        assert_eq!(b.clamp(&[0.5, 0.5]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_linear_residuals() {
        let bounds = Bounds::new(vec![-5.0, -5.0], vec![5.0, 5.0]).unwrap();
        let solution = levenberg_marquardt(
            &[4.0, -4.0],
            &bounds,
            &LeastSquaresOptions::default(),
            |x| vec![x[0] - 1.5, x[1] + 2.0],
        )
        .unwrap();

        assert!(solution.converged());
        assert_abs_diff_eq!(solution.x[0], 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.x[1], -2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rosenbrock_valley() {
        let bounds = Bounds::new(vec![-2.0, -2.0], vec![2.0, 2.0]).unwrap();
        let solution = levenberg_marquardt(
            &[-1.2, 1.0],
            &bounds,
            &LeastSquaresOptions::default(),
            |x| vec![10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]],
        )
        .unwrap();

        assert!(solution.converged());
        assert_abs_diff_eq!(solution.x[0], 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(solution.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_solution_respects_bounds() {
        // Unconstrained optimum at 3.0 sits outside the box.
        let bounds = Bounds::new(vec![0.0], vec![2.0]).unwrap();
        let solution = levenberg_marquardt(
            &[1.0],
            &bounds,
            &LeastSquaresOptions::default(),
            |x| vec![x[0] - 3.0],
        )
        .unwrap();

        assert!(solution.x[0] <= 2.0 + 1e-12);
        assert_abs_diff_eq!(solution.x[0], 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_residuals_at_start() {
        let bounds = Bounds::new(vec![-1.0], vec![1.0]).unwrap();
        let solution = levenberg_marquardt(
            &[0.25],
            &bounds,
            &LeastSquaresOptions::default(),
            |x| vec![x[0] - 0.25],
        )
        .unwrap();

        assert!(solution.converged());
        assert_eq!(solution.termination, Termination::GradientTolerance);
        assert_abs_diff_eq!(solution.x[0], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
        let result = levenberg_marquardt(
            &[0.5],
            &bounds,
            &LeastSquaresOptions::default(),
            |x| x.to_vec(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_evaluation_budget_is_honored() {
        let bounds = Bounds::new(vec![-5.0], vec![5.0]).unwrap();
        let options = LeastSquaresOptions {
            max_evaluations: 7,
            // Impossible tolerances so only the budget can stop it
            objective_tolerance: 0.0,
            step_tolerance: 0.0,
            gradient_tolerance: 0.0,
            ..LeastSquaresOptions::default()
        };
        let solution =
            levenberg_marquardt(&[4.0], &bounds, &options, |x| vec![(x[0] - 1.0).powi(3)])
                .unwrap();
        assert!(solution.evaluations <= 7);
        assert_eq!(solution.termination, Termination::EvaluationBudget);
    }
}
