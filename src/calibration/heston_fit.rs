//! Heston calibration to market quotes
//!
//! Fits {v0, theta, kappa, rho, sigma} by nonlinear least squares on the
//! relative price errors of a quote basket. A candidate outside its box, or
//! a quote whose pricing fails numerically, contributes a large penalty
//! residual instead of aborting the fit: bound violations become a steep
//! wall the optimizer backs away from, and a single bad quote cannot crash
//! the whole batch.

use rayon::prelude::*;
use serde::Serialize;

use super::optimizer::{levenberg_marquardt, Bounds, LeastSquaresOptions};
use crate::core::{ModelError, ModelResult, Quote};
use crate::models::heston::{self, HestonParams};

/// Residual substituted for out-of-bounds proposals and failed quotes
const PENALTY_RESIDUAL: f64 = 1e6;

/// Optimizer box for [v0, theta, kappa, rho, sigma]
pub fn parameter_bounds() -> Bounds {
    Bounds::new(
        vec![1e-3, 1e-3, 0.1, -0.99, 0.01],
        vec![1.0, 1.0, 10.0, 0.99, 2.0],
    )
    .expect("static Heston bounds are valid")
}

/// Outcome of a calibration run
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationResult {
    /// Did the optimizer satisfy a convergence tolerance?
    pub converged: bool,
    /// Fitted parameters, present only on convergence
    pub params: Option<HestonParams>,
    /// Root-mean-square relative price error over the quote set
    pub rmse: f64,
    /// Maximum absolute relative price error over the quote set
    pub max_error: f64,
    /// Objective-function evaluations spent
    pub evaluations: usize,
    /// Failure description when not converged
    pub reason: Option<String>,
}

/// Admissible region for a proposal, strict at the open ends
fn proposal_in_bounds(x: &[f64]) -> bool {
    let (v0, theta, kappa, rho, sigma) = (x[0], x[1], x[2], x[3], x[4]);
    v0 > 0.0
        && v0 <= 1.0
        && theta > 0.0
        && theta <= 1.0
        && kappa > 0.0
        && kappa <= 10.0
        && rho.abs() < 0.99
        && sigma > 0.0
        && sigma <= 2.0
}

/// Relative price errors of a candidate parameter vector over the basket.
///
/// The quotes are independent, so the basket is priced in parallel.
pub fn residuals(x: &[f64], quotes: &[Quote]) -> Vec<f64> {
    if !proposal_in_bounds(x) {
        return vec![PENALTY_RESIDUAL; quotes.len()];
    }
    let params = match HestonParams::from_slice(x) {
        Ok(p) => p,
        Err(_) => return vec![PENALTY_RESIDUAL; quotes.len()],
    };

    quotes
        .par_iter()
        .map(|quote| {
            let model = heston::price(&quote.contract, &params, quote.option_type);
            if model.is_finite() && quote.price != 0.0 {
                (model - quote.price) / quote.price
            } else {
                PENALTY_RESIDUAL
            }
        })
        .collect()
}

/// Calibrate the Heston model to a set of market quotes.
///
/// An empty quote set is rejected immediately; optimizer non-convergence is
/// reported as a value (`converged == false` with a reason), never a panic.
pub fn calibrate(quotes: &[Quote], initial_guess: &HestonParams) -> ModelResult<CalibrationResult> {
    if quotes.is_empty() {
        return Err(ModelError::EmptyCalibrationInput);
    }

    let bounds = parameter_bounds();
    let options = LeastSquaresOptions::default();
    let solution = levenberg_marquardt(
        &initial_guess.to_array(),
        &bounds,
        &options,
        |x| residuals(x, quotes),
    )?;

    // Fit statistics re-evaluated at the returned point
    let final_residuals = residuals(&solution.x, quotes);
    let rmse = (final_residuals.iter().map(|r| r * r).sum::<f64>()
        / final_residuals.len() as f64)
        .sqrt();
    let max_error = final_residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));

    if solution.converged() {
        let params = HestonParams::from_slice(&solution.x)?;
        tracing::info!(
            rmse,
            max_error,
            evaluations = solution.evaluations,
            "heston calibration converged"
        );
        Ok(CalibrationResult {
            converged: true,
            params: Some(params),
            rmse,
            max_error,
            evaluations: solution.evaluations,
            reason: None,
        })
    } else {
        tracing::warn!(reason = %solution.termination, "heston calibration failed");
        Ok(CalibrationResult {
            converged: false,
            params: None,
            rmse,
            max_error,
            evaluations: solution.evaluations,
            reason: Some(solution.termination.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OptionContract, OptionType};

    const STRIKES: [f64; 5] = [90.0, 95.0, 100.0, 105.0, 110.0];

    fn synthetic_quotes(truth: &HestonParams) -> Vec<Quote> {
        STRIKES
            .iter()
            .map(|&strike| {
                let contract = OptionContract::new(100.0, strike, 1.0, 0.05, 0.0);
                let price = heston::price(&contract, truth, OptionType::Call);
                Quote::new(contract, OptionType::Call, price)
            })
            .collect()
    }

    #[test]
    fn test_empty_input_rejected() {
        let err = calibrate(&[], &HestonParams::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyCalibrationInput));
    }

    #[test]
    fn test_round_trip_recovers_parameters() {
        let truth = HestonParams::default();
        let quotes = synthetic_quotes(&truth);

        let result = calibrate(&quotes, &truth).unwrap();
        assert!(result.converged, "reason: {:?}", result.reason);

        let fitted = result.params.unwrap();
        assert!((fitted.v0 - truth.v0).abs() < 0.1);
        assert!((fitted.theta - truth.theta).abs() < 0.1);
        assert!((fitted.kappa - truth.kappa).abs() < 0.1);
        assert!((fitted.rho - truth.rho).abs() < 0.1);
        assert!((fitted.sigma - truth.sigma).abs() < 0.1);
        assert!(result.rmse < 1e-3);
    }

    #[test]
    fn test_round_trip_with_noise() {
        let truth = HestonParams::default();
        // Fixed multiplicative perturbations at the 1% level
        let noise = [0.004, -0.008, 0.002, 0.009, -0.005];

        let quotes: Vec<Quote> = synthetic_quotes(&truth)
            .into_iter()
            .zip(noise)
            .map(|(q, eps)| Quote::new(q.contract, q.option_type, q.price * (1.0 + eps)))
            .collect();

        let result = calibrate(&quotes, &truth).unwrap();
        assert!(result.converged, "reason: {:?}", result.reason);

        let fitted = result.params.unwrap();
        for (fit, exact) in fitted.to_array().iter().zip(truth.to_array()) {
            assert!(
                (fit - exact).abs() <= 0.5 * exact.abs(),
                "parameter {fit} drifted beyond 50% of {exact}"
            );
        }
    }

    #[test]
    fn test_recovery_from_perturbed_start() {
        let truth = HestonParams::default();
        let quotes = synthetic_quotes(&truth);
        let start = HestonParams::new(0.06, 0.06, 1.5, -0.5, 0.4);

        let result = calibrate(&quotes, &start).unwrap();
        assert!(result.converged, "reason: {:?}", result.reason);
        assert!(result.rmse < 0.05);
        assert!(result.evaluations <= 1000);
    }

    #[test]
    fn test_fitted_parameters_stay_in_bounds() {
        let truth = HestonParams::default();
        let quotes = synthetic_quotes(&truth);
        let fitted = calibrate(&quotes, &truth).unwrap().params.unwrap();

        assert!(fitted.v0 > 0.0 && fitted.v0 <= 1.0);
        assert!(fitted.theta > 0.0 && fitted.theta <= 1.0);
        assert!(fitted.kappa > 0.0 && fitted.kappa <= 10.0);
        assert!(fitted.rho > -1.0 && fitted.rho < 1.0);
        assert!(fitted.sigma > 0.0 && fitted.sigma <= 2.0);
    }

    #[test]
    fn test_out_of_bounds_proposal_is_penalized() {
        let quotes = synthetic_quotes(&HestonParams::default());
        let r = residuals(&[2.0, 0.04, 2.0, -0.7, 0.3], &quotes);
        assert!(r.iter().all(|&e| e == PENALTY_RESIDUAL));

        let r = residuals(&[0.04, 0.04, 2.0, 0.995, 0.3], &quotes);
        assert!(r.iter().all(|&e| e == PENALTY_RESIDUAL));
    }

    #[test]
    fn test_bad_quote_is_isolated() {
        let truth = HestonParams::default();
        let mut quotes = synthetic_quotes(&truth);
        // Zero market price cannot form a relative error
        quotes[2].price = 0.0;

        let r = residuals(&truth.to_array(), &quotes);
        assert_eq!(r[2], PENALTY_RESIDUAL);
        assert!(r[0].abs() < 1e-3);
        assert!(r[4].abs() < 1e-3);
    }
}
