//! Heston Stochastic Volatility Model
//!
//! The Heston model assumes variance follows a mean-reverting square-root
//! process correlated with the underlying's returns:
//!
//! dS = (r - q) * S * dt + √v * S * dW_S
//! dv = κ(θ - v) * dt + σ * √v * dW_v
//!
//! Pricing goes through the closed-form characteristic function of the
//! log-price, recovered by adaptive numerical integration of a single
//! Fourier integral. Greeks are central finite differences. Every function
//! here is pure: parameters are immutable snapshots passed by argument, so
//! concurrent pricing calls never race on shared state.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::core::{Greeks, ModelError, ModelResult, OptionContract, OptionType};
use crate::math::adaptive_simpson;

/// Truncation bound of the Fourier integral
pub const U_MAX: f64 = 100.0;
/// Absolute error tolerance of the adaptive quadrature
pub const INTEGRATION_TOL: f64 = 1e-6;
/// Cap on quadrature interval subdivisions
pub const MAX_SUBDIVISIONS: usize = 1000;
/// Default finite-difference step for the Greeks
pub const FD_STEP: f64 = 1e-6;

/// Heston model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HestonParams {
    /// Initial variance (v0)
    pub v0: f64,
    /// Long-run variance (θ)
    pub theta: f64,
    /// Mean reversion speed (κ)
    pub kappa: f64,
    /// Correlation between spot and variance (ρ)
    pub rho: f64,
    /// Volatility of volatility (σ)
    pub sigma: f64,
}

impl HestonParams {
    pub fn new(v0: f64, theta: f64, kappa: f64, rho: f64, sigma: f64) -> Self {
        Self {
            v0,
            theta,
            kappa,
            rho,
            sigma,
        }
    }

    /// Validate parameter admissibility
    pub fn validate(&self) -> ModelResult<()> {
        if self.v0 <= 0.0 {
            return Err(ModelError::invalid_input("v0 must be positive"));
        }
        if self.theta <= 0.0 {
            return Err(ModelError::invalid_input("theta must be positive"));
        }
        if self.kappa <= 0.0 {
            return Err(ModelError::invalid_input("kappa must be positive"));
        }
        if self.rho <= -1.0 || self.rho >= 1.0 {
            return Err(ModelError::invalid_input("rho must be in (-1, 1)"));
        }
        if self.sigma <= 0.0 {
            return Err(ModelError::invalid_input("sigma must be positive"));
        }
        Ok(())
    }

    /// Feller condition: 2κθ > σ² keeps the variance process away from zero
    pub fn feller_condition(&self) -> bool {
        2.0 * self.kappa * self.theta > self.sigma * self.sigma
    }

    /// Copy with the initial variance shifted by `h` (finite-difference vega)
    pub fn bump_v0(&self, h: f64) -> Self {
        Self {
            v0: self.v0 + h,
            ..*self
        }
    }

    /// Parameter vector in calibration order [v0, theta, kappa, rho, sigma]
    pub fn to_array(&self) -> [f64; 5] {
        [self.v0, self.theta, self.kappa, self.rho, self.sigma]
    }

    /// Rebuild from the calibration order [v0, theta, kappa, rho, sigma]
    pub fn from_slice(x: &[f64]) -> ModelResult<Self> {
        if x.len() != 5 {
            return Err(ModelError::invalid_input(
                "Heston parameter vector must have length 5",
            ));
        }
        Ok(Self::new(x[0], x[1], x[2], x[3], x[4]))
    }
}

impl Default for HestonParams {
    /// Typical equity-index parameters: 20% vol levels, fast mean reversion,
    /// pronounced leverage effect
    fn default() -> Self {
        Self {
            v0: 0.04,
            theta: 0.04,
            kappa: 2.0,
            rho: -0.7,
            sigma: 0.3,
        }
    }
}

/// Heston characteristic function of ln S_T at the u = ½ moment convention
///
/// Uses the branch-stable formulation (Albrecher et al.'s "little Heston
/// trap"): the auxiliary root d is taken with Re(d) >= 0 and the exponent is
/// written with exp(-dT), which keeps |g| < 1 so the complex logarithm stays
/// on its principal branch for all maturities and parameter combinations.
pub fn characteristic_function(
    u: Complex64,
    contract: &OptionContract,
    params: &HestonParams,
) -> Complex64 {
    let i = Complex64::i();
    let t = contract.expiry;
    let a = params.kappa * params.theta;
    let sigma2 = params.sigma * params.sigma;

    // beta = κ - iρσu
    let beta = params.kappa - i * params.rho * params.sigma * u;

    // d = sqrt(beta² + σ²(u² + iu)), root chosen with Re(d) >= 0
    let mut d = (beta * beta + sigma2 * (u * u + i * u)).sqrt();
    if d.re < 0.0 {
        d = -d;
    }

    let g = (beta - d) / (beta + d);
    let exp_neg_dt = (-d * t).exp();
    let log_term = ((1.0 - g * exp_neg_dt) / (1.0 - g)).ln();

    // Drift of ln S_T plus the mean-reversion exponent
    let c = i * u * (contract.spot.ln() + (contract.rate - contract.div_yield) * t)
        + (a / sigma2) * ((beta - d) * t - 2.0 * log_term);
    let d_coef = ((beta - d) / sigma2) * ((1.0 - exp_neg_dt) / (1.0 - g * exp_neg_dt));

    (c + d_coef * params.v0).exp()
}

/// Real part of the Fourier pricing integrand
///
/// Defined as exactly 0.5 at u = 0 where the 1/(iu) factor is singular
/// (removable singularity).
pub fn integrand(u: f64, contract: &OptionContract, params: &HestonParams) -> f64 {
    if u == 0.0 {
        return 0.5;
    }

    let i = Complex64::i();
    let phi = characteristic_function(Complex64::new(u, 0.0), contract, params);
    ((-i * u * contract.strike.ln()).exp() * phi / (i * u)).re
}

/// European option price under Heston dynamics
///
/// Call = S·e^(-qT) - K·e^(-rT)·(½ + I/π) with I the truncated Fourier
/// integral; the put follows from put-call parity so the pair satisfies
/// parity exactly. At or past expiry both collapse to intrinsic value
/// without touching the integral.
pub fn price(contract: &OptionContract, params: &HestonParams, side: OptionType) -> f64 {
    if contract.is_expired() {
        return side.intrinsic(contract.spot, contract.strike);
    }

    let integral = adaptive_simpson(
        |u| integrand(u, contract, params),
        0.0,
        U_MAX,
        INTEGRATION_TOL,
        MAX_SUBDIVISIONS,
    );

    let disc_spot = contract.spot * contract.dividend_discount();
    let disc_strike = contract.strike * contract.discount();
    let call = disc_spot - disc_strike * (0.5 + integral / PI);

    match side {
        OptionType::Call => call,
        OptionType::Put => call - disc_spot + disc_strike,
    }
}

/// Finite-difference Greeks with the default step
pub fn greeks(contract: &OptionContract, params: &HestonParams, side: OptionType) -> Greeks {
    greeks_with_step(contract, params, side, FD_STEP)
}

/// Central finite-difference Greeks with step `h`
///
/// Vega bumps v0 through two distinct parameter snapshots rather than
/// mutating a shared field, so concurrent pricing stays reentrant. The step
/// trades truncation bias (large h) against round-off noise (small h).
pub fn greeks_with_step(
    contract: &OptionContract,
    params: &HestonParams,
    side: OptionType,
    h: f64,
) -> Greeks {
    let center = price(contract, params, side);

    let spot_up = price(&contract.bump_spot(h), params, side);
    let spot_down = price(&contract.bump_spot(-h), params, side);
    let delta = (spot_up - spot_down) / (2.0 * h);
    let gamma = (spot_up - 2.0 * center + spot_down) / (h * h);

    let v_up = price(contract, &params.bump_v0(h), side);
    let v_down = price(contract, &params.bump_v0(-h), side);
    let vega = (v_up - v_down) / (2.0 * h);

    let t_up = price(&contract.bump_expiry(h), params, side);
    let t_down = price(&contract.bump_expiry(-h), params, side);
    let theta = -(t_up - t_down) / (2.0 * h);

    let r_up = price(&contract.bump_rate(h), params, side);
    let r_down = price(&contract.bump_rate(-h), params, side);
    let rho = (r_up - r_down) / (2.0 * h);

    Greeks::new(delta, gamma, vega, theta, rho)
}
