//! Black-Scholes-Merton model
//!
//! Closed-form European option pricing with dividend yield, the analytic
//! Greeks, and a Newton-Raphson implied volatility solver.
//!
//! All functions are pure: they take the contract and volatility by value
//! and hold no state, so they can run on any thread without synchronization.

use std::f64::consts::PI;

use statrs::distribution::{ContinuousCDF, Normal};

use crate::core::{Greeks, ModelError, ModelResult, OptionContract, OptionType, Quote};

/// Convergence tolerance for the implied volatility solver (price units)
pub const IV_TOLERANCE: f64 = 1e-5;
/// Iteration budget for the implied volatility solver
pub const IV_MAX_ITERATIONS: usize = 100;

/// Below this vega the Newton update is undefined (stationary point)
const MIN_VEGA: f64 = 1e-10;
/// Floor keeping the volatility iterate strictly positive
const MIN_SIGMA: f64 = 1e-6;

/// Standard normal CDF
pub fn norm_cdf(x: f64) -> f64 {
    let normal = Normal::new(0.0, 1.0).unwrap();
    normal.cdf(x)
}

/// Standard normal PDF
pub fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Black-Scholes d1 and d2 parameters
///
/// Only meaningful for `expiry > 0` and `sigma > 0`; the pricing functions
/// branch to intrinsic value before calling this.
fn d1_d2(contract: &OptionContract, sigma: f64) -> (f64, f64) {
    let t = contract.expiry;
    let sqrt_t = t.sqrt();
    let d1 = ((contract.spot / contract.strike).ln()
        + (contract.rate - contract.div_yield + 0.5 * sigma * sigma) * t)
        / (sigma * sqrt_t);
    (d1, d1 - sigma * sqrt_t)
}

/// European option price
///
/// At or past expiry the volatility has no effect and the price collapses
/// to intrinsic value. At zero volatility the price is the discounted
/// forward intrinsic value (no time value).
pub fn price(contract: &OptionContract, sigma: f64, side: OptionType) -> f64 {
    if contract.is_expired() {
        return side.intrinsic(contract.spot, contract.strike);
    }
    if sigma <= 0.0 {
        return contract.discount() * side.intrinsic(contract.forward(), contract.strike);
    }

    let (d1, d2) = d1_d2(contract, sigma);
    let disc_spot = contract.spot * contract.dividend_discount();
    let disc_strike = contract.strike * contract.discount();

    match side {
        OptionType::Call => disc_spot * norm_cdf(d1) - disc_strike * norm_cdf(d2),
        OptionType::Put => disc_strike * norm_cdf(-d2) - disc_spot * norm_cdf(-d1),
    }
}

/// Delta: dV/dS
///
/// The terminal limit is the discontinuous step payoff slope: 1 (call, ITM)
/// or -1 (put, ITM), 0 otherwise.
pub fn delta(contract: &OptionContract, sigma: f64, side: OptionType) -> f64 {
    if contract.is_expired() || sigma <= 0.0 {
        return match side {
            OptionType::Call => {
                if contract.spot > contract.strike {
                    1.0
                } else {
                    0.0
                }
            }
            OptionType::Put => {
                if contract.spot < contract.strike {
                    -1.0
                } else {
                    0.0
                }
            }
        };
    }

    let (d1, _) = d1_d2(contract, sigma);
    let q_disc = contract.dividend_discount();
    match side {
        OptionType::Call => q_disc * norm_cdf(d1),
        OptionType::Put => q_disc * (norm_cdf(d1) - 1.0),
    }
}

/// Gamma: d²V/dS², identical for calls and puts
pub fn gamma(contract: &OptionContract, sigma: f64) -> f64 {
    if contract.is_expired() || sigma <= 0.0 {
        return 0.0;
    }
    let (d1, _) = d1_d2(contract, sigma);
    contract.dividend_discount() * norm_pdf(d1)
        / (contract.spot * sigma * contract.expiry.sqrt())
}

/// Vega: dV/dσ, identical for calls and puts
pub fn vega(contract: &OptionContract, sigma: f64) -> f64 {
    if contract.is_expired() || sigma <= 0.0 {
        return 0.0;
    }
    let (d1, _) = d1_d2(contract, sigma);
    contract.spot * contract.dividend_discount() * contract.expiry.sqrt() * norm_pdf(d1)
}

/// Theta: dV/dt (per year)
pub fn theta(contract: &OptionContract, sigma: f64, side: OptionType) -> f64 {
    if contract.is_expired() || sigma <= 0.0 {
        return 0.0;
    }

    let (d1, d2) = d1_d2(contract, sigma);
    let disc_spot = contract.spot * contract.dividend_discount();
    let disc_strike = contract.strike * contract.discount();
    let decay = -disc_spot * norm_pdf(d1) * sigma / (2.0 * contract.expiry.sqrt());

    match side {
        OptionType::Call => {
            decay - contract.rate * disc_strike * norm_cdf(d2)
                + contract.div_yield * disc_spot * norm_cdf(d1)
        }
        OptionType::Put => {
            decay + contract.rate * disc_strike * norm_cdf(-d2)
                - contract.div_yield * disc_spot * norm_cdf(-d1)
        }
    }
}

/// Rho: dV/dr
pub fn rho(contract: &OptionContract, sigma: f64, side: OptionType) -> f64 {
    if contract.is_expired() || sigma <= 0.0 {
        return 0.0;
    }

    let (_, d2) = d1_d2(contract, sigma);
    let k_t_disc = contract.strike * contract.expiry * contract.discount();
    match side {
        OptionType::Call => k_t_disc * norm_cdf(d2),
        OptionType::Put => -k_t_disc * norm_cdf(-d2),
    }
}

/// All five Greeks in one call
pub fn greeks(contract: &OptionContract, sigma: f64, side: OptionType) -> Greeks {
    Greeks::new(
        delta(contract, sigma, side),
        gamma(contract, sigma),
        vega(contract, sigma),
        theta(contract, sigma, side),
        rho(contract, sigma, side),
    )
}

/// Implied volatility with the default tolerance and iteration budget
pub fn implied_volatility(
    observed_price: f64,
    contract: &OptionContract,
    side: OptionType,
) -> ModelResult<f64> {
    implied_volatility_with(observed_price, contract, side, IV_TOLERANCE, IV_MAX_ITERATIONS)
}

/// Newton-Raphson implied volatility inversion
///
/// Starts at σ = 0.5 and iterates σ ← σ + (observed − model)/vega, floored
/// at 1e-6 to keep the iterate strictly positive. Fails with an explicit
/// error (never a panic) when the contract is expired, the vega vanishes,
/// or the iteration budget runs out.
pub fn implied_volatility_with(
    observed_price: f64,
    contract: &OptionContract,
    side: OptionType,
    tolerance: f64,
    max_iterations: usize,
) -> ModelResult<f64> {
    if contract.is_expired() {
        return Err(ModelError::invalid_maturity(
            "no time value to invert at or past expiry",
        ));
    }

    let mut sigma = 0.5;
    for _ in 0..max_iterations {
        let model_price = price(contract, sigma, side);
        let diff = observed_price - model_price;

        if diff.abs() < tolerance {
            return Ok(sigma);
        }

        let v = vega(contract, sigma);
        if v.abs() < MIN_VEGA {
            return Err(ModelError::no_implied_vol(format!(
                "vega {v:.3e} too small at sigma {sigma:.6}"
            )));
        }

        sigma = (sigma + diff / v).max(MIN_SIGMA);
    }

    Err(ModelError::no_implied_vol(format!(
        "no convergence after {max_iterations} iterations"
    )))
}

/// Implied volatility for a batch of quotes
///
/// Quotes that fail to invert (expired, stationary vega, no convergence)
/// yield `None` instead of aborting the batch.
pub fn quote_implied_vols(quotes: &[Quote]) -> Vec<Option<f64>> {
    quotes
        .iter()
        .map(|q| implied_volatility(q.price, &q.contract, q.option_type).ok())
        .collect()
}
