//! Pricing models
//!
//! Implements:
//! - Black-Scholes (closed-form pricing, Greeks, IV inversion)
//! - Heston stochastic volatility (characteristic function pricing,
//!   finite-difference Greeks)

pub mod black_scholes;
pub mod heston;

pub use heston::HestonParams;
