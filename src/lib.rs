//! # volmodels - Option Pricing and Model Calibration
//!
//! A pure, stateless pricing library with two engines:
//!
//! - **Black-Scholes**: closed-form European option pricing, analytic
//!   Greeks, and Newton-Raphson implied volatility inversion under constant
//!   volatility.
//! - **Heston**: semi-analytic pricing under stochastic volatility via
//!   adaptive Fourier integration of the characteristic function,
//!   finite-difference Greeks, and least-squares calibration of the five
//!   model parameters to a basket of market quotes.
//!
//! Every pricing and Greek computation is a pure function of its inputs
//! (contract plus an immutable parameter snapshot), so calls may run on any
//! thread without synchronization. The calibration objective prices its
//! quote basket in parallel; the optimizer's successive steps are
//! inherently sequential.
//!
//! ## Usage
//!
//! ```rust
//! use volmodels::prelude::*;
//!
//! // S=100, K=100, T=1y, r=5%, q=0
//! let contract = OptionContract::new(100.0, 100.0, 1.0, 0.05, 0.0);
//!
//! // Black-Scholes price and implied vol round-trip
//! let call = black_scholes::price(&contract, 0.2, OptionType::Call);
//! let iv = black_scholes::implied_volatility(call, &contract, OptionType::Call).unwrap();
//! assert!((iv - 0.2).abs() < 0.01);
//!
//! // Heston price under typical equity-index parameters
//! let heston_call = heston::price(&contract, &HestonParams::default(), OptionType::Call);
//! assert!(heston_call > 0.0 && heston_call < contract.spot);
//! ```
//!
//! Upstream layers (request handling, job dispatch, persistence, market
//! data ingestion, notifications) are external collaborators: they supply
//! contracts and quotes and consume prices, Greeks, and calibration
//! results.

pub mod calibration;
pub mod core;
pub mod math;
pub mod models;

/// Prelude with commonly used types
pub mod prelude {
    pub use crate::calibration::{calibrate, Bounds, CalibrationResult, LeastSquaresOptions};
    pub use crate::core::{
        Greeks, ModelError, ModelResult, OptionContract, OptionType, Quote,
    };
    pub use crate::models::black_scholes::{self, implied_volatility, norm_cdf, norm_pdf};
    pub use crate::models::heston::{self, HestonParams};
}
