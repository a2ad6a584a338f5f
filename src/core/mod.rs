//! Core data types for the pricing engines
//!
//! Defines fundamental types:
//! - OptionContract: spot, strike, expiry, rate, dividend yield
//! - Quote: observed market price (calibration target)
//! - Greeks: price sensitivities
//! - ModelError / ModelResult: error taxonomy

pub mod error;
pub mod greeks;
pub mod option;
pub mod quote;

pub use error::*;
pub use greeks::*;
pub use option::*;
pub use quote::*;
