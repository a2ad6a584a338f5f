//! Error types for the pricing and calibration engines

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid maturity: {0}")]
    InvalidMaturity(String),

    #[error("Implied volatility did not converge: {0}")]
    NoImpliedVolatility(String),

    #[error("Calibration requires at least one market quote")]
    EmptyCalibrationInput,

    #[error("Optimization error: {0}")]
    Optimization(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl ModelError {
    pub fn invalid_maturity(msg: impl Into<String>) -> Self {
        Self::InvalidMaturity(msg.into())
    }

    pub fn no_implied_vol(msg: impl Into<String>) -> Self {
        Self::NoImpliedVolatility(msg.into())
    }

    pub fn optimization(msg: impl Into<String>) -> Self {
        Self::Optimization(msg.into())
    }

    pub fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
