//! Model calibration
//!
//! Fits model parameters to observed market quotes by box-constrained
//! nonlinear least squares.

pub mod heston_fit;
pub mod optimizer;

pub use heston_fit::{calibrate, CalibrationResult};
pub use optimizer::{
    levenberg_marquardt, Bounds, LeastSquaresOptions, LeastSquaresSolution, Termination,
};
