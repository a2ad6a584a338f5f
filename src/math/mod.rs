//! Numerical helpers shared by the pricing engines

pub mod quad;

pub use quad::*;
