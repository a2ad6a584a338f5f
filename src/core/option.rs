//! Option contract definitions
//!
//! A contract bundles the market and term inputs every pricer needs:
//! spot, strike, time to expiry, risk-free rate, and dividend yield.
//! The call/put side is passed separately to the pricing functions.

use serde::{Deserialize, Serialize};

/// Option type (Call or Put)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Intrinsic value at given spot
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

/// European option contract and its market inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in years
    pub expiry: f64,
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Continuous dividend yield
    pub div_yield: f64,
}

impl OptionContract {
    pub fn new(spot: f64, strike: f64, expiry: f64, rate: f64, div_yield: f64) -> Self {
        Self {
            spot,
            strike,
            expiry,
            rate,
            div_yield,
        }
    }

    /// Forward price: S * exp((r - q) * T)
    pub fn forward(&self) -> f64 {
        self.spot * ((self.rate - self.div_yield) * self.expiry).exp()
    }

    /// Discount factor: exp(-r * T)
    pub fn discount(&self) -> f64 {
        (-self.rate * self.expiry).exp()
    }

    /// Dividend discount factor: exp(-q * T)
    pub fn dividend_discount(&self) -> f64 {
        (-self.div_yield * self.expiry).exp()
    }

    /// True once the contract has reached (or passed) expiry
    pub fn is_expired(&self) -> bool {
        self.expiry <= 0.0
    }

    /// Copy with the spot shifted by `h` (finite-difference bumps)
    pub fn bump_spot(&self, h: f64) -> Self {
        Self {
            spot: self.spot + h,
            ..*self
        }
    }

    /// Copy with the expiry shifted by `h`
    pub fn bump_expiry(&self, h: f64) -> Self {
        Self {
            expiry: self.expiry + h,
            ..*self
        }
    }

    /// Copy with the rate shifted by `h`
    pub fn bump_rate(&self, h: f64) -> Self {
        Self {
            rate: self.rate + h,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic() {
        assert_eq!(OptionType::Call.intrinsic(105.0, 100.0), 5.0);
        assert_eq!(OptionType::Call.intrinsic(95.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(95.0, 100.0), 5.0);
        assert_eq!(OptionType::Put.intrinsic(105.0, 100.0), 0.0);
    }

    #[test]
    fn test_forward_and_discount() {
        let c = OptionContract::new(100.0, 100.0, 1.0, 0.05, 0.0);
        assert!((c.forward() - 100.0 * 0.05_f64.exp()).abs() < 1e-12);
        assert!((c.discount() - (-0.05_f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_bumps_leave_other_fields_alone() {
        let c = OptionContract::new(100.0, 95.0, 0.5, 0.03, 0.01);
        let b = c.bump_spot(1e-4);
        assert!((b.spot - 100.0001).abs() < 1e-12);
        assert_eq!(b.strike, c.strike);
        assert_eq!(b.expiry, c.expiry);
    }
}
