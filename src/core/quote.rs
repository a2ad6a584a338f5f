//! Market quotes used as calibration targets

use serde::{Deserialize, Serialize};

use super::option::{OptionContract, OptionType};

/// A single observed market price for an option contract
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Quote {
    /// The contract the price was observed for
    pub contract: OptionContract,
    /// Call or put
    pub option_type: OptionType,
    /// Observed market price
    pub price: f64,
}

impl Quote {
    pub fn new(contract: OptionContract, option_type: OptionType, price: f64) -> Self {
        Self {
            contract,
            option_type,
            price,
        }
    }

    /// Intrinsic value of the quoted contract
    pub fn intrinsic(&self) -> f64 {
        self.option_type
            .intrinsic(self.contract.spot, self.contract.strike)
    }

    /// Is the quoted contract in the money?
    pub fn is_itm(&self) -> bool {
        self.intrinsic() > 0.0
    }

    /// Time value embedded in the quote (price minus intrinsic)
    pub fn time_value(&self) -> f64 {
        self.price - self.intrinsic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_accessors() {
        let contract = OptionContract::new(100.0, 95.0, 1.0, 0.05, 0.0);
        let q = Quote::new(contract, OptionType::Call, 8.0);
        assert!(q.is_itm());
        assert!((q.intrinsic() - 5.0).abs() < 1e-12);
        assert!((q.time_value() - 3.0).abs() < 1e-12);
    }
}
