// ibfund/src/contract.rs
// Instrument descriptor for fundamental data requests

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies the instrument a fundamental report is requested for.
///
/// Fundamental reports are only available for stocks, so the security type
/// is implied. The descriptor is resolved once at client construction and
/// read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
  pub symbol: String,
  pub exchange: String,
  pub currency: String,
}

impl Contract {
  /// Stock contract with SMART routing and USD currency.
  pub fn stock(symbol: &str) -> Self {
    Contract {
      symbol: symbol.to_string(),
      exchange: "SMART".to_string(),
      currency: "USD".to_string(),
    }
  }

  pub fn stock_with_exchange(symbol: &str, exchange: &str, currency: &str) -> Self {
    Contract {
      symbol: symbol.to_string(),
      exchange: exchange.to_string(),
      currency: currency.to_string(),
    }
  }
}

impl fmt::Display for Contract {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({}/{})", self.symbol, self.exchange, self.currency)
  }
}
