// ibfund/src/base.rs
// Error definitions for the fundamental data library

use thiserror::Error;

/// Errors raised by the fundamental data pipeline.
#[derive(Error, Debug, Clone)]
pub enum FundError {
  #[error("Configuration error: {0}")]
  ConfigurationError(String),

  #[error("Not connected to data provider")]
  NotConnected,

  #[error("No data for report: {0}")]
  NoData(String),

  #[error("Parse error: {0}")]
  ParseError(String),

  #[error("Invalid parameter: {0}")]
  InvalidParameter(String),

  #[error("Internal error: {0}")]
  InternalError(String),
}
