// ibfund/src/client.rs
// Fundamental data client over a provider connection

use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::base::FundError;
use crate::conn::{
  ProviderConnection, Ticker, GENERIC_TICK_FUNDAMENTAL_RATIOS, GENERIC_TICK_IB_DIVIDENDS,
};
use crate::contract::Contract;
use crate::data::{DividendSummary, FundamentalRatios, ReportKind};

/// Fetches fundamental report documents and streaming fundamental
/// ticks for one instrument.
pub struct FundamentalsClient {
  conn: Arc<dyn ProviderConnection>,
  contract: Contract,
  // One market data subscription per client, started on first use.
  ticker: Mutex<Option<(i32, Arc<Ticker>)>>,
}

impl std::fmt::Debug for FundamentalsClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FundamentalsClient").field("contract", &self.contract).finish_non_exhaustive()
  }
}

impl FundamentalsClient {
  pub fn new(conn: Arc<dyn ProviderConnection>, contract: Contract) -> Result<Self, FundError> {
    if contract.symbol.trim().is_empty() {
      return Err(FundError::InvalidParameter("Contract symbol is empty".to_string()));
    }
    if !conn.is_connected() {
      return Err(FundError::NotConnected);
    }
    info!("Fundamentals client ready for {}", contract);
    Ok(FundamentalsClient { conn, contract, ticker: Mutex::new(None) })
  }

  pub fn contract(&self) -> &Contract {
    &self.contract
  }

  /// Fetch one report document. An empty body from the provider means
  /// the report does not exist for this instrument; CalendarReport is
  /// known to always come back empty on this endpoint.
  pub fn request_report(&self, kind: ReportKind) -> Result<String, FundError> {
    if !self.conn.is_connected() {
      return Err(FundError::NotConnected);
    }
    debug!("Requesting {} for {}", kind, self.contract.symbol);
    let body = self.conn.fetch_report(&self.contract, kind)?;
    if body.trim().is_empty() {
      return Err(FundError::NoData(format!("{} for {}", kind, self.contract.symbol)));
    }
    Ok(body)
  }

  /// Fundamental ratios from the market data stream (generic tick
  /// 258). Blocks until the payload arrives.
  pub fn ratios_snapshot(&self) -> Result<FundamentalRatios, FundError> {
    let ticker = self.ensure_ticker()?;
    ticker.wait_fundamental_ratios()
  }

  /// Dividend summary from the market data stream (IB dividends
  /// tick). Blocks until the payload arrives.
  pub fn dividend_summary(&self) -> Result<DividendSummary, FundError> {
    let ticker = self.ensure_ticker()?;
    ticker.wait_dividend_summary()
  }

  /// The live ticker, if a subscription has been started.
  pub fn last_ticker(&self) -> Option<Arc<Ticker>> {
    self.ticker.lock().as_ref().map(|(_, t)| Arc::clone(t))
  }

  /// Cancel the market data subscription, if any.
  pub fn cancel_ticker(&self) -> Result<(), FundError> {
    if let Some((req_id, _)) = self.ticker.lock().take() {
      debug!("Cancelling market data subscription {}", req_id);
      self.conn.cancel_ticker(req_id)?;
    }
    Ok(())
  }

  /// Cancel any subscription and close the underlying connection.
  pub fn disconnect(&self) -> Result<(), FundError> {
    self.cancel_ticker()?;
    self.conn.disconnect()
  }

  fn ensure_ticker(&self) -> Result<Arc<Ticker>, FundError> {
    let mut guard = self.ticker.lock();
    if let Some((_, ticker)) = guard.as_ref() {
      return Ok(Arc::clone(ticker));
    }
    if !self.conn.is_connected() {
      return Err(FundError::NotConnected);
    }
    let ticker = Ticker::new();
    let ticks = format!("{},{}", GENERIC_TICK_FUNDAMENTAL_RATIOS, GENERIC_TICK_IB_DIVIDENDS);
    let req_id = self.conn.start_ticker(&self.contract, &ticks, Arc::clone(&ticker))?;
    debug!("Started market data subscription {} for {}", req_id, self.contract.symbol);
    *guard = Some((req_id, Arc::clone(&ticker)));
    Ok(ticker)
  }
}
