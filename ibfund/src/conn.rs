// ibfund/src/conn.rs
// Transport seam between the fundamentals client and TWS

use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};

use crate::base::FundError;
use crate::contract::Contract;
use crate::data::{DividendSummary, FundamentalRatios, ReportKind};

/// Generic tick that carries the fundamental ratios payload.
pub const GENERIC_TICK_FUNDAMENTAL_RATIOS: &str = "258";
/// Generic tick that carries the IB dividend summary payload.
pub const GENERIC_TICK_IB_DIVIDENDS: &str = "456";

/// Transport abstraction over a TWS session. The real implementation
/// speaks the wire protocol; tests substitute a canned one.
pub trait ProviderConnection: Send + Sync {
  fn is_connected(&self) -> bool;

  /// Fetch one fundamental data report document. Blocks until the full
  /// document has arrived. An empty body is returned as-is; the client
  /// decides whether that is an error.
  fn fetch_report(&self, contract: &Contract, kind: ReportKind) -> Result<String, FundError>;

  /// Start a market data subscription for the given generic tick list,
  /// delivering payloads into `ticker`. Returns the request id used to
  /// cancel the subscription.
  fn start_ticker(
    &self,
    contract: &Contract,
    generic_ticks: &str,
    ticker: Arc<Ticker>,
  ) -> Result<i32, FundError>;

  /// Cancel a market data subscription previously started with
  /// `start_ticker`.
  fn cancel_ticker(&self, req_id: i32) -> Result<(), FundError>;

  fn disconnect(&self) -> Result<(), FundError>;
}

#[derive(Default)]
struct TickerState {
  fundamental_ratios: Option<FundamentalRatios>,
  dividend_summary: Option<DividendSummary>,
  error: Option<FundError>,
}

/// Observable sink for streaming tick payloads. The transport pushes
/// payloads in; callers block on the condvar until the field they need
/// has arrived.
pub struct Ticker {
  state: Mutex<TickerState>,
  cond: Condvar,
}

impl Ticker {
  pub fn new() -> Arc<Self> {
    Arc::new(Ticker {
      state: Mutex::new(TickerState::default()),
      cond: Condvar::new(),
    })
  }

  /// Push a raw fundamental ratios payload (generic tick 258).
  pub fn push_fundamental_ratios(&self, payload: &str) {
    let parsed = FundamentalRatios::parse(payload);
    debug!("Fundamental ratios tick: {} numeric fields", parsed.values.len());
    let mut state = self.state.lock();
    state.fundamental_ratios = Some(parsed);
    self.cond.notify_all();
  }

  /// Push a raw dividend summary payload (IB dividends tick).
  pub fn push_dividend_summary(&self, payload: &str) {
    let mut state = self.state.lock();
    match DividendSummary::parse(payload) {
      Ok(parsed) => state.dividend_summary = Some(parsed),
      Err(e) => {
        warn!("Bad dividend summary payload: {}", e);
        state.error = Some(e);
      }
    }
    self.cond.notify_all();
  }

  /// Record a stream error, waking any waiters.
  pub fn push_error(&self, err: FundError) {
    let mut state = self.state.lock();
    state.error = Some(err);
    self.cond.notify_all();
  }

  /// Last fundamental ratios payload received, if any.
  pub fn fundamental_ratios(&self) -> Option<FundamentalRatios> {
    self.state.lock().fundamental_ratios.clone()
  }

  /// Last dividend summary payload received, if any.
  pub fn dividend_summary(&self) -> Option<DividendSummary> {
    self.state.lock().dividend_summary.clone()
  }

  /// Block until a fundamental ratios payload or a stream error
  /// arrives. This is one of the two block-until-ready primitives in
  /// the crate; everything else fails synchronously.
  pub fn wait_fundamental_ratios(&self) -> Result<FundamentalRatios, FundError> {
    self.wait_for(|state| state.fundamental_ratios.clone())
  }

  /// Block until a dividend summary payload or a stream error arrives.
  pub fn wait_dividend_summary(&self) -> Result<DividendSummary, FundError> {
    self.wait_for(|state| state.dividend_summary.clone())
  }

  fn wait_for<T, F>(&self, get: F) -> Result<T, FundError>
  where
    F: Fn(&TickerState) -> Option<T>,
  {
    let mut state = self.state.lock();
    loop {
      if let Some(err) = state.error.take() {
        return Err(err);
      }
      if let Some(value) = get(&state) {
        return Ok(value);
      }
      self.cond.wait(&mut state);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::thread;

  #[test]
  fn test_ticker_wait_sees_pushed_ratios() {
    let ticker = Ticker::new();
    let pusher = Arc::clone(&ticker);
    let handle = thread::spawn(move || {
      pusher.push_fundamental_ratios("TTMEPS=6.45;CURRENCY=USD");
    });
    let ratios = ticker.wait_fundamental_ratios().unwrap();
    assert_eq!(ratios.get("TTMEPS"), Some(6.45));
    handle.join().unwrap();
  }

  #[test]
  fn test_ticker_peek_does_not_block() {
    let ticker = Ticker::new();
    assert!(ticker.fundamental_ratios().is_none());
    assert!(ticker.dividend_summary().is_none());
  }

  #[test]
  fn test_ticker_surfaces_stream_error() {
    let ticker = Ticker::new();
    ticker.push_error(FundError::NotConnected);
    let err = ticker.wait_fundamental_ratios().unwrap_err();
    assert!(matches!(err, FundError::NotConnected));
  }

  #[test]
  fn test_ticker_keeps_latest_payload() {
    let ticker = Ticker::new();
    ticker.push_dividend_summary("0.83,0.92,20260219,0.23");
    let d = ticker.dividend_summary().unwrap();
    assert_eq!(d.next_amount, Some(0.23));
    ticker.push_dividend_summary("0.90,1.00,20260519,0.25");
    let d = ticker.dividend_summary().unwrap();
    assert_eq!(d.next_amount, Some(0.25));
  }
}
