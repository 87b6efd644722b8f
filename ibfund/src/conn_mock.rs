// ibfund/src/conn_mock.rs
// Canned transport for tests and offline replay

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::base::FundError;
use crate::conn::{ProviderConnection, Ticker, GENERIC_TICK_FUNDAMENTAL_RATIOS, GENERIC_TICK_IB_DIVIDENDS};
use crate::contract::Contract;
use crate::data::ReportKind;

/// A `ProviderConnection` backed by preloaded documents instead of a
/// live session. Report kinds with no stored document return an empty
/// body, which the client turns into a no-data error.
pub struct MockConnection {
  reports: Mutex<HashMap<ReportKind, String>>,
  request_counts: Mutex<HashMap<ReportKind, usize>>,
  connected: AtomicBool,
  ratios_payload: Mutex<Option<String>>,
  dividends_payload: Mutex<Option<String>>,
  next_req_id: AtomicI32,
  active_tickers: Mutex<HashMap<i32, Arc<Ticker>>>,
}

impl MockConnection {
  pub fn new() -> Self {
    MockConnection {
      reports: Mutex::new(HashMap::new()),
      request_counts: Mutex::new(HashMap::new()),
      connected: AtomicBool::new(true),
      ratios_payload: Mutex::new(None),
      dividends_payload: Mutex::new(None),
      next_req_id: AtomicI32::new(1),
      active_tickers: Mutex::new(HashMap::new()),
    }
  }

  /// Load report documents from a directory of `<ReportKind>.xml`
  /// files, e.g. `ReportsFinStatements.xml`. Missing files are simply
  /// not loaded.
  pub fn from_dir(dir: &Path) -> Result<Self, FundError> {
    let conn = MockConnection::new();
    let kinds = [
      ReportKind::ReportsFinStatements,
      ReportKind::ReportsFinSummary,
      ReportKind::ReportSnapshot,
      ReportKind::Resc,
      ReportKind::ReportsOwnership,
      ReportKind::CalendarReport,
    ];
    for kind in kinds {
      let path = dir.join(format!("{}.xml", kind.as_tws_str()));
      if path.is_file() {
        let body = std::fs::read_to_string(&path).map_err(|e| {
          FundError::ConfigurationError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        info!("Loaded {} ({} bytes)", path.display(), body.len());
        conn.set_report(kind, body);
      }
    }
    Ok(conn)
  }

  pub fn set_report(&self, kind: ReportKind, body: impl Into<String>) {
    self.reports.lock().insert(kind, body.into());
  }

  pub fn set_fundamental_ratios_payload(&self, payload: impl Into<String>) {
    *self.ratios_payload.lock() = Some(payload.into());
  }

  pub fn set_dividend_summary_payload(&self, payload: impl Into<String>) {
    *self.dividends_payload.lock() = Some(payload.into());
  }

  /// How many times `fetch_report` was called for this kind.
  pub fn request_count(&self, kind: ReportKind) -> usize {
    self.request_counts.lock().get(&kind).copied().unwrap_or(0)
  }

  pub fn active_ticker_count(&self) -> usize {
    self.active_tickers.lock().len()
  }
}

impl Default for MockConnection {
  fn default() -> Self {
    MockConnection::new()
  }
}

impl ProviderConnection for MockConnection {
  fn is_connected(&self) -> bool {
    self.connected.load(Ordering::SeqCst)
  }

  fn fetch_report(&self, contract: &Contract, kind: ReportKind) -> Result<String, FundError> {
    if !self.is_connected() {
      return Err(FundError::NotConnected);
    }
    *self.request_counts.lock().entry(kind).or_insert(0) += 1;
    debug!("Mock fetch_report {} for {}", kind, contract.symbol);
    Ok(self.reports.lock().get(&kind).cloned().unwrap_or_default())
  }

  fn start_ticker(
    &self,
    _contract: &Contract,
    generic_ticks: &str,
    ticker: Arc<Ticker>,
  ) -> Result<i32, FundError> {
    if !self.is_connected() {
      return Err(FundError::NotConnected);
    }
    let req_id = self.next_req_id.fetch_add(1, Ordering::SeqCst);
    let wants = |tick: &str| generic_ticks.split(',').any(|t| t.trim() == tick);
    if wants(GENERIC_TICK_FUNDAMENTAL_RATIOS) {
      if let Some(payload) = self.ratios_payload.lock().as_deref() {
        ticker.push_fundamental_ratios(payload);
      }
    }
    if wants(GENERIC_TICK_IB_DIVIDENDS) {
      if let Some(payload) = self.dividends_payload.lock().as_deref() {
        ticker.push_dividend_summary(payload);
      }
    }
    self.active_tickers.lock().insert(req_id, ticker);
    Ok(req_id)
  }

  fn cancel_ticker(&self, req_id: i32) -> Result<(), FundError> {
    self.active_tickers.lock().remove(&req_id);
    Ok(())
  }

  fn disconnect(&self) -> Result<(), FundError> {
    self.connected.store(false, Ordering::SeqCst);
    self.active_tickers.lock().clear();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unset_report_returns_empty_body() {
    let conn = MockConnection::new();
    let contract = Contract::stock("AAPL");
    let body = conn.fetch_report(&contract, ReportKind::CalendarReport).unwrap();
    assert!(body.is_empty());
    assert_eq!(conn.request_count(ReportKind::CalendarReport), 1);
  }

  #[test]
  fn test_disconnect_rejects_fetch() {
    let conn = MockConnection::new();
    conn.disconnect().unwrap();
    let contract = Contract::stock("AAPL");
    assert!(matches!(
      conn.fetch_report(&contract, ReportKind::ReportSnapshot),
      Err(FundError::NotConnected)
    ));
  }

  #[test]
  fn test_start_ticker_delivers_preset_payloads() {
    let conn = MockConnection::new();
    conn.set_fundamental_ratios_payload("MKTCAP=100.5");
    conn.set_dividend_summary_payload("0.83,0.92,20260219,0.23");
    let ticker = Ticker::new();
    let contract = Contract::stock("AAPL");
    let ticks = format!("{},{}", GENERIC_TICK_FUNDAMENTAL_RATIOS, GENERIC_TICK_IB_DIVIDENDS);
    let req_id = conn.start_ticker(&contract, &ticks, Arc::clone(&ticker)).unwrap();
    assert_eq!(ticker.fundamental_ratios().unwrap().get("MKTCAP"), Some(100.5));
    assert_eq!(ticker.dividend_summary().unwrap().next_amount, Some(0.23));
    assert_eq!(conn.active_ticker_count(), 1);
    conn.cancel_ticker(req_id).unwrap();
    assert_eq!(conn.active_ticker_count(), 0);
  }
}
