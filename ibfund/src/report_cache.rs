// ibfund/src/report_cache.rs
// Fetch-once cache of parsed report documents

use log::debug;
use once_cell::unsync::OnceCell;

use crate::base::FundError;
use crate::client::FundamentalsClient;
use crate::data::ReportKind;
use crate::xml_tree::XmlNode;

/// Caches the parsed document tree of each report kind. Each report is
/// fetched and parsed at most once per instance; accessors hand out
/// references into the cached tree. CalendarReport has no accessor
/// because the endpoint never returns it with a body.
pub struct XmlReportCache {
  client: FundamentalsClient,
  statements: OnceCell<XmlNode>,
  fin_summary: OnceCell<XmlNode>,
  snapshot: OnceCell<XmlNode>,
  resc: OnceCell<XmlNode>,
  ownership: OnceCell<XmlNode>,
}

impl XmlReportCache {
  pub fn new(client: FundamentalsClient) -> Self {
    XmlReportCache {
      client,
      statements: OnceCell::new(),
      fin_summary: OnceCell::new(),
      snapshot: OnceCell::new(),
      resc: OnceCell::new(),
      ownership: OnceCell::new(),
    }
  }

  pub fn client(&self) -> &FundamentalsClient {
    &self.client
  }

  pub fn statements(&self) -> Result<&XmlNode, FundError> {
    self.statements.get_or_try_init(|| self.fetch_tree(ReportKind::ReportsFinStatements))
  }

  pub fn fin_summary(&self) -> Result<&XmlNode, FundError> {
    self.fin_summary.get_or_try_init(|| self.fetch_tree(ReportKind::ReportsFinSummary))
  }

  pub fn snapshot(&self) -> Result<&XmlNode, FundError> {
    self.snapshot.get_or_try_init(|| self.fetch_tree(ReportKind::ReportSnapshot))
  }

  pub fn resc(&self) -> Result<&XmlNode, FundError> {
    self.resc.get_or_try_init(|| self.fetch_tree(ReportKind::Resc))
  }

  pub fn ownership(&self) -> Result<&XmlNode, FundError> {
    self.ownership.get_or_try_init(|| self.fetch_tree(ReportKind::ReportsOwnership))
  }

  fn fetch_tree(&self, kind: ReportKind) -> Result<XmlNode, FundError> {
    let body = self.client.request_report(kind)?;
    debug!("Parsing {} document ({} bytes)", kind, body.len());
    XmlNode::parse(&body)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::conn_mock::MockConnection;
  use crate::contract::Contract;
  use std::sync::Arc;

  fn cache_with(conn: MockConnection) -> (Arc<MockConnection>, XmlReportCache) {
    let conn = Arc::new(conn);
    let client = FundamentalsClient::new(Arc::clone(&conn) as _, Contract::stock("AAPL")).unwrap();
    (conn, XmlReportCache::new(client))
  }

  #[test]
  fn test_report_fetched_once() {
    let conn = MockConnection::new();
    conn.set_report(ReportKind::ReportSnapshot, "<ReportSnapshot><CoIDs/></ReportSnapshot>");
    let (conn, cache) = cache_with(conn);
    let first = cache.snapshot().unwrap();
    let second = cache.snapshot().unwrap();
    assert!(std::ptr::eq(first, second));
    assert_eq!(conn.request_count(ReportKind::ReportSnapshot), 1);
  }

  #[test]
  fn test_missing_report_propagates_no_data() {
    let (conn, cache) = cache_with(MockConnection::new());
    assert!(matches!(cache.ownership(), Err(FundError::NoData(_))));
    // A failed fetch is not cached, the next call tries again.
    assert!(matches!(cache.ownership(), Err(FundError::NoData(_))));
    assert_eq!(conn.request_count(ReportKind::ReportsOwnership), 2);
  }

  #[test]
  fn test_malformed_document_is_parse_error() {
    let conn = MockConnection::new();
    conn.set_report(ReportKind::Resc, "<REarnEstCons><Unclosed></REarnEstCons>");
    let (_, cache) = cache_with(conn);
    assert!(matches!(cache.resc(), Err(FundError::ParseError(_))));
  }
}
