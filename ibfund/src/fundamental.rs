// ibfund/src/fundamental.rs
// Lazy facade over the parser, one instance per company

use std::sync::Arc;

use log::warn;
use once_cell::unsync::OnceCell;

use crate::base::FundError;
use crate::client::FundamentalsClient;
use crate::conn::{ProviderConnection, Ticker};
use crate::contract::Contract;
use crate::data::{
  AnalystForecast, BalanceSheetStatement, CashFlowStatement, CompanyInfo, Dividend,
  DividendPerShare, DividendSummary, EarningsPerShare, ForwardYear, FundamentalRatios,
  IncomeStatement, OwnershipReport, RatioSnapshot, ReportPeriod, Revenue, SectionData,
  StatementMapItem,
};
use crate::report_cache::XmlReportCache;
use crate::report_parser::FundamentalParser;

/// All fundamental data for one company, computed lazily and cached
/// for the lifetime of the instance. Each accessor fetches and parses
/// its underlying report at most once; repeated calls return the same
/// cached value. Intended for single-threaded use.
pub struct CompanyFundamental {
  parser: FundamentalParser,
  income_annual: OnceCell<Vec<IncomeStatement>>,
  income_quarter: OnceCell<Vec<IncomeStatement>>,
  balance_annual: OnceCell<Vec<BalanceSheetStatement>>,
  balance_quarter: OnceCell<Vec<BalanceSheetStatement>>,
  cashflow_annual: OnceCell<Vec<CashFlowStatement>>,
  cashflow_quarter: OnceCell<Vec<CashFlowStatement>>,
  ownership: OnceCell<OwnershipReport>,
  dividend: OnceCell<SectionData<Vec<Dividend>>>,
  div_ps_q: OnceCell<SectionData<Vec<DividendPerShare>>>,
  div_ps_ttm: OnceCell<SectionData<Vec<DividendPerShare>>>,
  revenue_ttm: OnceCell<SectionData<Vec<Revenue>>>,
  revenue_q: OnceCell<SectionData<Vec<Revenue>>>,
  eps_ttm: OnceCell<SectionData<Vec<EarningsPerShare>>>,
  eps_q: OnceCell<SectionData<Vec<EarningsPerShare>>>,
  analyst_forecast: OnceCell<AnalystForecast>,
  ratios: OnceCell<RatioSnapshot>,
  fundamental_ratios: OnceCell<FundamentalRatios>,
  dividend_summary: OnceCell<DividendSummary>,
  fy_estimates: OnceCell<Vec<ForwardYear>>,
  fy_actuals: OnceCell<Vec<ForwardYear>>,
  map_items: OnceCell<Vec<StatementMapItem>>,
  company_info: OnceCell<CompanyInfo>,
}

impl CompanyFundamental {
  /// Build for a US stock routed through SMART.
  pub fn new(conn: Arc<dyn ProviderConnection>, symbol: &str) -> Result<Self, FundError> {
    let client = FundamentalsClient::new(conn, Contract::stock(symbol))?;
    Ok(Self::with_client(client))
  }

  pub fn with_client(client: FundamentalsClient) -> Self {
    CompanyFundamental {
      parser: FundamentalParser::new(XmlReportCache::new(client)),
      income_annual: OnceCell::new(),
      income_quarter: OnceCell::new(),
      balance_annual: OnceCell::new(),
      balance_quarter: OnceCell::new(),
      cashflow_annual: OnceCell::new(),
      cashflow_quarter: OnceCell::new(),
      ownership: OnceCell::new(),
      dividend: OnceCell::new(),
      div_ps_q: OnceCell::new(),
      div_ps_ttm: OnceCell::new(),
      revenue_ttm: OnceCell::new(),
      revenue_q: OnceCell::new(),
      eps_ttm: OnceCell::new(),
      eps_q: OnceCell::new(),
      analyst_forecast: OnceCell::new(),
      ratios: OnceCell::new(),
      fundamental_ratios: OnceCell::new(),
      dividend_summary: OnceCell::new(),
      fy_estimates: OnceCell::new(),
      fy_actuals: OnceCell::new(),
      map_items: OnceCell::new(),
      company_info: OnceCell::new(),
    }
  }

  pub fn parser(&self) -> &FundamentalParser {
    &self.parser
  }

  fn client(&self) -> &FundamentalsClient {
    self.parser.reports().client()
  }

  pub fn symbol(&self) -> &str {
    &self.client().contract().symbol
  }

  pub fn contract(&self) -> &Contract {
    self.client().contract()
  }

  /// The live market data ticker, once a streaming accessor has run.
  pub fn ticker(&self) -> Option<Arc<Ticker>> {
    self.client().last_ticker()
  }

  pub fn disconnect(&self) -> Result<(), FundError> {
    self.client().disconnect()
  }

  // --- Financial statements ---

  pub fn income_annual(&self) -> Result<&[IncomeStatement], FundError> {
    self
      .income_annual
      .get_or_try_init(|| self.parser.income_statements(ReportPeriod::Annual, None))
      .map(Vec::as_slice)
  }

  /// Most recent annual income statement.
  pub fn income_annual_mr(&self) -> Result<&IncomeStatement, FundError> {
    first(self.income_annual()?, "annual income statement")
  }

  pub fn income_quarter(&self) -> Result<&[IncomeStatement], FundError> {
    self
      .income_quarter
      .get_or_try_init(|| self.parser.income_statements(ReportPeriod::Quarter, None))
      .map(Vec::as_slice)
  }

  /// Most recent quarterly income statement.
  pub fn income_mrq(&self) -> Result<&IncomeStatement, FundError> {
    first(self.income_quarter()?, "quarterly income statement")
  }

  pub fn balance_annual(&self) -> Result<&[BalanceSheetStatement], FundError> {
    self
      .balance_annual
      .get_or_try_init(|| self.parser.balance_sheets(ReportPeriod::Annual, None))
      .map(Vec::as_slice)
  }

  pub fn balance_annual_mr(&self) -> Result<&BalanceSheetStatement, FundError> {
    first(self.balance_annual()?, "annual balance sheet")
  }

  pub fn balance_quarter(&self) -> Result<&[BalanceSheetStatement], FundError> {
    self
      .balance_quarter
      .get_or_try_init(|| self.parser.balance_sheets(ReportPeriod::Quarter, None))
      .map(Vec::as_slice)
  }

  pub fn balance_mrq(&self) -> Result<&BalanceSheetStatement, FundError> {
    first(self.balance_quarter()?, "quarterly balance sheet")
  }

  pub fn cashflow_annual(&self) -> Result<&[CashFlowStatement], FundError> {
    self
      .cashflow_annual
      .get_or_try_init(|| self.parser.cash_flows(ReportPeriod::Annual, None))
      .map(Vec::as_slice)
  }

  pub fn cashflow_annual_mr(&self) -> Result<&CashFlowStatement, FundError> {
    first(self.cashflow_annual()?, "annual cash flow statement")
  }

  pub fn cashflow_quarter(&self) -> Result<&[CashFlowStatement], FundError> {
    self
      .cashflow_quarter
      .get_or_try_init(|| self.parser.cash_flows(ReportPeriod::Quarter, None))
      .map(Vec::as_slice)
  }

  pub fn cashflow_mrq(&self) -> Result<&CashFlowStatement, FundError> {
    first(self.cashflow_quarter()?, "quarterly cash flow statement")
  }

  pub fn map_items(&self) -> Result<&[StatementMapItem], FundError> {
    self.map_items.get_or_try_init(|| self.parser.map_items(None)).map(Vec::as_slice)
  }

  // --- Summary series ---

  pub fn dividend(&self) -> Result<&SectionData<Vec<Dividend>>, FundError> {
    self.dividend.get_or_try_init(|| self.parser.dividends())
  }

  /// Dividend per share, reported quarters.
  pub fn div_ps_q(&self) -> Result<&SectionData<Vec<DividendPerShare>>, FundError> {
    self.div_ps_q.get_or_try_init(|| self.parser.dividends_per_share(Some("R"), Some("3M")))
  }

  /// Dividend per share, trailing twelve months.
  pub fn div_ps_ttm(&self) -> Result<&SectionData<Vec<DividendPerShare>>, FundError> {
    self.div_ps_ttm.get_or_try_init(|| self.parser.dividends_per_share(Some("TTM"), None))
  }

  pub fn revenue_ttm(&self) -> Result<&SectionData<Vec<Revenue>>, FundError> {
    self.revenue_ttm.get_or_try_init(|| self.parser.revenues(Some("TTM"), None))
  }

  pub fn revenue_q(&self) -> Result<&SectionData<Vec<Revenue>>, FundError> {
    self.revenue_q.get_or_try_init(|| self.parser.revenues(Some("R"), Some("3M")))
  }

  /// Most recent trailing twelve month revenue.
  pub fn revenue_mrq(&self) -> Result<&Revenue, FundError> {
    first_section(self.revenue_ttm()?, "trailing revenue")
  }

  pub fn eps_ttm(&self) -> Result<&SectionData<Vec<EarningsPerShare>>, FundError> {
    self.eps_ttm.get_or_try_init(|| self.parser.eps(Some("TTM"), None))
  }

  pub fn eps_q(&self) -> Result<&SectionData<Vec<EarningsPerShare>>, FundError> {
    self.eps_q.get_or_try_init(|| self.parser.eps(Some("R"), Some("3M")))
  }

  /// Most recent trailing twelve month earnings per share.
  pub fn eps_mrq(&self) -> Result<&EarningsPerShare, FundError> {
    first_section(self.eps_ttm()?, "trailing earnings per share")
  }

  // --- Snapshot, estimates, ownership, identity ---

  pub fn analyst_forecast(&self) -> Result<&AnalystForecast, FundError> {
    self.analyst_forecast.get_or_try_init(|| self.parser.analyst_forecast())
  }

  pub fn ratios(&self) -> Result<&RatioSnapshot, FundError> {
    self.ratios.get_or_try_init(|| self.parser.ratio_snapshot())
  }

  pub fn fy_estimates(&self) -> Result<&[ForwardYear], FundError> {
    self.fy_estimates.get_or_try_init(|| self.parser.fy_estimates()).map(Vec::as_slice)
  }

  pub fn fy_actuals(&self) -> Result<&[ForwardYear], FundError> {
    self.fy_actuals.get_or_try_init(|| self.parser.fy_actuals()).map(Vec::as_slice)
  }

  pub fn ownership_report(&self) -> Result<&OwnershipReport, FundError> {
    self.ownership.get_or_try_init(|| self.parser.ownership_report())
  }

  pub fn company_info(&self) -> Result<&CompanyInfo, FundError> {
    self.company_info.get_or_try_init(|| self.parser.company_info())
  }

  // --- Streaming ---

  /// Fundamental ratios from the market data stream. Starts the
  /// subscription on first use; `ticker()` is populated afterwards.
  pub fn fundamental_ratios(&self) -> Result<&FundamentalRatios, FundError> {
    self.fundamental_ratios.get_or_try_init(|| self.client().ratios_snapshot())
  }

  /// Dividend summary from the market data stream.
  pub fn dividend_summary(&self) -> Result<&DividendSummary, FundError> {
    self.dividend_summary.get_or_try_init(|| self.client().dividend_summary())
  }
}

impl Drop for CompanyFundamental {
  fn drop(&mut self) {
    if let Err(e) = self.client().disconnect() {
      warn!("Disconnect on drop failed: {}", e);
    }
  }
}

fn first<'a, T>(records: &'a [T], what: &str) -> Result<&'a T, FundError> {
  records.first().ok_or_else(|| FundError::NoData(what.to_string()))
}

fn first_section<'a, T>(section: &'a SectionData<Vec<T>>, what: &str) -> Result<&'a T, FundError> {
  section
    .as_option()
    .and_then(|v| v.first())
    .ok_or_else(|| FundError::NoData(what.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::conn_mock::MockConnection;
  use crate::data::ReportKind;

  const FIN_STATEMENTS: &str = r#"<ReportFinancialStatements>
  <CoIDs><CoID Type="CompanyName">Apple Inc.</CoID></CoIDs>
  <Issues><Issue><IssueID Type="Ticker">AAPL</IssueID><Exchange Code="NASD">NASDAQ</Exchange></Issue></Issues>
  <FinancialStatements>
    <COAMap>
      <mapItem coaItem="SREV" statementType="INC" lineID="1">Revenue</mapItem>
    </COAMap>
    <AnnualPeriods>
      <FiscalPeriod Type="Annual" EndDate="2022-09-24" FiscalYear="2022">
        <Statement Type="INC">
          <FPHeader><Source Date="2022-10-28">10-K</Source></FPHeader>
          <lineItem coaCode="SREV">394328.0</lineItem>
        </Statement>
      </FiscalPeriod>
      <FiscalPeriod Type="Annual" EndDate="2023-09-30" FiscalYear="2023">
        <Statement Type="INC">
          <FPHeader><Source Date="2023-11-03">10-K</Source></FPHeader>
          <lineItem coaCode="SREV">383285.0</lineItem>
        </Statement>
      </FiscalPeriod>
    </AnnualPeriods>
    <InterimPeriods/>
  </FinancialStatements>
</ReportFinancialStatements>"#;

  const FIN_SUMMARY: &str = r#"<FinancialSummary>
  <TotalRevenues currency="USD">
    <TotalRevenue asofDate="2024-03-30" reportType="TTM" period="12M">381623000000</TotalRevenue>
  </TotalRevenues>
  <EPSs currency="USD">
    <EPS asofDate="2024-03-30" reportType="TTM" period="12M">6.43</EPS>
  </EPSs>
</FinancialSummary>"#;

  fn fundamental_with(conn: MockConnection) -> (Arc<MockConnection>, CompanyFundamental) {
    let conn = Arc::new(conn);
    let fund = CompanyFundamental::new(
      Arc::clone(&conn) as Arc<dyn ProviderConnection>,
      "AAPL",
    )
    .unwrap();
    (conn, fund)
  }

  #[test]
  fn test_accessors_fetch_once_and_return_same_value() {
    let conn = MockConnection::new();
    conn.set_report(ReportKind::ReportsFinStatements, FIN_STATEMENTS);
    let (conn, fund) = fundamental_with(conn);
    let first_call = fund.income_annual().unwrap();
    assert_eq!(first_call.len(), 2);
    let second_call = fund.income_annual().unwrap();
    assert!(std::ptr::eq(first_call.as_ptr(), second_call.as_ptr()));
    // income, balance and map accessors share one cached document.
    fund.balance_annual().unwrap();
    fund.map_items().unwrap();
    fund.company_info().unwrap();
    assert_eq!(conn.request_count(ReportKind::ReportsFinStatements), 1);
  }

  #[test]
  fn test_most_recent_helpers() {
    let conn = MockConnection::new();
    conn.set_report(ReportKind::ReportsFinStatements, FIN_STATEMENTS);
    conn.set_report(ReportKind::ReportsFinSummary, FIN_SUMMARY);
    let (_, fund) = fundamental_with(conn);
    assert_eq!(fund.income_annual_mr().unwrap().fiscal_year, Some(2022));
    assert_eq!(fund.revenue_mrq().unwrap().revenue, 381623000000.0);
    assert_eq!(fund.eps_mrq().unwrap().eps, 6.43);
    // No interim periods in the document.
    assert!(matches!(fund.income_mrq(), Err(FundError::NoData(_))));
  }

  #[test]
  fn test_absent_summary_sections() {
    let conn = MockConnection::new();
    conn.set_report(ReportKind::ReportsFinSummary, "<FinancialSummary/>");
    let (_, fund) = fundamental_with(conn);
    assert!(fund.dividend().unwrap().is_absent());
    assert!(fund.div_ps_ttm().unwrap().is_absent());
    assert!(matches!(fund.eps_mrq(), Err(FundError::NoData(_))));
  }

  #[test]
  fn test_missing_report_not_cached_as_success() {
    let (conn, fund) = fundamental_with(MockConnection::new());
    assert!(matches!(fund.ownership_report(), Err(FundError::NoData(_))));
    assert!(matches!(fund.ownership_report(), Err(FundError::NoData(_))));
    assert_eq!(conn.request_count(ReportKind::ReportsOwnership), 2);
  }

  #[test]
  fn test_streaming_accessors_populate_ticker() {
    let conn = MockConnection::new();
    conn.set_fundamental_ratios_payload("TTMEPS=6.45;MKTCAP=2807333");
    conn.set_dividend_summary_payload("0.96,1.00,20260219,0.25");
    let (_, fund) = fundamental_with(conn);
    assert!(fund.ticker().is_none());
    let ratios = fund.fundamental_ratios().unwrap();
    assert_eq!(ratios.get("TTMEPS"), Some(6.45));
    assert!(fund.ticker().is_some());
    assert_eq!(fund.dividend_summary().unwrap().next_amount, Some(0.25));
  }

  #[test]
  fn test_symbol_and_contract() {
    let (_, fund) = fundamental_with(MockConnection::new());
    assert_eq!(fund.symbol(), "AAPL");
    assert_eq!(fund.contract().exchange, "SMART");
  }
}
