// ibfund/src/report_parser.rs
// Extraction of typed records from fundamental report documents

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;

use crate::base::FundError;
use crate::data::{
  AnalystForecast, BalanceSheetStatement, CashFlowStatement, CompanyInfo, Dividend,
  DividendPerShare, EarningsPerShare, EstimateStatistic, ForwardYear, ForwardYearKind,
  IncomeStatement, OwnershipCompany, OwnershipDetails, OwnershipReport, PeriodMeta,
  RatioSnapshot, ReportPeriod, Revenue, SectionData, StatementCode, StatementMapItem,
  StatementPeriod, StatementRecord,
};
use crate::report_cache::XmlReportCache;
use crate::xml_tree::XmlNode;

/// Extracts typed records from the cached report documents. All
/// methods are read-only queries over the document trees; unknown
/// element or attribute vocabulary is skipped with a debug log, while
/// structurally required pieces fail loudly.
pub struct FundamentalParser {
  reports: XmlReportCache,
}

impl FundamentalParser {
  pub fn new(reports: XmlReportCache) -> Self {
    FundamentalParser { reports }
  }

  pub fn reports(&self) -> &XmlReportCache {
    &self.reports
  }

  // --- Financial statements ---

  /// Income statements, one record per fiscal period, in document
  /// order. `end_date` restricts the result to the period ending on
  /// that date.
  pub fn income_statements(
    &self,
    period: ReportPeriod,
    end_date: Option<NaiveDate>,
  ) -> Result<Vec<IncomeStatement>, FundError> {
    self.statements(period, end_date)
  }

  /// Balance sheets, one record per fiscal period.
  pub fn balance_sheets(
    &self,
    period: ReportPeriod,
    end_date: Option<NaiveDate>,
  ) -> Result<Vec<BalanceSheetStatement>, FundError> {
    self.statements(period, end_date)
  }

  /// Cash flow statements, one record per fiscal period.
  pub fn cash_flows(
    &self,
    period: ReportPeriod,
    end_date: Option<NaiveDate>,
  ) -> Result<Vec<CashFlowStatement>, FundError> {
    self.statements(period, end_date)
  }

  fn statements<T: StatementRecord>(
    &self,
    period: ReportPeriod,
    end_date: Option<NaiveDate>,
  ) -> Result<Vec<T>, FundError> {
    let doc = self.reports.statements()?;
    let container = match period {
      ReportPeriod::Annual => "AnnualPeriods",
      ReportPeriod::Quarter => "InterimPeriods",
    };
    let expected = period.statement_period();
    let mut out = Vec::new();
    for periods in doc.descendants(container) {
      for fp in periods.children_named("FiscalPeriod") {
        let fp_end = parse_date(fp.require_attr("EndDate")?)?;
        if let Some(wanted) = end_date {
          if fp_end != wanted {
            continue;
          }
        }
        let label: StatementPeriod = fp.require_attr("Type")?.parse()?;
        if label != expected {
          return Err(FundError::ParseError(format!(
            "Fiscal period ending {} inside <{}> is labelled {}",
            fp_end, container, label
          )));
        }
        let source = fp.descendants("Source").into_iter().next().ok_or_else(|| {
          FundError::ParseError(format!("Fiscal period ending {} has no <Source>", fp_end))
        })?;
        let source_date = parse_date(source.require_attr("Date")?)?;
        let mut meta = PeriodMeta {
          period: label,
          end_date: fp_end,
          fiscal_year: parse_i32_attr(fp, "FiscalYear")?,
          period_number: None,
          date_10k: None,
          date_10q: None,
        };
        match period {
          ReportPeriod::Annual => meta.date_10k = Some(source_date),
          ReportPeriod::Quarter => {
            meta.date_10q = Some(source_date);
            meta.period_number = Some(parse_i32_attr(fp, "FiscalPeriodNumber")?);
          }
        }
        let mut record = T::default();
        record.apply_meta(&meta);
        for statement in fp.children_named("Statement") {
          if statement.attr("Type") != Some(T::CODE.as_str()) {
            continue;
          }
          for line in statement.children_named("lineItem") {
            let code = line.require_attr("coaCode")?.to_lowercase();
            let value = line.parse_f64_text()?;
            if !record.set_item(&code, value) {
              debug!("Ignoring unknown COA code '{}' in {} statement", code, T::CODE);
            }
          }
        }
        out.push(record);
      }
    }
    Ok(out)
  }

  /// Chart-of-accounts mapping entries, optionally restricted to one
  /// statement type.
  pub fn map_items(
    &self,
    statement: Option<StatementCode>,
  ) -> Result<Vec<StatementMapItem>, FundError> {
    let doc = self.reports.statements()?;
    let mut out = Vec::new();
    for coa_map in doc.descendants("COAMap") {
      for item in &coa_map.children {
        let statement_type: StatementCode = item.require_attr("statementType")?.parse()?;
        if let Some(wanted) = statement {
          if statement_type != wanted {
            continue;
          }
        }
        out.push(StatementMapItem {
          coa_item: item.require_attr("coaItem")?.to_string(),
          map_item: item.require_text()?.to_string(),
          statement_type,
          line_id: parse_i32_attr(item, "lineID")?,
        });
      }
    }
    Ok(out)
  }

  /// Company identity fields from the statements document.
  pub fn company_info(&self) -> Result<CompanyInfo, FundError> {
    let doc = self.reports.statements()?;
    let mut info = CompanyInfo::default();
    for coid in doc.path(&["CoIDs", "CoID"]) {
      match coid.attr("Type") {
        Some("CompanyName") => info.company_name = coid.text().map(str::to_string),
        Some("CIKNo") => info.cik = coid.text().map(str::to_string),
        Some("IRSNo") => info.irs = coid.text().map(str::to_string),
        _ => {}
      }
    }
    for issue_id in doc.path(&["Issues", "Issue", "IssueID"]) {
      if issue_id.attr("Type") == Some("Ticker") {
        info.ticker = issue_id.text().map(str::to_string);
      }
    }
    if let Some(exchange) = doc.path(&["Issues", "Issue", "Exchange"]).last() {
      info.exchange = exchange.text().map(str::to_string);
      info.exchange_code = exchange.attr("Code").map(str::to_string);
    }
    Ok(info)
  }

  // --- Financial summary series ---

  /// Announced dividends, or `Absent` when the document has no
  /// dividends section at all.
  pub fn dividends(&self) -> Result<SectionData<Vec<Dividend>>, FundError> {
    let Some((currency, section)) = self.summary_section("Dividends")? else {
      return Ok(SectionData::Absent);
    };
    let mut out = Vec::new();
    for node in &section.children {
      out.push(Dividend {
        dividend_type: node.require_attr("type")?.to_string(),
        ex_date: parse_date(node.require_attr("exDate")?)?,
        record_date: parse_date(node.require_attr("recordDate")?)?,
        pay_date: parse_date(node.require_attr("payDate")?)?,
        declaration_date: parse_date(node.require_attr("declarationDate")?)?,
        currency: currency.to_string(),
        value: node.parse_f64_text()?,
      });
    }
    Ok(SectionData::Present(out))
  }

  /// Dividend per share series. Both filters must match when given.
  pub fn dividends_per_share(
    &self,
    report_type: Option<&str>,
    period: Option<&str>,
  ) -> Result<SectionData<Vec<DividendPerShare>>, FundError> {
    let Some((currency, section)) = self.summary_section("DividendPerShares")? else {
      return Ok(SectionData::Absent);
    };
    let mut out = Vec::new();
    for node in &section.children {
      if !matches_filters(node, report_type, period)? {
        continue;
      }
      out.push(DividendPerShare {
        as_of_date: parse_date(node.require_attr("asofDate")?)?,
        report_type: node.require_attr("reportType")?.to_string(),
        period: node.require_attr("period")?.to_string(),
        currency: currency.to_string(),
        value: node.parse_f64_text()?,
      });
    }
    Ok(SectionData::Present(out))
  }

  /// Total revenue series. Both filters must match when given.
  pub fn revenues(
    &self,
    report_type: Option<&str>,
    period: Option<&str>,
  ) -> Result<SectionData<Vec<Revenue>>, FundError> {
    let Some((currency, section)) = self.summary_section("TotalRevenues")? else {
      return Ok(SectionData::Absent);
    };
    let mut out = Vec::new();
    for node in &section.children {
      if !matches_filters(node, report_type, period)? {
        continue;
      }
      out.push(Revenue {
        as_of_date: parse_date(node.require_attr("asofDate")?)?,
        report_type: node.require_attr("reportType")?.to_string(),
        period: node.require_attr("period")?.to_string(),
        currency: currency.to_string(),
        revenue: node.parse_f64_text()?,
      });
    }
    Ok(SectionData::Present(out))
  }

  /// Earnings per share series. Both filters must match when given.
  pub fn eps(
    &self,
    report_type: Option<&str>,
    period: Option<&str>,
  ) -> Result<SectionData<Vec<EarningsPerShare>>, FundError> {
    let Some((currency, section)) = self.summary_section("EPSs")? else {
      return Ok(SectionData::Absent);
    };
    let mut out = Vec::new();
    for node in &section.children {
      if !matches_filters(node, report_type, period)? {
        continue;
      }
      out.push(EarningsPerShare {
        as_of_date: parse_date(node.require_attr("asofDate")?)?,
        report_type: node.require_attr("reportType")?.to_string(),
        period: node.require_attr("period")?.to_string(),
        currency: currency.to_string(),
        eps: node.parse_f64_text()?,
      });
    }
    Ok(SectionData::Present(out))
  }

  fn summary_section(&self, name: &str) -> Result<Option<(&str, &XmlNode)>, FundError> {
    let doc = self.reports.fin_summary()?;
    match doc.find(name) {
      Some(section) => Ok(Some((section.require_attr("currency")?, section))),
      None => Ok(None),
    }
  }

  // --- Snapshot report ---

  /// Consensus analyst estimates.
  pub fn analyst_forecast(&self) -> Result<AnalystForecast, FundError> {
    let doc = self.reports.snapshot()?;
    let mut forecast = AnalystForecast::default();
    for data in doc.descendants("ForecastData") {
      for ratio in data.children_named("Ratio") {
        let field = camel_to_snake(ratio.require_attr("FieldName")?);
        let value_node = ratio.find("Value").ok_or_else(|| {
          FundError::ParseError(format!("Forecast ratio '{}' has no <Value>", field))
        })?;
        let value = Some(value_node.parse_f64_text()?);
        match field.as_str() {
          "cons_recom" => forecast.cons_recom = value,
          "target_price" => forecast.target_price = value,
          "proj_lt_growth_rate" => forecast.proj_lt_growth_rate = value,
          "proj_pe" => forecast.proj_pe = value,
          "proj_sales" => forecast.proj_sales = value,
          "proj_sales_q" => forecast.proj_sales_q = value,
          "proj_eps" => forecast.proj_eps = value,
          "proj_epsq" => forecast.proj_epsq = value,
          "proj_profit" => forecast.proj_profit = value,
          "proj_dps" => forecast.proj_dps = value,
          other => debug!("Ignoring unknown forecast field '{}'", other),
        }
      }
    }
    Ok(forecast)
  }

  /// Valuation and performance ratios. Ratio elements typed "D" carry
  /// a date; everything else is numeric.
  pub fn ratio_snapshot(&self) -> Result<RatioSnapshot, FundError> {
    let doc = self.reports.snapshot()?;
    let mut ratios = RatioSnapshot::default();
    for section in doc.descendants("Ratios") {
      for ratio in section.path(&["Group", "Ratio"]) {
        let field = ratio.require_attr("FieldName")?.to_lowercase();
        if ratio.require_attr("Type")? == "D" {
          let date = parse_date(ratio.require_text()?)?;
          if field == "pdate" {
            ratios.pdate = Some(date);
          } else {
            debug!("Ignoring unknown date ratio '{}'", field);
          }
          continue;
        }
        let value = Some(ratio.parse_f64_text()?);
        match field.as_str() {
          "nprice" => ratios.nprice = value,
          "nhig" => ratios.nhig = value,
          "nlow" => ratios.nlow = value,
          "vol10davg" => ratios.vol10davg = value,
          "ev" => ratios.ev = value,
          "mktcap" => ratios.mktcap = value,
          "ttmrev" => ratios.ttmrev = value,
          "ttmebitd" => ratios.ttmebitd = value,
          "ttmniac" => ratios.ttmniac = value,
          "ttmepsxclx" => ratios.ttmepsxclx = value,
          "ttmrevps" => ratios.ttmrevps = value,
          "qbvps" => ratios.qbvps = value,
          "qcshps" => ratios.qcshps = value,
          "ttmcfshr" => ratios.ttmcfshr = value,
          "ttmdivshr" => ratios.ttmdivshr = value,
          "ttmgrosmgn" => ratios.ttmgrosmgn = value,
          "ttmroepct" => ratios.ttmroepct = value,
          "ttmpr2rev" => ratios.ttmpr2rev = value,
          "peexclxor" => ratios.peexclxor = value,
          "price2bk" => ratios.price2bk = value,
          "employees" => ratios.employees = value,
          other => debug!("Ignoring unknown ratio field '{}'", other),
        }
      }
    }
    Ok(ratios)
  }

  // --- Analyst estimates ---

  /// Forward-year consensus estimates, one row per statistic per
  /// fiscal period per item.
  pub fn fy_estimates(&self) -> Result<Vec<ForwardYear>, FundError> {
    let doc = self.reports.resc()?;
    let mut out = Vec::new();
    for estimate in doc.descendants("FYEstimate") {
      let item = estimate.require_attr("type")?;
      let unit = estimate.require_attr("unit")?;
      for fp in estimate.descendants("FYPeriod") {
        let period_type = fp.require_attr("periodType")?;
        let fiscal_year = parse_i32_attr(fp, "fYear")?;
        let end_month = parse_i32_attr(fp, "endMonth")?;
        let end_cal_year = parse_i32_attr(fp, "endCalYear")?;
        for cons in fp.descendants("ConsEstimate") {
          let est_type: EstimateStatistic = cons.require_attr("type")?.parse()?;
          let value_node = cons.children.first().ok_or_else(|| {
            FundError::ParseError(format!(
              "Consensus estimate {:?} for FY{} has no value element",
              est_type, fiscal_year
            ))
          })?;
          out.push(ForwardYear {
            kind: ForwardYearKind::Estimate,
            item: item.to_string(),
            unit: unit.to_string(),
            period_type: period_type.to_string(),
            fiscal_year,
            end_month,
            end_cal_year,
            value: value_node.parse_f64_text()?,
            est_type: Some(est_type),
            updated: None,
          });
        }
      }
    }
    Ok(out)
  }

  /// Forward-year reported actuals, one row per fiscal period per item.
  pub fn fy_actuals(&self) -> Result<Vec<ForwardYear>, FundError> {
    let doc = self.reports.resc()?;
    let mut out = Vec::new();
    for actual in doc.descendants("FYActual") {
      let item = actual.require_attr("type")?;
      let unit = actual.require_attr("unit")?;
      for fp in actual.descendants("FYPeriod") {
        let fiscal_year = parse_i32_attr(fp, "fYear")?;
        let value_node = fp.children.first().ok_or_else(|| {
          FundError::ParseError(format!("Actual for FY{} has no value element", fiscal_year))
        })?;
        out.push(ForwardYear {
          kind: ForwardYearKind::Actual,
          item: item.to_string(),
          unit: unit.to_string(),
          period_type: fp.require_attr("periodType")?.to_string(),
          fiscal_year,
          end_month: parse_i32_attr(fp, "endMonth")?,
          end_cal_year: parse_i32_attr(fp, "endCalYear")?,
          value: value_node.parse_f64_text()?,
          est_type: None,
          updated: Some(parse_datetime_utc(value_node.require_attr("updated")?)?),
        });
      }
    }
    Ok(out)
  }

  // --- Ownership ---

  /// Ownership report: issuer identity plus one row per owner. An
  /// owner's as-of date is taken from the first of its child elements
  /// that carries attributes; later dated fields do not override it.
  pub fn ownership_report(&self) -> Result<OwnershipReport, FundError> {
    let doc = self.reports.ownership()?;
    let isin = doc.find_one("ISIN")?.require_text()?.to_string();
    let float_node = doc.find_one("floatShares")?;
    let company = OwnershipCompany {
      isin,
      float_shares: float_node.parse_i64_text()?,
      as_of_date: parse_date(float_node.require_attr("asofDate")?)?,
    };
    let mut details = Vec::new();
    for owner in doc.children_named("Owner") {
      let mut d = OwnershipDetails {
        owner_id: owner.require_attr("ownerId")?.to_string(),
        ..Default::default()
      };
      for field in &owner.children {
        if d.as_of_date.is_none() && !field.attrs.is_empty() {
          d.as_of_date = Some(parse_date(field.require_attr("asofDate")?)?);
        }
        match field.name.as_str() {
          "type" => d.owner_type = field.text().map(str::to_string),
          "name" => d.name = field.text().map(str::to_string),
          "quantity" => d.quantity = Some(field.parse_f64_text()?),
          "currency" => d.currency = field.text().map(str::to_string),
          other => debug!("Ignoring unknown owner field <{}>", other),
        }
      }
      details.push(d);
    }
    Ok(OwnershipReport { company, ownership_details: details })
  }
}

fn matches_filters(
  node: &XmlNode,
  report_type: Option<&str>,
  period: Option<&str>,
) -> Result<bool, FundError> {
  if let Some(wanted) = report_type {
    if node.require_attr("reportType")? != wanted {
      return Ok(false);
    }
  }
  if let Some(wanted) = period {
    if node.require_attr("period")? != wanted {
      return Ok(false);
    }
  }
  Ok(true)
}

fn parse_i32_attr(node: &XmlNode, name: &str) -> Result<i32, FundError> {
  let raw = node.require_attr(name)?;
  raw.trim().parse::<i32>().map_err(|_| {
    FundError::ParseError(format!("<{}> attribute '{}': expected an integer, got '{}'", node.name, name, raw))
  })
}

/// Parse a date given either as a plain date or as a full timestamp.
pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, FundError> {
  let t = s.trim();
  if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
    return Ok(d);
  }
  if let Ok(dt) = NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S") {
    return Ok(dt.date());
  }
  Err(FundError::ParseError(format!("Cannot parse date '{}'", s)))
}

pub(crate) fn parse_datetime_utc(s: &str) -> Result<DateTime<Utc>, FundError> {
  let t = s.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
    return Ok(dt.with_timezone(&Utc));
  }
  if let Ok(ndt) = NaiveDateTime::parse_from_str(t, "%Y-%m-%dT%H:%M:%S") {
    return Ok(Utc.from_utc_datetime(&ndt));
  }
  Err(FundError::ParseError(format!("Cannot parse timestamp '{}'", s)))
}

/// CamelCase to snake_case, splitting at lower-to-upper boundaries and
/// before the last capital of an acronym run.
pub(crate) fn camel_to_snake(name: &str) -> String {
  let chars: Vec<char> = name.chars().collect();
  let mut out = String::with_capacity(name.len() + 4);
  for (i, &c) in chars.iter().enumerate() {
    if c.is_ascii_uppercase() && i > 0 {
      let prev_upper = chars[i - 1].is_ascii_uppercase();
      let next_lower = chars.get(i + 1).map(|n| n.is_ascii_lowercase()).unwrap_or(false);
      if chars[i - 1].is_ascii_lowercase() || (prev_upper && next_lower) {
        out.push('_');
      }
    }
    out.push(c.to_ascii_lowercase());
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::client::FundamentalsClient;
  use crate::conn_mock::MockConnection;
  use crate::contract::Contract;
  use crate::data::ReportKind;
  use std::sync::Arc;

  const FIN_STATEMENTS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ReportFinancialStatements>
  <CoIDs>
    <CoID Type="CompanyName">Apple Inc.</CoID>
    <CoID Type="CIKNo">0000320193</CoID>
    <CoID Type="IRSNo">942404110</CoID>
  </CoIDs>
  <Issues>
    <Issue ID="1">
      <IssueID Type="Ticker">AAPL</IssueID>
      <Exchange Code="NASD">NASDAQ</Exchange>
    </Issue>
  </Issues>
  <FinancialStatements>
    <COAMap>
      <mapItem coaItem="SREV" statementType="INC" lineID="1">Revenue</mapItem>
      <mapItem coaItem="RTLR" statementType="INC" lineID="2">Total Revenue</mapItem>
      <mapItem coaItem="NINC" statementType="INC" lineID="3">Net Income</mapItem>
      <mapItem coaItem="ATOT" statementType="BAL" lineID="10">Total Assets</mapItem>
      <mapItem coaItem="OTLO" statementType="CAS" lineID="20">Cash from Operating Activities</mapItem>
    </COAMap>
    <AnnualPeriods>
      <FiscalPeriod Type="Annual" EndDate="2022-09-24" FiscalYear="2022">
        <Statement Type="INC">
          <FPHeader><Source Date="2022-10-28">10-K</Source></FPHeader>
          <lineItem coaCode="SREV">394328.0</lineItem>
          <lineItem coaCode="RTLR">394328.0</lineItem>
          <lineItem coaCode="NINC">99803.0</lineItem>
        </Statement>
        <Statement Type="BAL">
          <FPHeader><Source Date="2022-10-28">10-K</Source></FPHeader>
          <lineItem coaCode="ATOT">352755.0</lineItem>
        </Statement>
      </FiscalPeriod>
      <FiscalPeriod Type="Annual" EndDate="2023-09-30" FiscalYear="2023">
        <Statement Type="INC">
          <FPHeader><Source Date="2023-11-03">10-K</Source></FPHeader>
          <lineItem coaCode="SREV">383285.0</lineItem>
          <lineItem coaCode="RTLR">383285.0</lineItem>
          <lineItem coaCode="NINC">96995.0</lineItem>
          <lineItem coaCode="XYZQ">1.0</lineItem>
        </Statement>
        <Statement Type="CAS">
          <FPHeader><Source Date="2023-11-03">10-K</Source></FPHeader>
          <lineItem coaCode="OTLO">110543.0</lineItem>
        </Statement>
      </FiscalPeriod>
    </AnnualPeriods>
    <InterimPeriods>
      <FiscalPeriod Type="Interim" EndDate="2024-03-30" FiscalYear="2024" FiscalPeriodNumber="2">
        <Statement Type="INC">
          <FPHeader><Source Date="2024-05-03">10-Q</Source></FPHeader>
          <lineItem coaCode="SREV">90753.0</lineItem>
        </Statement>
      </FiscalPeriod>
    </InterimPeriods>
  </FinancialStatements>
</ReportFinancialStatements>"#;

  const FIN_SUMMARY: &str = r#"<FinancialSummary>
  <TotalRevenues currency="USD">
    <TotalRevenue asofDate="2023-09-30" reportType="A" period="12M">383285000000</TotalRevenue>
    <TotalRevenue asofDate="2024-03-30" reportType="TTM" period="12M">381623000000</TotalRevenue>
    <TotalRevenue asofDate="2024-03-30" reportType="R" period="3M">90753000000</TotalRevenue>
  </TotalRevenues>
  <DividendPerShares currency="USD">
    <DividendPerShare asofDate="2023-09-30" reportType="A" period="12M">0.94</DividendPerShare>
    <DividendPerShare asofDate="2024-03-30" reportType="TTM" period="12M">0.96</DividendPerShare>
  </DividendPerShares>
  <Dividends currency="USD">
    <Dividend type="CD" exDate="2024-05-10" recordDate="2024-05-13" payDate="2024-05-16" declarationDate="2024-05-02">0.25</Dividend>
    <Dividend type="CD" exDate="2024-02-09" recordDate="2024-02-12" payDate="2024-02-15" declarationDate="2024-02-01">0.24</Dividend>
  </Dividends>
  <EPSs currency="USD">
    <EPS asofDate="2023-09-30" reportType="A" period="12M">6.13</EPS>
    <EPS asofDate="2024-03-30" reportType="TTM" period="12M">6.43</EPS>
  </EPSs>
</FinancialSummary>"#;

  const SNAPSHOT: &str = r#"<ReportSnapshot>
  <Ratios PriceCurrency="USD" ReportingCurrency="USD" ExchangeRate="1.0">
    <Group ID="Price and Volume">
      <Ratio FieldName="NPRICE" Type="N">183.05</Ratio>
      <Ratio FieldName="NHIG" Type="N">199.62</Ratio>
      <Ratio FieldName="PDATE" Type="D">2024-05-10T00:00:00</Ratio>
      <Ratio FieldName="VOL10DAVG" Type="N">48.53</Ratio>
    </Group>
    <Group ID="Income Statement">
      <Ratio FieldName="MKTCAP" Type="N">2807333.0</Ratio>
      <Ratio FieldName="TTMREV" Type="N">381623.0</Ratio>
      <Ratio FieldName="NEWFIELD" Type="N">1.0</Ratio>
    </Group>
  </Ratios>
  <ForecastData ConsensusType="Mean" CurFiscalYear="2024">
    <Ratio FieldName="ConsRecom" Type="N"><Value PeriodType="CURR">2.0</Value></Ratio>
    <Ratio FieldName="TargetPrice" Type="N"><Value PeriodType="CURR">200.35</Value></Ratio>
    <Ratio FieldName="ProjLTGrowthRate" Type="N"><Value PeriodType="CURR">10.4</Value></Ratio>
    <Ratio FieldName="ProjEPS" Type="N"><Value PeriodType="CURR">6.57</Value></Ratio>
    <Ratio FieldName="ProjEPSQ" Type="N"><Value PeriodType="CURR">1.32</Value></Ratio>
  </ForecastData>
</ReportSnapshot>"#;

  const RESC: &str = r#"<REarnEstCons>
  <Actuals>
    <FYActuals>
      <FYActual type="EPS" unit="U">
        <FYPeriod fYear="2022" endMonth="9" endCalYear="2022" periodType="A">
          <ActValue updated="2022-10-27T21:30:00">6.11</ActValue>
        </FYPeriod>
        <FYPeriod fYear="2023" endMonth="9" endCalYear="2023" periodType="A">
          <ActValue updated="2023-11-02T21:30:00">6.13</ActValue>
        </FYPeriod>
      </FYActual>
    </FYActuals>
  </Actuals>
  <ConsEstimates>
    <FYEstimates>
      <FYEstimate type="EPS" unit="U">
        <FYPeriod fYear="2024" endMonth="9" endCalYear="2024" periodType="A">
          <ConsEstimate type="High"><ConsValue dateType="CURR">7.01</ConsValue></ConsEstimate>
          <ConsEstimate type="Low"><ConsValue dateType="CURR">6.25</ConsValue></ConsEstimate>
          <ConsEstimate type="Mean"><ConsValue dateType="CURR">6.58</ConsValue></ConsEstimate>
        </FYPeriod>
      </FYEstimate>
    </FYEstimates>
  </ConsEstimates>
</REarnEstCons>"#;

  const OWNERSHIP: &str = r#"<OwnershipDetails>
  <ISIN>US0378331005</ISIN>
  <floatShares asofDate="2024-04-30">15334082000</floatShares>
  <Owner ownerId="0000102909">
    <type>Institution</type>
    <name>Vanguard Group Inc</name>
    <quantity asofDate="2024-03-31">1310120411</quantity>
    <currency>USD</currency>
  </Owner>
  <Owner ownerId="0000093751">
    <name>State Street Corp</name>
    <quantity asofDate="2024-02-14">577982870</quantity>
  </Owner>
</OwnershipDetails>"#;

  fn parser_with(reports: &[(ReportKind, &str)]) -> FundamentalParser {
    let conn = MockConnection::new();
    for (kind, body) in reports {
      conn.set_report(*kind, *body);
    }
    let client = FundamentalsClient::new(Arc::new(conn), Contract::stock("AAPL")).unwrap();
    FundamentalParser::new(XmlReportCache::new(client))
  }

  fn statements_parser() -> FundamentalParser {
    parser_with(&[(ReportKind::ReportsFinStatements, FIN_STATEMENTS)])
  }

  #[test]
  fn test_annual_income_statements() {
    let parser = statements_parser();
    let inc = parser.income_statements(ReportPeriod::Annual, None).unwrap();
    assert_eq!(inc.len(), 2);
    let fy2022 = &inc[0];
    assert_eq!(fy2022.period, Some(StatementPeriod::Annual));
    assert_eq!(fy2022.end_date, NaiveDate::from_ymd_opt(2022, 9, 24));
    assert_eq!(fy2022.fiscal_year, Some(2022));
    assert_eq!(fy2022.date_10k, NaiveDate::from_ymd_opt(2022, 10, 28));
    assert_eq!(fy2022.period_number, None);
    assert_eq!(fy2022.srev, Some(394328.0));
    assert_eq!(fy2022.ninc, Some(99803.0));
    let fy2023 = &inc[1];
    assert_eq!(fy2023.fiscal_year, Some(2023));
    assert_eq!(fy2023.rtlr, Some(383285.0));
    // Unknown COA codes are skipped, not stored.
    assert_eq!(fy2023.item("xyzq"), None);
  }

  #[test]
  fn test_statement_count_matches_fiscal_periods() {
    let parser = statements_parser();
    // Every annual fiscal period yields one record per statement type,
    // even when the period carries no lines for that statement.
    let bal = parser.balance_sheets(ReportPeriod::Annual, None).unwrap();
    assert_eq!(bal.len(), 2);
    assert_eq!(bal[0].atot, Some(352755.0));
    assert_eq!(bal[1].atot, None);
    let cas = parser.cash_flows(ReportPeriod::Annual, None).unwrap();
    assert_eq!(cas.len(), 2);
    assert_eq!(cas[0].otlo, None);
    assert_eq!(cas[1].otlo, Some(110543.0));
    assert_eq!(cas[0].end_date, NaiveDate::from_ymd_opt(2022, 9, 24));
  }

  #[test]
  fn test_end_date_filter() {
    let parser = statements_parser();
    let end = NaiveDate::from_ymd_opt(2023, 9, 30).unwrap();
    let inc = parser.income_statements(ReportPeriod::Annual, Some(end)).unwrap();
    assert_eq!(inc.len(), 1);
    assert_eq!(inc[0].fiscal_year, Some(2023));
    let none = parser
      .income_statements(ReportPeriod::Annual, NaiveDate::from_ymd_opt(1999, 1, 1))
      .unwrap();
    assert!(none.is_empty());
  }

  #[test]
  fn test_quarterly_metadata() {
    let parser = statements_parser();
    let inc = parser.income_statements(ReportPeriod::Quarter, None).unwrap();
    assert_eq!(inc.len(), 1);
    assert_eq!(inc[0].period, Some(StatementPeriod::Interim));
    assert_eq!(inc[0].period_number, Some(2));
    assert_eq!(inc[0].date_10q, NaiveDate::from_ymd_opt(2024, 5, 3));
    assert_eq!(inc[0].date_10k, None);
    assert_eq!(inc[0].srev, Some(90753.0));
  }

  #[test]
  fn test_mislabelled_period_rejected() {
    let doc = r#"<R><FinancialStatements><AnnualPeriods>
      <FiscalPeriod Type="Interim" EndDate="2023-09-30" FiscalYear="2023">
        <Statement Type="INC"><FPHeader><Source Date="2023-11-03">10-K</Source></FPHeader></Statement>
      </FiscalPeriod>
    </AnnualPeriods></FinancialStatements></R>"#;
    let parser = parser_with(&[(ReportKind::ReportsFinStatements, doc)]);
    let err = parser.income_statements(ReportPeriod::Annual, None).unwrap_err();
    assert!(matches!(err, FundError::ParseError(_)));
  }

  #[test]
  fn test_map_items_filter_partitions_total() {
    let parser = statements_parser();
    let all = parser.map_items(None).unwrap();
    assert_eq!(all.len(), 5);
    let inc = parser.map_items(Some(StatementCode::Inc)).unwrap();
    let bal = parser.map_items(Some(StatementCode::Bal)).unwrap();
    let cas = parser.map_items(Some(StatementCode::Cas)).unwrap();
    assert_eq!(inc.len() + bal.len() + cas.len(), all.len());
    assert_eq!(inc[0].coa_item, "SREV");
    assert_eq!(inc[0].map_item, "Revenue");
    assert_eq!(inc[0].line_id, 1);
    assert_eq!(bal[0].statement_type, StatementCode::Bal);
  }

  #[test]
  fn test_company_info() {
    let parser = statements_parser();
    let info = parser.company_info().unwrap();
    assert_eq!(info.ticker.as_deref(), Some("AAPL"));
    assert_eq!(info.company_name.as_deref(), Some("Apple Inc."));
    assert_eq!(info.cik.as_deref(), Some("0000320193"));
    assert_eq!(info.irs.as_deref(), Some("942404110"));
    assert_eq!(info.exchange.as_deref(), Some("NASDAQ"));
    assert_eq!(info.exchange_code.as_deref(), Some("NASD"));
  }

  fn summary_parser() -> FundamentalParser {
    parser_with(&[(ReportKind::ReportsFinSummary, FIN_SUMMARY)])
  }

  #[test]
  fn test_dividends_carry_parent_currency() {
    let parser = summary_parser();
    let dividends = parser.dividends().unwrap().into_option().unwrap();
    assert_eq!(dividends.len(), 2);
    assert_eq!(dividends[0].currency, "USD");
    assert_eq!(dividends[0].value, 0.25);
    assert_eq!(dividends[0].ex_date, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    assert_eq!(dividends[1].declaration_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
  }

  #[test]
  fn test_revenue_filters_are_conjunctive() {
    let parser = summary_parser();
    let all = parser.revenues(None, None).unwrap().into_option().unwrap();
    assert_eq!(all.len(), 3);
    let ttm = parser.revenues(Some("TTM"), None).unwrap().into_option().unwrap();
    assert_eq!(ttm.len(), 1);
    assert_eq!(ttm[0].revenue, 381623000000.0);
    let ttm_3m = parser.revenues(Some("TTM"), Some("3M")).unwrap().into_option().unwrap();
    assert!(ttm_3m.is_empty());
    let q = parser.revenues(Some("R"), Some("3M")).unwrap().into_option().unwrap();
    assert_eq!(q.len(), 1);
  }

  #[test]
  fn test_eps_and_dps_series() {
    let parser = summary_parser();
    let eps = parser.eps(Some("A"), Some("12M")).unwrap().into_option().unwrap();
    assert_eq!(eps.len(), 1);
    assert_eq!(eps[0].eps, 6.13);
    assert_eq!(eps[0].as_of_date, NaiveDate::from_ymd_opt(2023, 9, 30).unwrap());
    let dps = parser.dividends_per_share(None, None).unwrap().into_option().unwrap();
    assert_eq!(dps.len(), 2);
    assert_eq!(dps[1].value, 0.96);
  }

  #[test]
  fn test_missing_section_is_absent() {
    let parser = parser_with(&[(
      ReportKind::ReportsFinSummary,
      r#"<FinancialSummary><TotalRevenues currency="USD"/></FinancialSummary>"#,
    )]);
    assert!(parser.dividends().unwrap().is_absent());
    assert!(parser.eps(None, None).unwrap().is_absent());
    assert!(parser.dividends_per_share(None, None).unwrap().is_absent());
    // Present but empty is not the same as absent.
    let revenues = parser.revenues(None, None).unwrap();
    assert!(revenues.is_present());
    assert!(revenues.into_option().unwrap().is_empty());
  }

  fn snapshot_parser() -> FundamentalParser {
    parser_with(&[(ReportKind::ReportSnapshot, SNAPSHOT)])
  }

  #[test]
  fn test_analyst_forecast() {
    let parser = snapshot_parser();
    let forecast = parser.analyst_forecast().unwrap();
    assert_eq!(forecast.cons_recom, Some(2.0));
    assert_eq!(forecast.target_price, Some(200.35));
    assert_eq!(forecast.proj_lt_growth_rate, Some(10.4));
    assert_eq!(forecast.proj_eps, Some(6.57));
    assert_eq!(forecast.proj_epsq, Some(1.32));
    assert_eq!(forecast.proj_sales, None);
  }

  #[test]
  fn test_ratio_snapshot_with_date_field() {
    let parser = snapshot_parser();
    let ratios = parser.ratio_snapshot().unwrap();
    assert_eq!(ratios.nprice, Some(183.05));
    assert_eq!(ratios.nhig, Some(199.62));
    assert_eq!(ratios.vol10davg, Some(48.53));
    assert_eq!(ratios.mktcap, Some(2807333.0));
    assert_eq!(ratios.ttmrev, Some(381623.0));
    assert_eq!(ratios.pdate, NaiveDate::from_ymd_opt(2024, 5, 10));
    assert_eq!(ratios.nlow, None);
  }

  fn resc_parser() -> FundamentalParser {
    parser_with(&[(ReportKind::Resc, RESC)])
  }

  #[test]
  fn test_fy_estimates() {
    let parser = resc_parser();
    let estimates = parser.fy_estimates().unwrap();
    assert_eq!(estimates.len(), 3);
    for row in &estimates {
      assert_eq!(row.kind, ForwardYearKind::Estimate);
      assert_eq!(row.item, "EPS");
      assert_eq!(row.fiscal_year, 2024);
      assert!(row.updated.is_none());
    }
    assert_eq!(estimates[0].est_type, Some(EstimateStatistic::High));
    assert_eq!(estimates[0].value, 7.01);
    assert_eq!(estimates[2].est_type, Some(EstimateStatistic::Mean));
    assert_eq!(estimates[2].value, 6.58);
  }

  #[test]
  fn test_fy_actuals() {
    let parser = resc_parser();
    let actuals = parser.fy_actuals().unwrap();
    assert_eq!(actuals.len(), 2);
    assert_eq!(actuals[0].kind, ForwardYearKind::Actual);
    assert_eq!(actuals[0].fiscal_year, 2022);
    assert_eq!(actuals[0].value, 6.11);
    assert_eq!(actuals[0].est_type, None);
    let updated = actuals[1].updated.unwrap();
    assert_eq!(updated, Utc.with_ymd_and_hms(2023, 11, 2, 21, 30, 0).unwrap());
  }

  #[test]
  fn test_ownership_report() {
    let parser = parser_with(&[(ReportKind::ReportsOwnership, OWNERSHIP)]);
    let report = parser.ownership_report().unwrap();
    assert_eq!(report.company.isin, "US0378331005");
    assert_eq!(report.company.float_shares, 15334082000);
    assert_eq!(report.company.as_of_date, NaiveDate::from_ymd_opt(2024, 4, 30).unwrap());
    assert_eq!(report.ownership_details.len(), 2);
    let vanguard = &report.ownership_details[0];
    assert_eq!(vanguard.owner_id, "0000102909");
    assert_eq!(vanguard.owner_type.as_deref(), Some("Institution"));
    assert_eq!(vanguard.name.as_deref(), Some("Vanguard Group Inc"));
    assert_eq!(vanguard.quantity, Some(1310120411.0));
    assert_eq!(vanguard.currency.as_deref(), Some("USD"));
    // The as-of date comes from the first attribute-bearing child.
    assert_eq!(vanguard.as_of_date, NaiveDate::from_ymd_opt(2024, 3, 31));
    let state_street = &report.ownership_details[1];
    assert_eq!(state_street.owner_type, None);
    assert_eq!(state_street.as_of_date, NaiveDate::from_ymd_opt(2024, 2, 14));
  }

  #[test]
  fn test_camel_to_snake() {
    assert_eq!(camel_to_snake("ConsRecom"), "cons_recom");
    assert_eq!(camel_to_snake("TargetPrice"), "target_price");
    assert_eq!(camel_to_snake("ProjLTGrowthRate"), "proj_lt_growth_rate");
    assert_eq!(camel_to_snake("ProjPE"), "proj_pe");
    assert_eq!(camel_to_snake("ProjEPSQ"), "proj_epsq");
    assert_eq!(camel_to_snake("ProjSalesQ"), "proj_sales_q");
    assert_eq!(camel_to_snake("ProjDPS"), "proj_dps");
  }

  #[test]
  fn test_parse_date_accepts_timestamps() {
    assert_eq!(parse_date("2024-05-10").unwrap(), NaiveDate::from_ymd_opt(2024, 5, 10).unwrap());
    assert_eq!(
      parse_date("2024-05-10T00:00:00").unwrap(),
      NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    );
    assert!(parse_date("05/10/2024").is_err());
  }
}
