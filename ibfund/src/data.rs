// ibfund/src/data.rs
// Typed records for company fundamental data

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::base::FundError;

// --- Report kinds and statement enums ---

/// The fundamental report kinds understood by the TWS endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
  /// Detailed financial statements. TWS string: "ReportsFinStatements"
  ReportsFinStatements,
  /// Financial summary time series. TWS string: "ReportsFinSummary"
  ReportsFinSummary,
  /// Company overview, ratios, forecast. TWS string: "ReportSnapshot"
  ReportSnapshot,
  /// Analyst estimates. TWS string: "RESC"
  Resc,
  /// Company ownership. TWS string: "ReportsOwnership"
  ReportsOwnership,
  /// Corporate calendar. Documented to return an empty response on this
  /// endpoint; requesting it always fails with a no-data error.
  CalendarReport,
}

impl ReportKind {
  /// The string representation required by the TWS API.
  pub fn as_tws_str(&self) -> &'static str {
    match self {
      ReportKind::ReportsFinStatements => "ReportsFinStatements",
      ReportKind::ReportsFinSummary => "ReportsFinSummary",
      ReportKind::ReportSnapshot => "ReportSnapshot",
      ReportKind::Resc => "RESC",
      ReportKind::ReportsOwnership => "ReportsOwnership",
      ReportKind::CalendarReport => "CalendarReport",
    }
  }
}

impl fmt::Display for ReportKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_tws_str())
  }
}

impl FromStr for ReportKind {
  type Err = FundError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "ReportsFinStatements" => Ok(ReportKind::ReportsFinStatements),
      "ReportsFinSummary" => Ok(ReportKind::ReportsFinSummary),
      "ReportSnapshot" => Ok(ReportKind::ReportSnapshot),
      "RESC" => Ok(ReportKind::Resc),
      "ReportsOwnership" => Ok(ReportKind::ReportsOwnership),
      "CalendarReport" => Ok(ReportKind::CalendarReport),
      _ => Err(FundError::InvalidParameter(format!("Unknown report kind: {}", s))),
    }
  }
}

/// Statement selector: income, balance sheet or cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementCode {
  Inc,
  Bal,
  Cas,
}

impl StatementCode {
  pub fn as_str(&self) -> &'static str {
    match self {
      StatementCode::Inc => "INC",
      StatementCode::Bal => "BAL",
      StatementCode::Cas => "CAS",
    }
  }
}

impl fmt::Display for StatementCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for StatementCode {
  type Err = FundError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "INC" => Ok(StatementCode::Inc),
      "BAL" => Ok(StatementCode::Bal),
      "CAS" => Ok(StatementCode::Cas),
      _ => Err(FundError::InvalidParameter(format!("Unknown statement code: {}", s))),
    }
  }
}

/// Request-side period selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportPeriod {
  Annual,
  Quarter,
}

impl ReportPeriod {
  pub fn as_request_str(&self) -> &'static str {
    match self {
      ReportPeriod::Annual => "annual",
      ReportPeriod::Quarter => "quarter",
    }
  }

  /// The fiscal-period label the document carries for this period type.
  pub fn statement_period(&self) -> StatementPeriod {
    match self {
      ReportPeriod::Annual => StatementPeriod::Annual,
      ReportPeriod::Quarter => StatementPeriod::Interim,
    }
  }
}

/// Record-side period label as it appears on fiscal-period nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementPeriod {
  Annual,
  Interim,
}

impl StatementPeriod {
  pub fn as_str(&self) -> &'static str {
    match self {
      StatementPeriod::Annual => "Annual",
      StatementPeriod::Interim => "Interim",
    }
  }
}

impl fmt::Display for StatementPeriod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for StatementPeriod {
  type Err = FundError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "Annual" => Ok(StatementPeriod::Annual),
      "Interim" => Ok(StatementPeriod::Interim),
      _ => Err(FundError::ParseError(format!("Unknown statement period label: {}", s))),
    }
  }
}

// --- Financial statements ---

/// Period metadata shared by the three statement variants, as read from
/// one fiscal-period node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PeriodMeta {
  pub period: StatementPeriod,
  pub end_date: NaiveDate,
  pub fiscal_year: i32,
  pub period_number: Option<i32>,
  pub date_10k: Option<NaiveDate>,
  pub date_10q: Option<NaiveDate>,
}

/// Construction hooks used by the parser to build each statement
/// variant through one generic routine.
pub(crate) trait StatementRecord: Default {
  const CODE: StatementCode;

  fn apply_meta(&mut self, meta: &PeriodMeta);

  /// Assign a line item by lower-cased COA code. Returns false if the
  /// code is not part of this statement's schema.
  fn set_item(&mut self, code: &str, value: f64) -> bool;
}

/// Income statement for one fiscal period. Line items are keyed by the
/// provider's lower-cased COA codes; absent items stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
  pub period: Option<StatementPeriod>,
  pub end_date: Option<NaiveDate>,
  pub fiscal_year: Option<i32>,
  pub period_number: Option<i32>,
  pub date_10k: Option<NaiveDate>,
  pub date_10q: Option<NaiveDate>,
  pub srev: Option<f64>,
  pub sore: Option<f64>,
  pub rtlr: Option<f64>,
  pub scor: Option<f64>,
  pub sgrp: Option<f64>,
  pub ssga: Option<f64>,
  pub erad: Option<f64>,
  pub sdpr: Option<f64>,
  pub sinn: Option<f64>,
  pub suie: Option<f64>,
  pub sooe: Option<f64>,
  pub etoe: Option<f64>,
  pub sopi: Option<f64>,
  pub snin: Option<f64>,
  pub ngla: Option<f64>,
  pub sont: Option<f64>,
  pub eibt: Option<f64>,
  pub ttax: Option<f64>,
  pub tiat: Option<f64>,
  pub cmin: Option<f64>,
  pub ceia: Option<f64>,
  pub cgap: Option<f64>,
  pub nibx: Option<f64>,
  pub stxi: Option<f64>,
  pub ninc: Option<f64>,
  pub sani: Option<f64>,
  pub ciac: Option<f64>,
  pub xnic: Option<f64>,
  pub sdaj: Option<f64>,
  pub sdni: Option<f64>,
  pub sdws: Option<f64>,
  pub sdbf: Option<f64>,
  pub ddps1: Option<f64>,
  pub vdes: Option<f64>,
}

impl IncomeStatement {
  pub fn statement_name() -> &'static str {
    "Income Statement"
  }

  /// Line item by lower-cased COA code.
  pub fn item(&self, code: &str) -> Option<f64> {
    match code {
      "srev" => self.srev,
      "sore" => self.sore,
      "rtlr" => self.rtlr,
      "scor" => self.scor,
      "sgrp" => self.sgrp,
      "ssga" => self.ssga,
      "erad" => self.erad,
      "sdpr" => self.sdpr,
      "sinn" => self.sinn,
      "suie" => self.suie,
      "sooe" => self.sooe,
      "etoe" => self.etoe,
      "sopi" => self.sopi,
      "snin" => self.snin,
      "ngla" => self.ngla,
      "sont" => self.sont,
      "eibt" => self.eibt,
      "ttax" => self.ttax,
      "tiat" => self.tiat,
      "cmin" => self.cmin,
      "ceia" => self.ceia,
      "cgap" => self.cgap,
      "nibx" => self.nibx,
      "stxi" => self.stxi,
      "ninc" => self.ninc,
      "sani" => self.sani,
      "ciac" => self.ciac,
      "xnic" => self.xnic,
      "sdaj" => self.sdaj,
      "sdni" => self.sdni,
      "sdws" => self.sdws,
      "sdbf" => self.sdbf,
      "ddps1" => self.ddps1,
      "vdes" => self.vdes,
      _ => None,
    }
  }
}

impl StatementRecord for IncomeStatement {
  const CODE: StatementCode = StatementCode::Inc;

  fn apply_meta(&mut self, meta: &PeriodMeta) {
    self.period = Some(meta.period);
    self.end_date = Some(meta.end_date);
    self.fiscal_year = Some(meta.fiscal_year);
    self.period_number = meta.period_number;
    self.date_10k = meta.date_10k;
    self.date_10q = meta.date_10q;
  }

  fn set_item(&mut self, code: &str, value: f64) -> bool {
    match code {
      "srev" => self.srev = Some(value),
      "sore" => self.sore = Some(value),
      "rtlr" => self.rtlr = Some(value),
      "scor" => self.scor = Some(value),
      "sgrp" => self.sgrp = Some(value),
      "ssga" => self.ssga = Some(value),
      "erad" => self.erad = Some(value),
      "sdpr" => self.sdpr = Some(value),
      "sinn" => self.sinn = Some(value),
      "suie" => self.suie = Some(value),
      "sooe" => self.sooe = Some(value),
      "etoe" => self.etoe = Some(value),
      "sopi" => self.sopi = Some(value),
      "snin" => self.snin = Some(value),
      "ngla" => self.ngla = Some(value),
      "sont" => self.sont = Some(value),
      "eibt" => self.eibt = Some(value),
      "ttax" => self.ttax = Some(value),
      "tiat" => self.tiat = Some(value),
      "cmin" => self.cmin = Some(value),
      "ceia" => self.ceia = Some(value),
      "cgap" => self.cgap = Some(value),
      "nibx" => self.nibx = Some(value),
      "stxi" => self.stxi = Some(value),
      "ninc" => self.ninc = Some(value),
      "sani" => self.sani = Some(value),
      "ciac" => self.ciac = Some(value),
      "xnic" => self.xnic = Some(value),
      "sdaj" => self.sdaj = Some(value),
      "sdni" => self.sdni = Some(value),
      "sdws" => self.sdws = Some(value),
      "sdbf" => self.sdbf = Some(value),
      "ddps1" => self.ddps1 = Some(value),
      "vdes" => self.vdes = Some(value),
      _ => return false,
    }
    true
  }
}

/// Balance sheet for one fiscal period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheetStatement {
  pub period: Option<StatementPeriod>,
  pub end_date: Option<NaiveDate>,
  pub fiscal_year: Option<i32>,
  pub period_number: Option<i32>,
  pub date_10k: Option<NaiveDate>,
  pub date_10q: Option<NaiveDate>,
  pub acsh: Option<f64>,
  pub acae: Option<f64>,
  pub asti: Option<f64>,
  pub scsi: Option<f64>,
  pub aacr: Option<f64>,
  pub atrc: Option<f64>,
  pub aitl: Option<f64>,
  pub appy: Option<f64>,
  pub soca: Option<f64>,
  pub atca: Option<f64>,
  pub aptc: Option<f64>,
  pub adep: Option<f64>,
  pub appn: Option<f64>,
  pub agwi: Option<f64>,
  pub aint: Option<f64>,
  pub sinv: Option<f64>,
  pub altr: Option<f64>,
  pub sola: Option<f64>,
  pub atot: Option<f64>,
  pub lapb: Option<f64>,
  pub lpba: Option<f64>,
  pub laex: Option<f64>,
  pub lstd: Option<f64>,
  pub lcld: Option<f64>,
  pub socl: Option<f64>,
  pub ltcl: Option<f64>,
  pub lltd: Option<f64>,
  pub lclo: Option<f64>,
  pub lttd: Option<f64>,
  pub stld: Option<f64>,
  pub sbdt: Option<f64>,
  pub lmin: Option<f64>,
  pub sltl: Option<f64>,
  pub ltll: Option<f64>,
  pub srpr: Option<f64>,
  pub sprs: Option<f64>,
  pub scms: Option<f64>,
  pub qpic: Option<f64>,
  pub qred: Option<f64>,
  pub qtsc: Option<f64>,
  pub qedg: Option<f64>,
  pub qugl: Option<f64>,
  pub sote: Option<f64>,
  pub qtle: Option<f64>,
  pub qtel: Option<f64>,
  pub qtco: Option<f64>,
  pub qtpo: Option<f64>,
  pub stbp: Option<f64>,
}

impl BalanceSheetStatement {
  pub fn statement_name() -> &'static str {
    "Balance Sheet Statement"
  }

  pub fn item(&self, code: &str) -> Option<f64> {
    match code {
      "acsh" => self.acsh,
      "acae" => self.acae,
      "asti" => self.asti,
      "scsi" => self.scsi,
      "aacr" => self.aacr,
      "atrc" => self.atrc,
      "aitl" => self.aitl,
      "appy" => self.appy,
      "soca" => self.soca,
      "atca" => self.atca,
      "aptc" => self.aptc,
      "adep" => self.adep,
      "appn" => self.appn,
      "agwi" => self.agwi,
      "aint" => self.aint,
      "sinv" => self.sinv,
      "altr" => self.altr,
      "sola" => self.sola,
      "atot" => self.atot,
      "lapb" => self.lapb,
      "lpba" => self.lpba,
      "laex" => self.laex,
      "lstd" => self.lstd,
      "lcld" => self.lcld,
      "socl" => self.socl,
      "ltcl" => self.ltcl,
      "lltd" => self.lltd,
      "lclo" => self.lclo,
      "lttd" => self.lttd,
      "stld" => self.stld,
      "sbdt" => self.sbdt,
      "lmin" => self.lmin,
      "sltl" => self.sltl,
      "ltll" => self.ltll,
      "srpr" => self.srpr,
      "sprs" => self.sprs,
      "scms" => self.scms,
      "qpic" => self.qpic,
      "qred" => self.qred,
      "qtsc" => self.qtsc,
      "qedg" => self.qedg,
      "qugl" => self.qugl,
      "sote" => self.sote,
      "qtle" => self.qtle,
      "qtel" => self.qtel,
      "qtco" => self.qtco,
      "qtpo" => self.qtpo,
      "stbp" => self.stbp,
      _ => None,
    }
  }
}

impl StatementRecord for BalanceSheetStatement {
  const CODE: StatementCode = StatementCode::Bal;

  fn apply_meta(&mut self, meta: &PeriodMeta) {
    self.period = Some(meta.period);
    self.end_date = Some(meta.end_date);
    self.fiscal_year = Some(meta.fiscal_year);
    self.period_number = meta.period_number;
    self.date_10k = meta.date_10k;
    self.date_10q = meta.date_10q;
  }

  fn set_item(&mut self, code: &str, value: f64) -> bool {
    match code {
      "acsh" => self.acsh = Some(value),
      "acae" => self.acae = Some(value),
      "asti" => self.asti = Some(value),
      "scsi" => self.scsi = Some(value),
      "aacr" => self.aacr = Some(value),
      "atrc" => self.atrc = Some(value),
      "aitl" => self.aitl = Some(value),
      "appy" => self.appy = Some(value),
      "soca" => self.soca = Some(value),
      "atca" => self.atca = Some(value),
      "aptc" => self.aptc = Some(value),
      "adep" => self.adep = Some(value),
      "appn" => self.appn = Some(value),
      "agwi" => self.agwi = Some(value),
      "aint" => self.aint = Some(value),
      "sinv" => self.sinv = Some(value),
      "altr" => self.altr = Some(value),
      "sola" => self.sola = Some(value),
      "atot" => self.atot = Some(value),
      "lapb" => self.lapb = Some(value),
      "lpba" => self.lpba = Some(value),
      "laex" => self.laex = Some(value),
      "lstd" => self.lstd = Some(value),
      "lcld" => self.lcld = Some(value),
      "socl" => self.socl = Some(value),
      "ltcl" => self.ltcl = Some(value),
      "lltd" => self.lltd = Some(value),
      "lclo" => self.lclo = Some(value),
      "lttd" => self.lttd = Some(value),
      "stld" => self.stld = Some(value),
      "sbdt" => self.sbdt = Some(value),
      "lmin" => self.lmin = Some(value),
      "sltl" => self.sltl = Some(value),
      "ltll" => self.ltll = Some(value),
      "srpr" => self.srpr = Some(value),
      "sprs" => self.sprs = Some(value),
      "scms" => self.scms = Some(value),
      "qpic" => self.qpic = Some(value),
      "qred" => self.qred = Some(value),
      "qtsc" => self.qtsc = Some(value),
      "qedg" => self.qedg = Some(value),
      "qugl" => self.qugl = Some(value),
      "sote" => self.sote = Some(value),
      "qtle" => self.qtle = Some(value),
      "qtel" => self.qtel = Some(value),
      "qtco" => self.qtco = Some(value),
      "qtpo" => self.qtpo = Some(value),
      "stbp" => self.stbp = Some(value),
      _ => return false,
    }
    true
  }
}

/// Cash flow statement for one fiscal period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStatement {
  pub period: Option<StatementPeriod>,
  pub end_date: Option<NaiveDate>,
  pub fiscal_year: Option<i32>,
  pub period_number: Option<i32>,
  pub date_10k: Option<NaiveDate>,
  pub date_10q: Option<NaiveDate>,
  pub onet: Option<f64>,
  pub sded: Option<f64>,
  pub samt: Option<f64>,
  pub obdt: Option<f64>,
  pub snci: Option<f64>,
  pub socf: Option<f64>,
  pub otlo: Option<f64>,
  pub scex: Option<f64>,
  pub sicf: Option<f64>,
  pub itli: Option<f64>,
  pub sfcf: Option<f64>,
  pub fcdp: Option<f64>,
  pub fpss: Option<f64>,
  pub fprd: Option<f64>,
  pub ftlf: Option<f64>,
  pub sfee: Option<f64>,
  pub sncc: Option<f64>,
  pub scip: Option<f64>,
  pub sctp: Option<f64>,
}

impl CashFlowStatement {
  pub fn statement_name() -> &'static str {
    "Cash Flow Statement"
  }

  pub fn item(&self, code: &str) -> Option<f64> {
    match code {
      "onet" => self.onet,
      "sded" => self.sded,
      "samt" => self.samt,
      "obdt" => self.obdt,
      "snci" => self.snci,
      "socf" => self.socf,
      "otlo" => self.otlo,
      "scex" => self.scex,
      "sicf" => self.sicf,
      "itli" => self.itli,
      "sfcf" => self.sfcf,
      "fcdp" => self.fcdp,
      "fpss" => self.fpss,
      "fprd" => self.fprd,
      "ftlf" => self.ftlf,
      "sfee" => self.sfee,
      "sncc" => self.sncc,
      "scip" => self.scip,
      "sctp" => self.sctp,
      _ => None,
    }
  }
}

impl StatementRecord for CashFlowStatement {
  const CODE: StatementCode = StatementCode::Cas;

  fn apply_meta(&mut self, meta: &PeriodMeta) {
    self.period = Some(meta.period);
    self.end_date = Some(meta.end_date);
    self.fiscal_year = Some(meta.fiscal_year);
    self.period_number = meta.period_number;
    self.date_10k = meta.date_10k;
    self.date_10q = meta.date_10q;
  }

  fn set_item(&mut self, code: &str, value: f64) -> bool {
    match code {
      "onet" => self.onet = Some(value),
      "sded" => self.sded = Some(value),
      "samt" => self.samt = Some(value),
      "obdt" => self.obdt = Some(value),
      "snci" => self.snci = Some(value),
      "socf" => self.socf = Some(value),
      "otlo" => self.otlo = Some(value),
      "scex" => self.scex = Some(value),
      "sicf" => self.sicf = Some(value),
      "itli" => self.itli = Some(value),
      "sfcf" => self.sfcf = Some(value),
      "fcdp" => self.fcdp = Some(value),
      "fpss" => self.fpss = Some(value),
      "fprd" => self.fprd = Some(value),
      "ftlf" => self.ftlf = Some(value),
      "sfee" => self.sfee = Some(value),
      "sncc" => self.sncc = Some(value),
      "scip" => self.scip = Some(value),
      "sctp" => self.sctp = Some(value),
      _ => return false,
    }
    true
  }
}

/// One financial statement of any of the three variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinancialStatement {
  Income(IncomeStatement),
  Balance(BalanceSheetStatement),
  CashFlow(CashFlowStatement),
}

impl FinancialStatement {
  pub fn statement_code(&self) -> StatementCode {
    match self {
      FinancialStatement::Income(_) => StatementCode::Inc,
      FinancialStatement::Balance(_) => StatementCode::Bal,
      FinancialStatement::CashFlow(_) => StatementCode::Cas,
    }
  }

  pub fn period(&self) -> Option<StatementPeriod> {
    match self {
      FinancialStatement::Income(s) => s.period,
      FinancialStatement::Balance(s) => s.period,
      FinancialStatement::CashFlow(s) => s.period,
    }
  }

  pub fn end_date(&self) -> Option<NaiveDate> {
    match self {
      FinancialStatement::Income(s) => s.end_date,
      FinancialStatement::Balance(s) => s.end_date,
      FinancialStatement::CashFlow(s) => s.end_date,
    }
  }

  pub fn fiscal_year(&self) -> Option<i32> {
    match self {
      FinancialStatement::Income(s) => s.fiscal_year,
      FinancialStatement::Balance(s) => s.fiscal_year,
      FinancialStatement::CashFlow(s) => s.fiscal_year,
    }
  }

  pub fn period_number(&self) -> Option<i32> {
    match self {
      FinancialStatement::Income(s) => s.period_number,
      FinancialStatement::Balance(s) => s.period_number,
      FinancialStatement::CashFlow(s) => s.period_number,
    }
  }

  pub fn date_10k(&self) -> Option<NaiveDate> {
    match self {
      FinancialStatement::Income(s) => s.date_10k,
      FinancialStatement::Balance(s) => s.date_10k,
      FinancialStatement::CashFlow(s) => s.date_10k,
    }
  }

  pub fn date_10q(&self) -> Option<NaiveDate> {
    match self {
      FinancialStatement::Income(s) => s.date_10q,
      FinancialStatement::Balance(s) => s.date_10q,
      FinancialStatement::CashFlow(s) => s.date_10q,
    }
  }

  /// Line item by lower-cased COA code.
  pub fn item(&self, code: &str) -> Option<f64> {
    match self {
      FinancialStatement::Income(s) => s.item(code),
      FinancialStatement::Balance(s) => s.item(code),
      FinancialStatement::CashFlow(s) => s.item(code),
    }
  }
}

/// One chart-of-accounts mapping entry: internal COA code to display
/// label, with the owning statement type and the source line ordering id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementMapItem {
  pub coa_item: String,
  pub map_item: String,
  pub statement_type: StatementCode,
  pub line_id: i32,
}

// --- Financial summary time series ---

/// Announced dividend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
  pub dividend_type: String,
  pub ex_date: NaiveDate,
  pub record_date: NaiveDate,
  pub pay_date: NaiveDate,
  pub declaration_date: NaiveDate,
  pub currency: String,
  pub value: f64,
}

/// Dividend per share as of a reporting date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendPerShare {
  pub as_of_date: NaiveDate,
  pub report_type: String,
  pub period: String,
  pub currency: String,
  pub value: f64,
}

/// Total revenue as of a reporting date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revenue {
  pub as_of_date: NaiveDate,
  pub report_type: String,
  pub period: String,
  pub currency: String,
  pub revenue: f64,
}

/// Earnings per share as of a reporting date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsPerShare {
  pub as_of_date: NaiveDate,
  pub report_type: String,
  pub period: String,
  pub currency: String,
  pub eps: f64,
}

/// Distinguishes a summary section that is missing from the source
/// document ("this company has none of this data") from one that is
/// present but matched zero records after filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SectionData<T> {
  Present(T),
  Absent,
}

impl<T> SectionData<T> {
  pub fn is_absent(&self) -> bool {
    matches!(self, SectionData::Absent)
  }

  pub fn is_present(&self) -> bool {
    !self.is_absent()
  }

  pub fn as_option(&self) -> Option<&T> {
    match self {
      SectionData::Present(v) => Some(v),
      SectionData::Absent => None,
    }
  }

  pub fn into_option(self) -> Option<T> {
    match self {
      SectionData::Present(v) => Some(v),
      SectionData::Absent => None,
    }
  }
}

// --- Snapshot report records ---

/// Consensus analyst estimates, one snapshot per instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalystForecast {
  pub cons_recom: Option<f64>,
  pub target_price: Option<f64>,
  pub proj_lt_growth_rate: Option<f64>,
  pub proj_pe: Option<f64>,
  pub proj_sales: Option<f64>,
  pub proj_sales_q: Option<f64>,
  pub proj_eps: Option<f64>,
  pub proj_epsq: Option<f64>,
  pub proj_profit: Option<f64>,
  pub proj_dps: Option<f64>,
}

/// Valuation and performance ratios, one snapshot per instrument.
/// `pdate` is the one date-typed field in the section; all others are
/// numeric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioSnapshot {
  pub nprice: Option<f64>,
  pub nhig: Option<f64>,
  pub nlow: Option<f64>,
  pub pdate: Option<NaiveDate>,
  pub vol10davg: Option<f64>,
  pub ev: Option<f64>,
  pub mktcap: Option<f64>,
  pub ttmrev: Option<f64>,
  pub ttmebitd: Option<f64>,
  pub ttmniac: Option<f64>,
  pub ttmepsxclx: Option<f64>,
  pub ttmrevps: Option<f64>,
  pub qbvps: Option<f64>,
  pub qcshps: Option<f64>,
  pub ttmcfshr: Option<f64>,
  pub ttmdivshr: Option<f64>,
  pub ttmgrosmgn: Option<f64>,
  pub ttmroepct: Option<f64>,
  pub ttmpr2rev: Option<f64>,
  pub peexclxor: Option<f64>,
  pub price2bk: Option<f64>,
  pub employees: Option<f64>,
}

// --- Analyst estimate (RESC) records ---

/// Which consensus statistic an estimate row carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateStatistic {
  High,
  Low,
  Mean,
  Median,
  NumOfEst,
  StdDev,
}

impl FromStr for EstimateStatistic {
  type Err = FundError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "High" => Ok(EstimateStatistic::High),
      "Low" => Ok(EstimateStatistic::Low),
      "Mean" => Ok(EstimateStatistic::Mean),
      "Median" => Ok(EstimateStatistic::Median),
      "NumOfEst" => Ok(EstimateStatistic::NumOfEst),
      "StdDev" => Ok(EstimateStatistic::StdDev),
      _ => Err(FundError::ParseError(format!("Unknown estimate statistic: {}", s))),
    }
  }
}

/// Whether a forward-year row is an analyst estimate or a
/// company-reported actual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardYearKind {
  Estimate,
  Actual,
}

/// One forward-year row. Estimates carry `est_type` (one row per
/// consensus statistic per fiscal period); actuals carry `updated`
/// (one row per fiscal period).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwardYear {
  pub kind: ForwardYearKind,
  pub item: String,
  pub unit: String,
  pub period_type: String,
  pub fiscal_year: i32,
  pub end_month: i32,
  pub end_cal_year: i32,
  pub value: f64,
  pub est_type: Option<EstimateStatistic>,
  pub updated: Option<DateTime<Utc>>,
}

// --- Company identity ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyInfo {
  pub ticker: Option<String>,
  pub company_name: Option<String>,
  pub cik: Option<String>,
  pub exchange_code: Option<String>,
  pub exchange: Option<String>,
  pub irs: Option<String>,
}

// --- Ownership ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipCompany {
  pub isin: String,
  pub float_shares: i64,
  pub as_of_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipDetails {
  pub owner_id: String,
  pub owner_type: Option<String>,
  pub as_of_date: Option<NaiveDate>,
  pub name: Option<String>,
  pub quantity: Option<f64>,
  pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipReport {
  pub company: OwnershipCompany,
  pub ownership_details: Vec<OwnershipDetails>,
}

// --- Streaming tick payloads ---

/// Fundamental ratios delivered on the market-data stream (generic tick
/// 258) as a `KEY=value;KEY=value` payload. Non-numeric entries (e.g.
/// CURRENCY=USD) are kept as raw strings only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalRatios {
  pub values: HashMap<String, f64>,
  pub raw: HashMap<String, String>,
}

impl FundamentalRatios {
  pub fn parse(payload: &str) -> Self {
    let mut values = HashMap::new();
    let mut raw = HashMap::new();
    for entry in payload.split(';') {
      let entry = entry.trim();
      if entry.is_empty() {
        continue;
      }
      if let Some((key, value)) = entry.split_once('=') {
        match value.parse::<f64>() {
          Ok(v) => {
            values.insert(key.to_string(), v);
          }
          Err(_) => {
            raw.insert(key.to_string(), value.to_string());
          }
        }
      }
    }
    FundamentalRatios { values, raw }
  }

  pub fn get(&self, key: &str) -> Option<f64> {
    self.values.get(key).copied()
  }
}

/// Dividend summary delivered on the market-data stream (IB dividends
/// tick) as `past12,next12,nextDate,nextAmount`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DividendSummary {
  pub past12_months: Option<f64>,
  pub next12_months: Option<f64>,
  pub next_ex_date: Option<NaiveDate>,
  pub next_amount: Option<f64>,
}

impl DividendSummary {
  pub fn parse(payload: &str) -> Result<Self, FundError> {
    let parts: Vec<&str> = payload.split(',').collect();
    if parts.len() != 4 {
      return Err(FundError::ParseError(format!(
        "Dividend summary payload should have 4 fields, got '{}'",
        payload
      )));
    }
    let num = |s: &str| -> Result<Option<f64>, FundError> {
      if s.is_empty() {
        return Ok(None);
      }
      s.parse::<f64>()
        .map(Some)
        .map_err(|_| FundError::ParseError(format!("Bad dividend summary number: '{}'", s)))
    };
    let next_ex_date = if parts[2].is_empty() {
      None
    } else {
      Some(NaiveDate::parse_from_str(parts[2], "%Y%m%d").map_err(|_| {
        FundError::ParseError(format!("Bad dividend summary date: '{}'", parts[2]))
      })?)
    };
    Ok(DividendSummary {
      past12_months: num(parts[0])?,
      next12_months: num(parts[1])?,
      next_ex_date,
      next_amount: num(parts[3])?,
    })
  }
}

/// JSON serialization for any record in this module.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, FundError> {
  serde_json::to_string(value)
    .map_err(|e| FundError::InternalError(format!("JSON serialization failed: {}", e)))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_report_kind_roundtrip() {
    for kind in [
      ReportKind::ReportsFinStatements,
      ReportKind::ReportsFinSummary,
      ReportKind::ReportSnapshot,
      ReportKind::Resc,
      ReportKind::ReportsOwnership,
      ReportKind::CalendarReport,
    ] {
      assert_eq!(kind.as_tws_str().parse::<ReportKind>().unwrap(), kind);
    }
    assert!("Bogus".parse::<ReportKind>().is_err());
  }

  #[test]
  fn test_statement_item_accessors() {
    let mut inc = IncomeStatement::default();
    assert!(inc.set_item("srev", 1000.0));
    assert!(inc.set_item("ninc", 99.5));
    assert!(!inc.set_item("zzzz", 1.0));
    assert_eq!(inc.item("srev"), Some(1000.0));
    assert_eq!(inc.item("ninc"), Some(99.5));
    assert_eq!(inc.item("rtlr"), None);

    let mut bal = BalanceSheetStatement::default();
    assert!(bal.set_item("atot", 5.0));
    assert_eq!(bal.item("atot"), Some(5.0));

    let mut cas = CashFlowStatement::default();
    assert!(cas.set_item("sctp", 2.0));
    assert_eq!(cas.item("sctp"), Some(2.0));
  }

  #[test]
  fn test_request_period_maps_to_statement_label() {
    assert_eq!(ReportPeriod::Annual.statement_period(), StatementPeriod::Annual);
    assert_eq!(ReportPeriod::Quarter.statement_period(), StatementPeriod::Interim);
    assert_eq!(StatementPeriod::Interim.as_str(), "Interim");
  }

  #[test]
  fn test_fundamental_ratios_parse() {
    let r = FundamentalRatios::parse("TTMEPS=6.45;PEEXCLXOR=28.1;CURRENCY=USD;");
    assert_eq!(r.get("TTMEPS"), Some(6.45));
    assert_eq!(r.get("PEEXCLXOR"), Some(28.1));
    assert_eq!(r.get("CURRENCY"), None);
    assert_eq!(r.raw.get("CURRENCY").map(String::as_str), Some("USD"));
  }

  #[test]
  fn test_dividend_summary_parse() {
    let d = DividendSummary::parse("0.83,0.92,20260219,0.23").unwrap();
    assert_eq!(d.past12_months, Some(0.83));
    assert_eq!(d.next_ex_date, Some(NaiveDate::from_ymd_opt(2026, 2, 19).unwrap()));
    assert_eq!(d.next_amount, Some(0.23));

    let empty = DividendSummary::parse(",,,").unwrap();
    assert_eq!(empty.past12_months, None);
    assert_eq!(empty.next_ex_date, None);

    assert!(DividendSummary::parse("1,2,3").is_err());
    assert!(DividendSummary::parse("x,,,").is_err());
  }

  #[test]
  fn test_section_data_serializes_absent_as_null() {
    let absent: SectionData<Vec<Dividend>> = SectionData::Absent;
    assert_eq!(to_json(&absent).unwrap(), "null");
    let present: SectionData<Vec<i32>> = SectionData::Present(vec![]);
    assert_eq!(to_json(&present).unwrap(), "[]");
  }

  #[test]
  fn test_statement_date_serializes_iso8601() {
    let mut inc = IncomeStatement::default();
    inc.end_date = NaiveDate::from_ymd_opt(2023, 12, 31);
    let json = to_json(&inc).unwrap();
    assert!(json.contains("\"2023-12-31\""));
  }
}
