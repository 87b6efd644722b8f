// ibfund/src/table.rs
// Joins statement records against the COA mapping into display tables

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::base::FundError;
use crate::data::{
  BalanceSheetStatement, CashFlowStatement, FinancialStatement, IncomeStatement, StatementCode,
  StatementMapItem, StatementPeriod,
};

/// Metadata rows at the top of an annual statement table:
/// period, end_date, fiscal_year, date_10k.
pub const ANNUAL_HEADER_ROWS: usize = 4;
/// Metadata rows at the top of an interim statement table:
/// period, end_date, fiscal_year, period_number, date_10q.
pub const INTERIM_HEADER_ROWS: usize = 5;

pub fn header_rows(period: StatementPeriod) -> usize {
  match period {
    StatementPeriod::Annual => ANNUAL_HEADER_ROWS,
    StatementPeriod::Interim => INTERIM_HEADER_ROWS,
  }
}

/// Read access shared by the three statement variants, used to join
/// them against the mapping table.
pub trait StatementLike {
  fn code(&self) -> StatementCode;
  fn period(&self) -> Option<StatementPeriod>;
  fn end_date(&self) -> Option<NaiveDate>;
  fn fiscal_year(&self) -> Option<i32>;
  fn period_number(&self) -> Option<i32>;
  fn date_10k(&self) -> Option<NaiveDate>;
  fn date_10q(&self) -> Option<NaiveDate>;
  fn item(&self, code: &str) -> Option<f64>;
}

impl StatementLike for IncomeStatement {
  fn code(&self) -> StatementCode {
    StatementCode::Inc
  }
  fn period(&self) -> Option<StatementPeriod> {
    self.period
  }
  fn end_date(&self) -> Option<NaiveDate> {
    self.end_date
  }
  fn fiscal_year(&self) -> Option<i32> {
    self.fiscal_year
  }
  fn period_number(&self) -> Option<i32> {
    self.period_number
  }
  fn date_10k(&self) -> Option<NaiveDate> {
    self.date_10k
  }
  fn date_10q(&self) -> Option<NaiveDate> {
    self.date_10q
  }
  fn item(&self, code: &str) -> Option<f64> {
    IncomeStatement::item(self, code)
  }
}

impl StatementLike for BalanceSheetStatement {
  fn code(&self) -> StatementCode {
    StatementCode::Bal
  }
  fn period(&self) -> Option<StatementPeriod> {
    self.period
  }
  fn end_date(&self) -> Option<NaiveDate> {
    self.end_date
  }
  fn fiscal_year(&self) -> Option<i32> {
    self.fiscal_year
  }
  fn period_number(&self) -> Option<i32> {
    self.period_number
  }
  fn date_10k(&self) -> Option<NaiveDate> {
    self.date_10k
  }
  fn date_10q(&self) -> Option<NaiveDate> {
    self.date_10q
  }
  fn item(&self, code: &str) -> Option<f64> {
    BalanceSheetStatement::item(self, code)
  }
}

impl StatementLike for CashFlowStatement {
  fn code(&self) -> StatementCode {
    StatementCode::Cas
  }
  fn period(&self) -> Option<StatementPeriod> {
    self.period
  }
  fn end_date(&self) -> Option<NaiveDate> {
    self.end_date
  }
  fn fiscal_year(&self) -> Option<i32> {
    self.fiscal_year
  }
  fn period_number(&self) -> Option<i32> {
    self.period_number
  }
  fn date_10k(&self) -> Option<NaiveDate> {
    self.date_10k
  }
  fn date_10q(&self) -> Option<NaiveDate> {
    self.date_10q
  }
  fn item(&self, code: &str) -> Option<f64> {
    CashFlowStatement::item(self, code)
  }
}

impl StatementLike for FinancialStatement {
  fn code(&self) -> StatementCode {
    self.statement_code()
  }
  fn period(&self) -> Option<StatementPeriod> {
    FinancialStatement::period(self)
  }
  fn end_date(&self) -> Option<NaiveDate> {
    FinancialStatement::end_date(self)
  }
  fn fiscal_year(&self) -> Option<i32> {
    FinancialStatement::fiscal_year(self)
  }
  fn period_number(&self) -> Option<i32> {
    FinancialStatement::period_number(self)
  }
  fn date_10k(&self) -> Option<NaiveDate> {
    FinancialStatement::date_10k(self)
  }
  fn date_10q(&self) -> Option<NaiveDate> {
    FinancialStatement::date_10q(self)
  }
  fn item(&self, code: &str) -> Option<f64> {
    FinancialStatement::item(self, code)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
  Number(f64),
  Integer(i64),
  Date(NaiveDate),
  Text(String),
  Empty,
}

impl fmt::Display for CellValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      CellValue::Number(v) => write!(f, "{}", v),
      CellValue::Integer(v) => write!(f, "{}", v),
      CellValue::Date(v) => write!(f, "{}", v),
      CellValue::Text(v) => write!(f, "{}", v),
      CellValue::Empty => Ok(()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
  pub label: String,
  pub cells: Vec<CellValue>,
}

/// A statement table: one column per fiscal period, metadata header
/// rows followed by mapped line-item rows ordered by line id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementTable {
  pub columns: Vec<NaiveDate>,
  pub rows: Vec<TableRow>,
  pub header_rows: usize,
}

impl StatementTable {
  pub fn is_empty(&self) -> bool {
    self.columns.is_empty()
  }

  pub fn item_rows(&self) -> &[TableRow] {
    &self.rows[self.header_rows.min(self.rows.len())..]
  }
}

impl fmt::Display for StatementTable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:<40}", "")?;
    for col in &self.columns {
      write!(f, "\t{}", col)?;
    }
    writeln!(f)?;
    for row in &self.rows {
      write!(f, "{:<40}", row.label)?;
      for cell in &row.cells {
        write!(f, "\t{}", cell)?;
      }
      writeln!(f)?;
    }
    Ok(())
  }
}

/// Join statement records against the mapping table. Line-item rows
/// come out ordered by the mapping's line id; rows with no value in
/// any period are dropped. Mapping entries for other statement types
/// are ignored.
pub fn statement_table<T: StatementLike>(
  statements: &[T],
  map_items: &[StatementMapItem],
) -> Result<StatementTable, FundError> {
  let Some(first) = statements.first() else {
    return Ok(StatementTable { columns: Vec::new(), rows: Vec::new(), header_rows: 0 });
  };
  let period = first.period().ok_or_else(|| {
    FundError::InvalidParameter("Statement record has no period label".to_string())
  })?;
  let mut columns = Vec::with_capacity(statements.len());
  for stmt in statements {
    columns.push(stmt.end_date().ok_or_else(|| {
      FundError::InvalidParameter("Statement record has no end date".to_string())
    })?);
  }

  let mut rows = Vec::new();
  rows.push(TableRow {
    label: "period".to_string(),
    cells: statements
      .iter()
      .map(|s| match s.period() {
        Some(p) => CellValue::Text(p.as_str().to_string()),
        None => CellValue::Empty,
      })
      .collect(),
  });
  rows.push(TableRow {
    label: "end_date".to_string(),
    cells: statements.iter().map(|s| date_cell(s.end_date())).collect(),
  });
  rows.push(TableRow {
    label: "fiscal_year".to_string(),
    cells: statements
      .iter()
      .map(|s| match s.fiscal_year() {
        Some(y) => CellValue::Integer(y as i64),
        None => CellValue::Empty,
      })
      .collect(),
  });
  match period {
    StatementPeriod::Annual => {
      rows.push(TableRow {
        label: "date_10k".to_string(),
        cells: statements.iter().map(|s| date_cell(s.date_10k())).collect(),
      });
    }
    StatementPeriod::Interim => {
      rows.push(TableRow {
        label: "period_number".to_string(),
        cells: statements
          .iter()
          .map(|s| match s.period_number() {
            Some(n) => CellValue::Integer(n as i64),
            None => CellValue::Empty,
          })
          .collect(),
      });
      rows.push(TableRow {
        label: "date_10q".to_string(),
        cells: statements.iter().map(|s| date_cell(s.date_10q())).collect(),
      });
    }
  }
  debug_assert_eq!(rows.len(), header_rows(period));
  let header_count = rows.len();

  let mut mapped: Vec<&StatementMapItem> =
    map_items.iter().filter(|m| m.statement_type == first.code()).collect();
  mapped.sort_by_key(|m| m.line_id);
  for entry in mapped {
    let code = entry.coa_item.to_lowercase();
    let cells: Vec<CellValue> = statements
      .iter()
      .map(|s| match s.item(&code) {
        Some(v) => CellValue::Number(v),
        None => CellValue::Empty,
      })
      .collect();
    if cells.iter().all(|c| *c == CellValue::Empty) {
      continue;
    }
    rows.push(TableRow { label: entry.map_item.clone(), cells });
  }

  Ok(StatementTable { columns, rows, header_rows: header_count })
}

fn date_cell(date: Option<NaiveDate>) -> CellValue {
  match date {
    Some(d) => CellValue::Date(d),
    None => CellValue::Empty,
  }
}
