// fund_dump.rs
// Dump fundamental data for a symbol from saved report documents.
// Use it like this:
//   fund_dump --dir reports/AAPL --symbol AAPL statements
//   fund_dump --dir reports/AAPL --symbol AAPL all --pretty

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use serde::Serialize;

use ibfund::conn_mock::MockConnection;
use ibfund::table::statement_table;
use ibfund::CompanyFundamental;

#[derive(Parser, Debug)]
#[command(author, version, about = "Dump IBKR company fundamental data as JSON", long_about = None)]
struct Args {
  /// Directory holding saved report documents, one <ReportKind>.xml
  /// file per kind (e.g. ReportsFinStatements.xml).
  #[arg(long)]
  dir: PathBuf,

  /// Company symbol the documents belong to.
  #[arg(long)]
  symbol: String,

  /// Which section to dump.
  #[arg(default_value = "all")]
  section: Section,

  /// Pretty-print the JSON output.
  #[arg(long)]
  pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Section {
  All,
  Statements,
  Tables,
  Summary,
  Snapshot,
  Estimates,
  Ownership,
  Info,
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  let conn = MockConnection::from_dir(&args.dir)
    .with_context(|| format!("Loading report documents from {}", args.dir.display()))?;
  let fund = CompanyFundamental::new(Arc::new(conn), &args.symbol)
    .context("Building fundamental data facade")?;

  let wants = |s: Section| args.section == Section::All || args.section == s;

  if wants(Section::Statements) {
    dump(&args, "income_annual", &fund.income_annual()?)?;
    dump(&args, "income_quarter", &fund.income_quarter()?)?;
    dump(&args, "balance_annual", &fund.balance_annual()?)?;
    dump(&args, "balance_quarter", &fund.balance_quarter()?)?;
    dump(&args, "cashflow_annual", &fund.cashflow_annual()?)?;
    dump(&args, "cashflow_quarter", &fund.cashflow_quarter()?)?;
    dump(&args, "map_items", &fund.map_items()?)?;
  }
  if wants(Section::Tables) {
    let map_items = fund.map_items()?;
    dump(&args, "income_table_annual", &statement_table(fund.income_annual()?, map_items)?)?;
    dump(&args, "income_table_quarter", &statement_table(fund.income_quarter()?, map_items)?)?;
    dump(&args, "balance_table_annual", &statement_table(fund.balance_annual()?, map_items)?)?;
    dump(&args, "balance_table_quarter", &statement_table(fund.balance_quarter()?, map_items)?)?;
    dump(&args, "cashflow_table_annual", &statement_table(fund.cashflow_annual()?, map_items)?)?;
    dump(&args, "cashflow_table_quarter", &statement_table(fund.cashflow_quarter()?, map_items)?)?;
  }
  if wants(Section::Summary) {
    dump(&args, "dividend", &fund.dividend()?)?;
    dump(&args, "div_ps_ttm", &fund.div_ps_ttm()?)?;
    dump(&args, "div_ps_q", &fund.div_ps_q()?)?;
    dump(&args, "revenue_ttm", &fund.revenue_ttm()?)?;
    dump(&args, "revenue_q", &fund.revenue_q()?)?;
    dump(&args, "eps_ttm", &fund.eps_ttm()?)?;
    dump(&args, "eps_q", &fund.eps_q()?)?;
  }
  if wants(Section::Snapshot) {
    dump(&args, "ratios", &fund.ratios()?)?;
    dump(&args, "analyst_forecast", &fund.analyst_forecast()?)?;
  }
  if wants(Section::Estimates) {
    dump(&args, "fy_estimates", &fund.fy_estimates()?)?;
    dump(&args, "fy_actuals", &fund.fy_actuals()?)?;
  }
  if wants(Section::Ownership) {
    // Ownership documents are large and often not saved; skip quietly
    // when absent in "all" mode.
    match fund.ownership_report() {
      Ok(report) => dump(&args, "ownership", report)?,
      Err(e) if args.section == Section::All => warn!("Skipping ownership: {}", e),
      Err(e) => return Err(e.into()),
    }
  }
  if wants(Section::Info) {
    dump(&args, "company_info", &fund.company_info()?)?;
  }

  Ok(())
}

fn dump<T: Serialize>(args: &Args, name: &str, value: &T) -> Result<()> {
  let json = if args.pretty {
    serde_json::to_string_pretty(value)?
  } else {
    serde_json::to_string(value)?
  };
  println!("{}: {}", name, json);
  Ok(())
}
