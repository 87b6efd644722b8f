// ibfund/src/lib.rs
// Main entry point for the company fundamentals library

//! # ibfund - IBKR company fundamental data
//!
//! Retrieves company fundamental data reports over the TWS API and
//! parses them into typed records:
//!
//! - Financial statements (income, balance sheet, cash flow) per
//!   fiscal period, annual and interim
//! - Financial summary time series (dividends, revenue, EPS)
//! - Snapshot ratios and consensus analyst forecasts
//! - Forward-year estimates and reported actuals
//! - Ownership reports and company identity
//! - Streaming fundamental ratios and dividend summaries
//!
//! [`CompanyFundamental`] is the top-level entry point: one instance
//! per symbol, each report fetched and parsed at most once.

pub mod base;
pub mod client;
pub mod conn;
pub mod conn_mock;
pub mod contract;
pub mod data;
pub mod fundamental;
pub mod report_cache;
pub mod report_parser;
pub mod table;
pub mod xml_tree;

pub use base::FundError;
pub use fundamental::CompanyFundamental;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
