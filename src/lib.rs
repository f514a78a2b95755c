//! # Deal Margin Report
//!
//! Pulls sales deals from a CRM, normalises their net revenue into one base
//! currency and reports running profit margins and deal counts into a
//! spreadsheet.
//!
//! ## Core Concepts
//!
//! - **Aggregation**: a single left-to-right fold over deals into amount and
//!   net revenue totals; margin is derived from the totals, never stored
//! - **Currency normalisation**: net revenue of deals in the one configured
//!   foreign currency is divided by the run's exchange rate, when there is one
//! - **NA**: "no matching deals" is a value of its own, distinct from zero
//! - **Period matrix**: every reporting period crossed with every stage category
//! - **Row cursor**: a persisted hint for the next free row of an append-only sheet
//!
//! ## Example
//!
//! ```rust,ignore
//! use deal_margin_report::*;
//! use rust_decimal_macros::dec;
//!
//! let aggregator = Aggregator::new(CurrencyCode::new("NZD"), DealPropertyNames::default());
//! let deals = vec![DealRecord {
//!     id: None,
//!     amount: dec!(100),
//!     net_revenue: Some(dec!(100)),
//!     currency_code: Some(CurrencyCode::new("NZD")),
//! }];
//!
//! let summary = aggregator.fold(&deals, ExchangeRate::new(dec!(2.0)))?;
//! assert_eq!(summary.margin, Metric::Value(dec!(50)));
//! ```

pub mod aggregator;
pub mod allocator;
pub mod config;
pub mod error;
pub mod fetch;
pub mod orchestrator;
pub mod periods;
pub mod pipeline;
pub mod rates;
pub mod report;
pub mod schema;
pub mod traits;
pub mod utils;

#[cfg(feature = "http")]
pub mod clients;

pub use aggregator::{AggregationState, Aggregator, MarginSummary};
pub use allocator::{FileCounterStore, RowAllocator};
pub use config::{read_secret, ReportConfig};
pub use error::{ReportError, Result, Severity};
pub use fetch::DealFetcher;
pub use orchestrator::{MatrixLayout, PeriodOrchestrator, ResultMatrix};
pub use pipeline::{DailyOutcome, MarginReporter};
pub use rates::RateProvider;
pub use report::{daily_row_values, format_period_cell, ReportWriter};
pub use schema::*;
pub use traits::*;
pub use utils::column_label;
