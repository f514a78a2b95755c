use crate::error::{ReportError, Result};
use crate::utils::column_label;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Upper-cased ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(CurrencyCode::new)
    }
}

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How many units of the foreign currency one unit of the base currency buys.
///
/// Only strictly positive rates can be constructed, so dividing by one is
/// always defined. A failed lookup is `Option::<ExchangeRate>::None`, never 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    pub fn new(value: Decimal) -> Option<Self> {
        (value > Decimal::ZERO).then_some(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Converts an amount in the foreign currency into the base currency.
    /// `None` when the result does not fit a `Decimal`.
    pub fn to_base(&self, foreign_amount: Decimal) -> Option<Decimal> {
        foreign_amount.checked_div(self.0)
    }
}

/// CRM property names read off each deal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DealPropertyNames {
    /// `amount` for the period reports, `amount_in_home_currency` for the daily report.
    #[serde(default = "default_amount_property")]
    pub amount: String,
    #[serde(default = "default_net_revenue_property")]
    pub net_revenue: String,
    #[serde(default = "default_currency_property")]
    pub currency: String,
}

fn default_amount_property() -> String {
    "amount".to_string()
}

fn default_net_revenue_property() -> String {
    "net_revenue".to_string()
}

fn default_currency_property() -> String {
    "deal_currency_code".to_string()
}

impl Default for DealPropertyNames {
    fn default() -> Self {
        Self {
            amount: default_amount_property(),
            net_revenue: default_net_revenue_property(),
            currency: default_currency_property(),
        }
    }
}

impl DealPropertyNames {
    /// Every property the CRM must return for a deal to be parseable.
    pub fn requested(&self) -> Vec<String> {
        vec![
            self.net_revenue.clone(),
            self.amount.clone(),
            "dealstage".to_string(),
            self.currency.clone(),
        ]
    }
}

/// A deal exactly as the CRM returns it: every property is an optional string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDeal {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Option<String>>,
}

impl RawDeal {
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    fn deal_id(&self) -> String {
        self.id
            .clone()
            .or_else(|| self.property("hs_object_id").map(str::to_string))
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    pub fn parse(&self, names: &DealPropertyNames) -> Result<DealRecord> {
        let amount_raw = self.property(&names.amount);
        let amount = amount_raw
            .and_then(parse_decimal)
            .ok_or_else(|| ReportError::Data {
                deal_id: self.deal_id(),
                field: "amount",
                value: amount_raw.map(str::to_string),
            })?;

        let net_revenue = match self.property(&names.net_revenue) {
            Some(raw) => Some(parse_decimal(raw).ok_or_else(|| ReportError::Data {
                deal_id: self.deal_id(),
                field: "net_revenue",
                value: Some(raw.to_string()),
            })?),
            None => None,
        };

        Ok(DealRecord {
            id: self.id.clone(),
            amount,
            net_revenue,
            currency_code: self.property(&names.currency).map(CurrencyCode::new),
        })
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// A parsed deal. `amount` is already in the base currency.
#[derive(Debug, Clone, PartialEq)]
pub struct DealRecord {
    pub id: Option<String>,
    pub amount: Decimal,
    pub net_revenue: Option<Decimal>,
    pub currency_code: Option<CurrencyCode>,
}

/// A reported figure, or the explicit "no data" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric<T> {
    Value(T),
    NotAvailable,
}

impl<T> Metric<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Metric::Value(v) => Some(v),
            Metric::NotAvailable => None,
        }
    }
}

impl<T> From<Option<T>> for Metric<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Metric::NotAvailable, Metric::Value)
    }
}

impl<T: fmt::Display> fmt::Display for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Value(v) => v.fmt(f),
            Metric::NotAvailable => f.write_str("NA"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResult {
    pub label: String,
    pub margin: Metric<Decimal>,
    pub deal_count: Metric<usize>,
}

impl PeriodResult {
    pub fn not_available(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            margin: Metric::NotAvailable,
            deal_count: Metric::NotAvailable,
        }
    }
}

/// A closed date window deals are filtered on by close date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportPeriod {
    pub label: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }
}

/// A named set of CRM stage identifiers reported together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StageCategory {
    #[schemars(description = "Display name, e.g. 'all', 'new sales', 'renewals'")]
    pub name: String,
    #[schemars(description = "CRM deal stage identifiers in this category")]
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageFilter {
    In(Vec<String>),
    NotIn(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealFilter {
    pub close_date: Option<(NaiveDate, NaiveDate)>,
    pub stages: StageFilter,
    pub pipeline: Option<String>,
}

impl DealFilter {
    pub fn for_period(period: &ReportPeriod, category: &StageCategory) -> Self {
        Self {
            close_date: Some((period.start, period.end)),
            stages: StageFilter::In(category.stages.clone()),
            pipeline: None,
        }
    }
}

/// The two pagination strategies the deal search accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// The first page, capped at `n` records.
    Limit(u32),
    /// Up to `limit` records starting after the first `offset`.
    After { offset: u32, limit: u32 },
}

/// A single-letter A1 coordinate built from a zero-based column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub column: usize,
    pub row: u32,
}

impl CellRef {
    pub fn new(column: usize, row: u32) -> Self {
        Self { column, row }
    }

    pub fn a1(&self) -> Result<String> {
        Ok(format!("{}{}", column_label(self.column)?, self.row))
    }
}
