use crate::error::{ReportError, Result};
use crate::fetch::DEFAULT_PAGE_SIZE;
use crate::orchestrator::MatrixLayout;
use crate::schema::{CurrencyCode, DealPropertyNames, StageCategory};
use crate::utils::{validate_fiscal_year_end_month, MAX_COLUMNS};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a report run needs apart from secrets, which are read from the
/// environment variables named here.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportConfig {
    pub crm: CrmConfig,

    #[serde(default)]
    pub currency: CurrencyConfig,

    pub sheet: SheetConfig,

    #[schemars(
        description = "Stage groupings reported side by side, in output row order (e.g. all, new sales, renewals)"
    )]
    pub stage_categories: Vec<StageCategory>,

    #[serde(default = "default_fiscal_year_end_month")]
    #[schemars(
        description = "The month the financial year ends (1 = January, 12 = December). 6 for a July-June year."
    )]
    pub fiscal_year_end_month: u32,

    #[serde(default)]
    pub layout: MatrixLayout,

    #[serde(default)]
    #[schemars(description = "Settings for the daily all-time report. Omit to disable it.")]
    pub daily: Option<DailyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CrmConfig {
    #[serde(default = "default_crm_base_url")]
    pub base_url: String,

    #[serde(default = "default_crm_token_env")]
    #[schemars(description = "Environment variable holding the CRM private app token")]
    pub access_token_env: String,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub properties: DealPropertyNames,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CurrencyConfig {
    #[serde(default = "default_base_currency")]
    pub base: CurrencyCode,

    #[serde(default = "default_foreign_currency")]
    #[schemars(description = "The one currency whose net revenue is converted into the base currency")]
    pub foreign: CurrencyCode,

    #[serde(default = "default_currency_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_currency_base_url")]
    pub base_url: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            base: default_base_currency(),
            foreign: default_foreign_currency(),
            api_key_env: default_currency_key_env(),
            base_url: default_currency_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SheetConfig {
    pub spreadsheet_id: String,

    #[schemars(description = "Path to the service account JSON key")]
    pub credentials_path: PathBuf,

    #[serde(default = "default_period_worksheet")]
    pub period_worksheet: String,

    #[serde(default = "default_daily_worksheet")]
    pub daily_worksheet: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DailyConfig {
    pub pipeline: String,

    #[serde(default)]
    #[schemars(description = "Deal stages left out of the all-time figures")]
    pub excluded_stages: Vec<String>,

    #[serde(default = "default_counter_path")]
    pub counter_path: PathBuf,

    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    #[serde(default = "default_daily_properties")]
    pub properties: DealPropertyNames,
}

fn default_fiscal_year_end_month() -> u32 {
    6
}

fn default_crm_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

fn default_crm_token_env() -> String {
    "HUBSPOT_ACCESS_TOKEN".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_base_currency() -> CurrencyCode {
    CurrencyCode::new("AUD")
}

fn default_foreign_currency() -> CurrencyCode {
    CurrencyCode::new("NZD")
}

fn default_currency_key_env() -> String {
    "CURRENCY_API_KEY".to_string()
}

fn default_currency_base_url() -> String {
    "https://api.currencyapi.com".to_string()
}

fn default_period_worksheet() -> String {
    "CurrentMargin".to_string()
}

fn default_daily_worksheet() -> String {
    "DailyMargin".to_string()
}

fn default_counter_path() -> PathBuf {
    PathBuf::from("rownumber.txt")
}

fn default_max_pages() -> u32 {
    50
}

fn default_daily_properties() -> DealPropertyNames {
    DealPropertyNames {
        amount: "amount_in_home_currency".to_string(),
        ..DealPropertyNames::default()
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ReportError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        validate_fiscal_year_end_month(self.fiscal_year_end_month)?;

        if self.stage_categories.is_empty() {
            return Err(ReportError::Config(
                "at least one stage category is required".to_string(),
            ));
        }
        if let Some(empty) = self.stage_categories.iter().find(|c| c.stages.is_empty()) {
            return Err(ReportError::Config(format!(
                "stage category '{}' has no stages",
                empty.name
            )));
        }
        if self.crm.page_size == 0 {
            return Err(ReportError::Config("crm.page_size must be positive".to_string()));
        }
        if self.currency.base == self.currency.foreign {
            return Err(ReportError::Config(format!(
                "base and foreign currency are both {}",
                self.currency.base
            )));
        }
        if self.layout.rows_per_column == 0 {
            return Err(ReportError::Config(
                "layout.rows_per_column must be positive".to_string(),
            ));
        }
        if self.layout.first_column >= MAX_COLUMNS {
            return Err(ReportError::ColumnOutOfRange(self.layout.first_column));
        }
        Ok(())
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = schemars::schema_for!(ReportConfig);
        serde_json::to_string_pretty(&schema)
    }
}

/// Reads a secret from the environment. A missing secret is a configuration error.
pub fn read_secret(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ReportError::Config(format!(
            "environment variable {} is not set",
            var
        ))),
    }
}
