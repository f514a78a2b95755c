use crate::aggregator::{Aggregator, MarginSummary};
use crate::allocator::RowAllocator;
use crate::config::{DailyConfig, ReportConfig};
use crate::error::{ReportError, Result, Severity};
use crate::fetch::DealFetcher;
use crate::orchestrator::{PeriodOrchestrator, ResultMatrix};
use crate::periods::reporting_periods;
use crate::report::{daily_row_values, ReportWriter};
use crate::schema::{DealFilter, ExchangeRate, StageFilter};
use crate::rates::RateProvider;
use crate::traits::{CounterStore, DealSource, QuoteSource, SheetSink};
use chrono::NaiveDate;
use log::{info, warn};

/// What the daily run appended.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyOutcome {
    pub row: u32,
    pub summary: MarginSummary,
    pub values: Vec<String>,
}

/// Drives one reporting run against explicitly passed collaborators.
pub struct MarginReporter<'a> {
    config: &'a ReportConfig,
    deals: &'a dyn DealSource,
    quotes: &'a dyn QuoteSource,
}

impl<'a> MarginReporter<'a> {
    pub fn new(
        config: &'a ReportConfig,
        deals: &'a dyn DealSource,
        quotes: &'a dyn QuoteSource,
    ) -> Self {
        Self {
            config,
            deals,
            quotes,
        }
    }

    async fn exchange_rate(&self) -> Option<ExchangeRate> {
        let currency = &self.config.currency;
        let rate = RateProvider::new(self.quotes)
            .get_rate(&currency.base, &currency.foreign)
            .await;
        if rate.is_none() {
            warn!(
                "No {}/{} rate this run; {} net revenue will not be converted",
                currency.base, currency.foreign, currency.foreign
            );
        }
        rate
    }

    /// Margin and deal count for the current quarter and financial year,
    /// one cell per stage category, written to `sheet`.
    pub async fn period_report(&self, today: NaiveDate, sheet: &dyn SheetSink) -> Result<ResultMatrix> {
        let periods = reporting_periods(today, self.config.fiscal_year_end_month)?;
        info!(
            "Period report for {} periods x {} stage categories",
            periods.len(),
            self.config.stage_categories.len()
        );

        let rate = self.exchange_rate().await;
        let aggregator = Aggregator::new(
            self.config.currency.foreign.clone(),
            self.config.crm.properties.clone(),
        );
        let fetcher = DealFetcher::new(self.deals, self.config.crm.page_size);

        let matrix = PeriodOrchestrator::new(fetcher, &aggregator, rate)
            .compute(&self.config.stage_categories, &periods)
            .await?;

        ReportWriter::new(sheet)
            .write_matrix(&matrix, &self.config.layout)
            .await?;
        Ok(matrix)
    }

    /// All-time margin for one pipeline, appended as a new dated row.
    pub async fn daily_report(
        &self,
        today: NaiveDate,
        sheet: &dyn SheetSink,
        counter: &dyn CounterStore,
    ) -> Result<DailyOutcome> {
        let daily = self.config.daily.as_ref().ok_or_else(|| {
            ReportError::Config("the daily report needs a 'daily' section".to_string())
        })?;

        let rate = self.exchange_rate().await;
        let summary = self.all_time_summary(daily, rate).await?;

        let row = RowAllocator::new(counter, sheet).next_row().await?;
        let values = daily_row_values(today, &summary);
        ReportWriter::new(sheet).write_row(row, &values).await?;

        info!("Daily report for {} written to row {}", today, row);
        Ok(DailyOutcome {
            row,
            summary,
            values,
        })
    }

    async fn all_time_summary(
        &self,
        daily: &DailyConfig,
        rate: Option<ExchangeRate>,
    ) -> Result<MarginSummary> {
        let filter = DealFilter {
            close_date: None,
            stages: StageFilter::NotIn(daily.excluded_stages.clone()),
            pipeline: Some(daily.pipeline.clone()),
        };

        let deals = match DealFetcher::new(self.deals, self.config.crm.page_size)
            .fetch_all(&filter, daily.max_pages)
            .await
        {
            Ok(deals) => deals,
            Err(e) if e.severity() != Severity::Fatal => {
                warn!("Deal fetch failed, reporting NA: {}", e);
                return Ok(MarginSummary::not_available());
            }
            Err(e) => return Err(e),
        };

        if deals.is_empty() {
            info!("No deals found in pipeline {}.", daily.pipeline);
        }

        let aggregator = Aggregator::new(
            self.config.currency.foreign.clone(),
            daily.properties.clone(),
        );
        match aggregator.fold_raw(&deals, rate) {
            Ok(summary) => Ok(summary),
            Err(e) if e.severity() != Severity::Fatal => {
                warn!("Aggregation failed, reporting NA: {}", e);
                Ok(MarginSummary::not_available())
            }
            Err(e) => Err(e),
        }
    }
}
