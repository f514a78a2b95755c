use crate::aggregator::Aggregator;
use crate::error::{Result, Severity};
use crate::fetch::DealFetcher;
use crate::schema::{
    CellRef, DealFilter, ExchangeRate, PeriodResult, ReportPeriod, StageCategory,
};
use log::{info, warn};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where matrix results land on the sheet: a column per block of
/// `rows_per_column` results, filled top to bottom from `first_row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatrixLayout {
    #[serde(default = "default_first_column")]
    #[schemars(description = "Zero-based index of the first output column (1 = 'B')")]
    pub first_column: usize,
    #[serde(default = "default_first_row")]
    pub first_row: u32,
    #[serde(default = "default_rows_per_column")]
    pub rows_per_column: usize,
}

fn default_first_column() -> usize {
    1
}

fn default_first_row() -> u32 {
    2
}

fn default_rows_per_column() -> usize {
    3
}

impl Default for MatrixLayout {
    fn default() -> Self {
        Self {
            first_column: default_first_column(),
            first_row: default_first_row(),
            rows_per_column: default_rows_per_column(),
        }
    }
}

impl MatrixLayout {
    /// Coordinate of the `index`-th result in write order.
    pub fn cell_for(&self, index: usize) -> CellRef {
        let per_column = self.rows_per_column.max(1);
        CellRef::new(
            self.first_column + index / per_column,
            self.first_row + (index % per_column) as u32,
        )
    }
}

/// Results in period-major, category-minor order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix {
    pub results: Vec<PeriodResult>,
    pub categories_per_period: usize,
}

impl ResultMatrix {
    pub fn get(&self, period: usize, category: usize) -> Option<&PeriodResult> {
        if category >= self.categories_per_period {
            return None;
        }
        self.results
            .get(period * self.categories_per_period + category)
    }

    pub fn placements<'m>(
        &'m self,
        layout: &'m MatrixLayout,
    ) -> impl Iterator<Item = (CellRef, &'m PeriodResult)> + 'm {
        self.results
            .iter()
            .enumerate()
            .map(move |(i, result)| (layout.cell_for(i), result))
    }
}

pub struct PeriodOrchestrator<'a> {
    fetcher: DealFetcher<'a>,
    aggregator: &'a Aggregator,
    rate: Option<ExchangeRate>,
}

impl<'a> PeriodOrchestrator<'a> {
    pub fn new(
        fetcher: DealFetcher<'a>,
        aggregator: &'a Aggregator,
        rate: Option<ExchangeRate>,
    ) -> Self {
        Self {
            fetcher,
            aggregator,
            rate,
        }
    }

    /// One result per (period, category). Per-cell failures become NA;
    /// only fatal errors abort.
    pub async fn compute(
        &self,
        stage_categories: &[StageCategory],
        periods: &[ReportPeriod],
    ) -> Result<ResultMatrix> {
        let mut results = Vec::with_capacity(stage_categories.len() * periods.len());

        for period in periods {
            for category in stage_categories {
                results.push(self.compute_cell(period, category).await?);
            }
        }

        Ok(ResultMatrix {
            results,
            categories_per_period: stage_categories.len(),
        })
    }

    async fn compute_cell(
        &self,
        period: &ReportPeriod,
        category: &StageCategory,
    ) -> Result<PeriodResult> {
        let label = format!("{} / {}", period.label, category.name);
        let filter = DealFilter::for_period(period, category);

        let deals = match self.fetcher.fetch_both_strategies(&filter).await {
            Ok(deals) => deals,
            Err(e) if e.severity() != Severity::Fatal => {
                warn!("{}: fetch failed, reporting NA: {}", label, e);
                return Ok(PeriodResult::not_available(label));
            }
            Err(e) => return Err(e),
        };

        if deals.is_empty() {
            info!("No deals found for {}.", label);
            return Ok(PeriodResult::not_available(label));
        }

        match self.aggregator.fold_raw(&deals, self.rate) {
            Ok(summary) => {
                info!(
                    "{}: margin {} over {} deals",
                    label, summary.margin, summary.deal_count
                );
                Ok(PeriodResult {
                    label,
                    margin: summary.margin,
                    deal_count: summary.deal_count,
                })
            }
            Err(e) if e.severity() != Severity::Fatal => {
                warn!("{}: aggregation failed, reporting NA: {}", label, e);
                Ok(PeriodResult::not_available(label))
            }
            Err(e) => Err(e),
        }
    }
}
