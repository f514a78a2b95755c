use crate::aggregator::MarginSummary;
use crate::error::Result;
use crate::orchestrator::{MatrixLayout, ResultMatrix};
use crate::schema::{CellRef, Metric, PeriodResult};
use crate::traits::SheetSink;
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;

fn format_margin(margin: Metric<Decimal>) -> String {
    match margin {
        Metric::Value(m) => format!("{:.2}%", m.round_dp(2)),
        Metric::NotAvailable => "NA".to_string(),
    }
}

fn format_amount(amount: Option<Decimal>) -> String {
    match amount {
        Some(a) => format!("{:.2}", a.round_dp(2)),
        None => "NA".to_string(),
    }
}

/// `"83.33% | deals: 2"`, or `"NA"` when the cell had no deals.
pub fn format_period_cell(result: &PeriodResult) -> String {
    match (result.margin, result.deal_count) {
        (Metric::NotAvailable, Metric::NotAvailable) => "NA".to_string(),
        (margin, count) => format!("{} | deals: {}", format_margin(margin), count),
    }
}

/// One line of the daily report: date, margin, deal count, amount, net revenue, cost.
pub fn daily_row_values(date: NaiveDate, summary: &MarginSummary) -> Vec<String> {
    let totals = summary.totals.as_ref();
    vec![
        date.format("%Y-%m-%d").to_string(),
        format_margin(summary.margin),
        summary.deal_count.to_string(),
        format_amount(totals.map(|t| t.total_amount)),
        format_amount(totals.map(|t| t.total_net_revenue)),
        format_amount(totals.and_then(|t| t.cost())),
    ]
}

pub struct ReportWriter<'a> {
    sheet: &'a dyn SheetSink,
}

impl<'a> ReportWriter<'a> {
    pub fn new(sheet: &'a dyn SheetSink) -> Self {
        Self { sheet }
    }

    async fn write(&self, cell: CellRef, value: &str) -> Result<()> {
        let a1 = cell.a1()?;
        debug!("Writing {:?} to {}", value, a1);
        self.sheet.write_cell(&cell, value).await
    }

    /// Writes every result at its layout position. Cells already written stay
    /// written if a later one fails.
    pub async fn write_matrix(&self, matrix: &ResultMatrix, layout: &MatrixLayout) -> Result<usize> {
        let mut written = 0;
        for (cell, result) in matrix.placements(layout) {
            self.write(cell, &format_period_cell(result)).await?;
            written += 1;
        }
        info!("Wrote {} period cells", written);
        Ok(written)
    }

    /// Writes `values` left to right starting at column 'A'.
    pub async fn write_row(&self, row: u32, values: &[String]) -> Result<()> {
        for (column, value) in values.iter().enumerate() {
            self.write(CellRef::new(column, row), value).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregationState;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_period_cell() {
        let result = PeriodResult {
            label: "Q1 / all".to_string(),
            margin: Metric::Value(dec!(83.333333)),
            deal_count: Metric::Value(2),
        };
        assert_eq!(format_period_cell(&result), "83.33% | deals: 2");
        assert_eq!(format_period_cell(&PeriodResult::not_available("x")), "NA");

        let zero_amount = PeriodResult {
            label: "x".to_string(),
            margin: Metric::NotAvailable,
            deal_count: Metric::Value(3),
        };
        assert_eq!(format_period_cell(&zero_amount), "NA | deals: 3");
    }

    #[test]
    fn test_daily_row_values() {
        let summary = MarginSummary {
            margin: Metric::Value(dec!(83.3333)),
            deal_count: Metric::Value(2),
            totals: Some(AggregationState {
                total_amount: dec!(300),
                total_net_revenue: dec!(250),
                count: 2,
            }),
        };
        let date = NaiveDate::from_ymd_opt(2024, 10, 19).unwrap();
        assert_eq!(
            daily_row_values(date, &summary),
            vec!["2024-10-19", "83.33%", "2", "300.00", "250.00", "50.00"]
        );

        assert_eq!(
            daily_row_values(date, &MarginSummary::not_available()),
            vec!["2024-10-19", "NA", "NA", "NA", "NA", "NA"]
        );
    }
}
