//! Reporting windows derived from the run date.

use crate::error::Result;
use crate::schema::ReportPeriod;
use crate::utils::{
    first_day_of_month, fiscal_year_start, get_fiscal_year_end_for_date, last_day_of_month,
    validate_fiscal_year_end_month,
};
use chrono::{Datelike, NaiveDate};

pub fn current_quarter(today: NaiveDate) -> ReportPeriod {
    let start_month = (today.month() - 1) / 3 * 3 + 1;
    let quarter = (start_month - 1) / 3 + 1;

    ReportPeriod::new(
        format!("Q{}", quarter),
        first_day_of_month(today.year(), start_month),
        last_day_of_month(today.year(), start_month + 2),
    )
}

pub fn current_financial_year(today: NaiveDate, fiscal_year_end_month: u32) -> Result<ReportPeriod> {
    validate_fiscal_year_end_month(fiscal_year_end_month)?;

    let end = get_fiscal_year_end_for_date(today, fiscal_year_end_month);
    Ok(ReportPeriod::new(
        "Financial Year",
        fiscal_year_start(end),
        end,
    ))
}

/// The windows the period report covers, in output-column order.
pub fn reporting_periods(today: NaiveDate, fiscal_year_end_month: u32) -> Result<Vec<ReportPeriod>> {
    Ok(vec![
        current_quarter(today),
        current_financial_year(today, fiscal_year_end_month)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_current_quarter() {
        let q = current_quarter(date(2024, 2, 14));
        assert_eq!(q.label, "Q1");
        assert_eq!(q.start, date(2024, 1, 1));
        assert_eq!(q.end, date(2024, 3, 31));

        let q = current_quarter(date(2024, 12, 31));
        assert_eq!(q.label, "Q4");
        assert_eq!(q.start, date(2024, 10, 1));
        assert_eq!(q.end, date(2024, 12, 31));

        let q = current_quarter(date(2024, 5, 1));
        assert_eq!(q.end, date(2024, 6, 30));
    }

    #[test]
    fn test_current_financial_year() {
        let fy = current_financial_year(date(2024, 10, 19), 6).unwrap();
        assert_eq!(fy.start, date(2024, 7, 1));
        assert_eq!(fy.end, date(2025, 6, 30));

        let fy = current_financial_year(date(2024, 3, 1), 6).unwrap();
        assert_eq!(fy.start, date(2023, 7, 1));
        assert_eq!(fy.end, date(2024, 6, 30));

        assert!(current_financial_year(date(2024, 3, 1), 0).is_err());
    }

    #[test]
    fn test_reporting_periods_order() {
        let periods = reporting_periods(date(2024, 8, 1), 6).unwrap();
        assert_eq!(periods.len(), 2);
        assert_eq!(periods[0].label, "Q3");
        assert_eq!(periods[1].label, "Financial Year");
    }
}
