use crate::error::{ReportError, Result};
use chrono::{Datelike, Days, NaiveDate};

/// Widest sheet the report layout addresses: 'A' through 'Z'.
pub const MAX_COLUMNS: usize = 26;

/// Maps a zero-based column index to its spreadsheet letter.
///
/// Downstream formatting assumes single-letter columns, so anything past
/// 'Z' is rejected rather than rolled over to "AA".
pub fn column_label(index: usize) -> Result<char> {
    if index >= MAX_COLUMNS {
        return Err(ReportError::ColumnOutOfRange(index));
    }
    Ok((b'A' + index as u8) as char)
}

pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let next_month = if month == 12 { 1 } else { month + 1 };
    let next_year = if month == 12 { year + 1 } else { year };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .unwrap()
        .checked_sub_days(Days::new(1))
        .unwrap()
}

pub fn first_day_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

pub fn validate_fiscal_year_end_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidFiscalYearEndMonth(month));
    }
    Ok(())
}

/// Get the fiscal year end date for a given date
/// Returns the fiscal year end date that this date belongs to
pub fn get_fiscal_year_end_for_date(date: NaiveDate, fiscal_month: u32) -> NaiveDate {
    let current_month = date.month();
    let current_year = date.year();

    // Past the fiscal year end month means the FY closes next calendar year
    if current_month <= fiscal_month {
        last_day_of_month(current_year, fiscal_month)
    } else {
        last_day_of_month(current_year + 1, fiscal_month)
    }
}

/// First day of the fiscal year that closes on `fiscal_year_end`.
pub fn fiscal_year_start(fiscal_year_end: NaiveDate) -> NaiveDate {
    let month = fiscal_year_end.month();
    if month == 12 {
        first_day_of_month(fiscal_year_end.year(), 1)
    } else {
        first_day_of_month(fiscal_year_end.year() - 1, month + 1)
    }
}
