//! Tenure in days

use chrono::NaiveDate;

use crate::error::{Result, RetentionError};

/// Days from `join` to `quit`, or to `reference` while still employed
pub fn tenure_days(join: NaiveDate, quit: Option<NaiveDate>, reference: NaiveDate) -> i64 {
    (quit.unwrap_or(reference) - join).num_days()
}

/// [`tenure_days`], rejecting negative spans
pub fn checked_tenure_days(
    employee_id: i64,
    join: NaiveDate,
    quit: Option<NaiveDate>,
    reference: NaiveDate,
) -> Result<i64> {
    let days = tenure_days(join, quit, reference);
    if days < 0 {
        return Err(RetentionError::NegativeTenure { employee_id, days });
    }
    Ok(days)
}
