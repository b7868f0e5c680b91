//! Calendar date parameters

use crate::core::error::ValidationError;
use chrono::NaiveDate;

/// Parse an ISO `YYYY-MM-DD` date, naming `parameter` on failure
pub fn parse_date(parameter: &str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| ValidationError::InvalidDate {
        parameter: parameter.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Parse an optional date parameter
pub fn parse_optional_date(
    parameter: &str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, ValidationError> {
    value.map(|v| parse_date(parameter, v)).transpose()
}
