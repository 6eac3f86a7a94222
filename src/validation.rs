use chrono::NaiveDate;

use crate::error::AppError;

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub fn require_at_least(field: &str, value: i64, min: i64) -> Result<(), AppError> {
    if value < min {
        return Err(AppError::Validation(format!("{field} must be >= {min}")));
    }
    Ok(())
}

pub fn require_non_negative_amount(field: &str, value: f64) -> Result<(), AppError> {
    if value.is_nan() || value.is_infinite() {
        return Err(AppError::Validation(format!("{field} must be a finite number")));
    }
    if value < 0.0 {
        return Err(AppError::Validation(format!("{field} must be >= 0")));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date, got '{value}'")))
}
