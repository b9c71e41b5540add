use chrono::{NaiveDate, NaiveTime, Timelike, Weekday};

use crate::error::ApiError;

/// Helper function to format the date
///
/// This function takes a `NaiveDate` and formats it as a string in the "dd-mm-yyyy" format.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Trims a required text field, rejecting blanks.
pub fn required_text(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::ValidationFailed(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trims an optional text field; blank values are stored as NULL.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trims an optional field of a partial update. `None` leaves the column
/// alone; a blank string is kept as `""` and clears it.
pub fn cleared_text(value: Option<&str>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

/// Parses a comma separated weekday list such as `Mon,Wed,Fri`.
pub fn parse_available_days(days: &str) -> Result<Vec<Weekday>, ApiError> {
    let parsed = days
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|d| {
            d.parse::<Weekday>()
                .map_err(|_| ApiError::ValidationFailed(format!("Unknown weekday '{d}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if parsed.is_empty() {
        return Err(ApiError::ValidationFailed(
            "available_days must name at least one weekday".to_string(),
        ));
    }
    Ok(parsed)
}

/// Canonical storage form of a weekday list: `Mon,Tue,...` in week order.
pub fn normalize_available_days(days: &str) -> Result<String, ApiError> {
    let mut parsed = parse_available_days(days)?;
    parsed.sort_by_key(|d| d.num_days_from_monday());
    parsed.dedup();
    Ok(parsed
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(","))
}

pub fn validate_window(start: NaiveTime, end: NaiveTime) -> Result<(), ApiError> {
    if start >= end {
        return Err(ApiError::ValidationFailed(
            "available_start must be before available_end".to_string(),
        ));
    }
    Ok(())
}

/// Slots have minute granularity; seconds are dropped so `09:30` and
/// `09:30:15` name the same slot.
pub fn slot_time(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}
