//! Parsing of typed user input.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{DialogError, Result};

const MAX_NAME_CHARS: usize = 128;

/// A whole number greater than zero.
pub fn parse_count(text: &str) -> Result<i32> {
    text.trim()
        .parse::<i32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| DialogError::validation("Enter a whole number greater than zero."))
}

fn parse_decimal(text: &str) -> Option<f64> {
    text.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// A quantity greater than zero. A comma is accepted as decimal separator.
pub fn parse_qty(text: &str) -> Result<f64> {
    parse_decimal(text)
        .filter(|v| *v > 0.0)
        .ok_or_else(|| DialogError::validation("Enter a number greater than zero, e.g. 12.5"))
}

/// A non-negative amount of money.
pub fn parse_money(text: &str) -> Result<f64> {
    parse_decimal(text)
        .filter(|v| *v >= 0.0)
        .ok_or_else(|| DialogError::validation("Enter a non-negative amount, e.g. 150 or 99.90"))
}

pub fn parse_name(text: &str) -> Result<String> {
    let name = text.trim();
    if name.is_empty() {
        return Err(DialogError::validation("The name cannot be empty."));
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(DialogError::validation(format!(
            "The name is too long (max {MAX_NAME_CHARS} characters)."
        )));
    }
    Ok(name.to_string())
}

/// An inclusive date range written as `DD.MM.YYYY-DD.MM.YYYY`.
pub fn parse_period(text: &str) -> Result<(NaiveDate, NaiveDate)> {
    let invalid = || DialogError::validation("Use the format DD.MM.YYYY-DD.MM.YYYY");

    let (from, to) = text.trim().split_once('-').ok_or_else(invalid)?;
    let from = NaiveDate::parse_from_str(from.trim(), "%d.%m.%Y").map_err(|_| invalid())?;
    let to = NaiveDate::parse_from_str(to.trim(), "%d.%m.%Y").map_err(|_| invalid())?;

    if from > to {
        return Err(DialogError::validation(
            "The start date must not be after the end date.",
        ));
    }
    Ok((from, to))
}

/// UTC bounds `[from, to)` covering the local dates `from..=to`.
pub fn period_bounds(
    from: NaiveDate,
    to: NaiveDate,
    offset: FixedOffset,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end = to
        .succ_opt()
        .ok_or_else(|| DialogError::validation("The end date is out of range."))?;
    let start = local_midnight(from, offset)?;
    let end = local_midnight(end, offset)?;
    Ok((start, end))
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Result<DateTime<Utc>> {
    offset
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| DialogError::validation("Date is out of range."))
}

/// Subscription month (`YYYY-MM`) of an instant, in the salon's offset.
pub fn month_key(now: DateTime<Utc>, offset: FixedOffset) -> String {
    now.with_timezone(&offset).format("%Y-%m").to_string()
}
