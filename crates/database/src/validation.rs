//! Input validation for catalog names, quantities, money and months.

use std::fmt;

/// Validation error types.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Empty value where one is required.
    Empty(String),
    /// Value too long.
    TooLong { field: String, max: usize, actual: usize },
    /// Quantity that must be strictly positive.
    NotPositive { field: String, value: f64 },
    /// Money amount that must not be negative.
    Negative { field: String, value: f64 },
    /// Malformed `YYYY-MM` month key.
    InvalidMonth(String),
    /// Tier bounds where `max < min` or `min < 1`.
    InvalidRange { min: i32, max: Option<i32> },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Empty(field) => write!(f, "{} cannot be empty", field),
            ValidationError::TooLong { field, max, actual } => {
                write!(f, "{} is too long ({} chars, max {})", field, actual, max)
            }
            ValidationError::NotPositive { field, value } => {
                write!(f, "{} must be positive, got {}", field, value)
            }
            ValidationError::Negative { field, value } => {
                write!(f, "{} cannot be negative, got {}", field, value)
            }
            ValidationError::InvalidMonth(value) => {
                write!(f, "month must look like YYYY-MM, got '{}'", value)
            }
            ValidationError::InvalidRange { min, max: Some(max) } => {
                write!(f, "invalid range {}-{}", min, max)
            }
            ValidationError::InvalidRange { min, max: None } => {
                write!(f, "invalid range {}+", min)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Maximum allowed length for warehouse, category, material and user names.
pub const MAX_NAME_LENGTH: usize = 128;

/// Validate and trim a display name.
pub fn validate_name(field: &str, name: &str) -> Result<String, ValidationError> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Empty(field.to_string()));
    }

    let len = name.chars().count();
    if len > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
            actual: len,
        });
    }

    Ok(name.to_string())
}

/// Require a finite, strictly positive quantity.
pub fn validate_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ValidationError::NotPositive {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Require a finite, non-negative amount.
pub fn validate_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
            value,
        });
    }
    Ok(())
}

/// Validate a `YYYY-MM` month key.
pub fn validate_month(month: &str) -> Result<(), ValidationError> {
    let bad = || ValidationError::InvalidMonth(month.to_string());

    let (year, mm) = month.split_once('-').ok_or_else(bad)?;
    if year.len() != 4 || mm.len() != 2 {
        return Err(bad());
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    match mm.parse::<u8>() {
        Ok(1..=12) => Ok(()),
        _ => Err(bad()),
    }
}

/// Validate tier bounds.
pub fn validate_range(min: i32, max: Option<i32>) -> Result<(), ValidationError> {
    if min < 1 || max.is_some_and(|max| max < min) {
        return Err(ValidationError::InvalidRange { min, max });
    }
    Ok(())
}
