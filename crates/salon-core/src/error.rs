//! Error types for the core crate.

use thiserror::Error;

use crate::domain::{Place, RentUnit};

/// A text value that does not name any variant of a closed vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    /// Name of the enum that rejected the value.
    pub kind: &'static str,
    /// The rejected text.
    pub value: String,
}

/// Errors produced by the pricing engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    /// No active tier covers the requested quantity.
    #[error("no active tariff for {place}/{unit} (subscription: {with_sub}) at qty {qty}")]
    TariffMissing {
        place: Place,
        unit: RentUnit,
        with_sub: bool,
        qty: i32,
    },

    /// The session input is malformed.
    #[error("invalid pricing input: {0}")]
    InvalidInput(String),
}

/// Result type for pricing operations.
pub type Result<T> = std::result::Result<T, PricingError>;
