//! Domain vocabulary and the rent pricing engine for the salon bot.
//!
//! Nothing in this crate performs I/O. It defines:
//!
//! - [`Place`], [`RentUnit`], [`Role`] and the other closed vocabularies
//! - [`RateTier`] / [`Ladder`] - the tiered rent-rate ladder and tier selection
//! - [`split_quantity`] - FIFO split of a session over subscription buckets
//! - [`quote`] - pricing of a split session against a shared materials budget
//!
//! # Example
//!
//! ```rust
//! use salon_core::{quote, split_quantity, Bucket, Ladder, Place, RateTier, RentUnit};
//!
//! let tier = RateTier {
//!     id: 1,
//!     place: Place::Hall,
//!     unit: RentUnit::Hour,
//!     with_sub: false,
//!     min_qty: 1,
//!     max_qty: None,
//!     threshold: 50.0,
//!     price_with: 500.0,
//!     price_own: 600.0,
//!     active: true,
//! };
//! let ladder = Ladder::new(Place::Hall, RentUnit::Hour, vec![tier]);
//!
//! let parts = split_quantity(10, &[] as &[Bucket]);
//! let quote = quote(&ladder, 450.0, &parts).unwrap();
//! assert_eq!(quote.rent_total, 6000.0);
//! ```
//!
//! With the `sqlx` feature, every vocabulary enum maps to a Postgres `TEXT`
//! column and [`RateTier`] derives `FromRow`.

pub mod domain;
pub mod error;
pub mod pricing;
pub mod split;
pub mod tiers;

pub use domain::{
    InvoiceStatus, MaterialUnit, MovementKind, Place, RentUnit, Role, SessionStatus, UserStatus,
    WarehouseKind,
};
pub use error::{ParseEnumError, PricingError, Result};
pub use pricing::{quote, PartQuote, Quote};
pub use split::{split_quantity, Bucket, SessionPart};
pub use tiers::{select_tier, Ladder, RateTier};
