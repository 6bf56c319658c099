//! Spreadsheet layouts exchanged with staff as `.xlsx` attachments.
//!
//! Files that describe one warehouse start with a preamble row
//! (`warehouse_id | <id> | warehouse | <name>`) followed by a header row.
//! Readers locate columns by header name, so extra columns are ignored.
//! An empty numeric cell reads as `None`; what that means is up to the caller.

mod cell;
pub mod error;
pub mod prices;
pub mod rates;
pub mod stock;
pub mod supplies;

pub use error::{Result, SheetError};
pub use prices::{read_prices, write_prices, PriceRow, PriceSheet};
pub use rates::{read_rates, write_rates, RateRow};
pub use stock::{read_stock, write_stock, StockRow, StockSheet};
pub use supplies::{write_supplies, SupplyRow};
