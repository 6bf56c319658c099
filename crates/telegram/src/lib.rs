//! Telegram Bot API client library.
//!
//! This crate provides a Rust client for the Telegram Bot API over HTTPS.
//! It supports:
//!
//! - Sending messages with inline keyboards and removing keyboards
//! - Answering callback queries
//! - Downloading files and uploading documents
//! - Receiving updates via a long-poll stream with backoff
//!
//! # Example
//!
//! ```no_run
//! use telegram::{BotClient, BotConfig};
//!
//! # async fn example() -> Result<(), telegram::TelegramError> {
//! let client = BotClient::connect(BotConfig::new("123:token")).await?;
//!
//! use futures::StreamExt;
//! let mut updates = telegram::subscribe(&client);
//! while let Some(result) = updates.next().await {
//!     match result {
//!         Ok(update) => {
//!             if let Some(message) = update.message {
//!                 client.send_text(message.chat.id, "Hello!").await?;
//!             }
//!         }
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;
pub mod updates;

pub use client::{BotClient, XLSX_MIME};
pub use config::{BotConfig, DEFAULT_API_URL};
pub use error::TelegramError;
pub use types::*;
pub use updates::{subscribe, subscribe_with_reconnect, ReconnectConfig, UpdateStream};
