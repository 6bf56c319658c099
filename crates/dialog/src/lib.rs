//! Per-chat dialog state machine for the salon back-office bot.
//!
//! Every chat has at most one stored [`Dialog`]: the current [`Step`] with its
//! payload, plus the id of the last message carrying buttons. The
//! [`Controller`] turns one [`ChatEvent`] into a transition:
//!
//! - parse the button tag ([`Callback`]) or the typed text for the step
//! - call into the database and the pricing engine
//! - render the next screen through a [`ChatSender`] and persist the dialog
//!
//! Transports stay outside this crate; anything implementing [`ChatSender`]
//! can drive it. Tests use [`RecordingSender`] and [`MemoryDialogStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use chrono::FixedOffset;
//! use dialog::{ChatEvent, Controller, DialogSettings, LoggingSender, PgDialogStore};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(pool: database::PgPool) -> dialog::Result<()> {
//! let settings = DialogSettings {
//!     admin_chat_id: 1,
//!     offset: FixedOffset::east_opt(3 * 3600).unwrap(),
//!     payment_base_url: "https://salon.example.com".into(),
//! };
//! let store = Arc::new(PgDialogStore::new(pool.clone()));
//! let controller = Controller::new(pool, store, LoggingSender, settings);
//!
//! controller
//!     .handle(ChatEvent::text(42, "/start"), &CancellationToken::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod controller;
pub mod error;
pub mod event;
pub mod format;
pub mod import;
pub mod input;
pub mod keyboard;
pub mod notify;
pub mod sender;
pub mod state;
pub mod store;

pub use callback::{Access, Callback, MenuEntry, MAX_TAG_LEN};
pub use controller::{Controller, DialogSettings, Stats};
pub use error::{DialogError, Result};
pub use event::{ChatEvent, EventKind};
pub use keyboard::{Button, ButtonAction, Keyboard};
pub use sender::{ChatSender, LoggingSender, NoOpSender, RecordingSender, Sent};
pub use state::{Dialog, Step};
pub use store::{DialogStore, MemoryDialogStore, PgDialogStore};
