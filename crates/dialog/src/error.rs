//! Error types for dialog handling.

use database::DatabaseError;
use salon_core::PricingError;
use sheets::SheetError;
use thiserror::Error;

/// Errors that can occur while handling a chat event.
#[derive(Debug, Error)]
pub enum DialogError {
    /// Bad input for the current step. The step does not advance.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced record is gone.
    #[error("not found: {0}")]
    NotFound(String),

    /// Subscription usage would exceed the bucket.
    #[error("subscription {subscription_id} has {left} left, {requested} requested")]
    InsufficientLimit {
        subscription_id: i64,
        requested: i32,
        left: i32,
    },

    /// The caller lacks the role for this action.
    #[error("access denied")]
    AccessDenied,

    /// Storage failure.
    #[error("store error: {0}")]
    Store(#[source] DatabaseError),

    /// No tariff tier covers part of a session.
    #[error("tariff missing: {0}")]
    TariffMissing(String),

    /// Malformed callback, stale button or undecodable state.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Chat transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Spreadsheet could not be read or written.
    #[error("sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// The event was cancelled by shutdown.
    #[error("cancelled")]
    Cancelled,
}

impl DialogError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Text shown to the user in chat.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => format!("⚠️ {msg}"),
            Self::NotFound(what) => format!("Not found: {what}."),
            Self::InsufficientLimit { left, .. } => {
                format!("Not enough left on the subscription ({left} remaining).")
            }
            Self::AccessDenied => "Access denied.".to_string(),
            Self::TariffMissing(_) => {
                "No active tariff covers this session. The administrator has been asked to configure tariffs."
                    .to_string()
            }
            Self::Protocol(_) => "This action is no longer relevant.".to_string(),
            Self::Sheet(e) => format!("Could not read the file: {e}"),
            Self::Store(_) | Self::Transport(_) | Self::Cancelled => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    /// Whether the handler recovers inside the dialog instead of failing the event.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Transport(_) | Self::Cancelled)
    }
}

impl From<DatabaseError> for DialogError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity, id } => Self::NotFound(format!("{entity} {id}")),
            DatabaseError::AlreadyExists { entity, id } => {
                Self::Validation(format!("{entity} '{id}' already exists"))
            }
            DatabaseError::Validation(e) => Self::Validation(e.to_string()),
            DatabaseError::InsufficientLimit {
                subscription_id,
                requested,
                left,
            } => Self::InsufficientLimit {
                subscription_id,
                requested,
                left,
            },
            other => Self::Store(other),
        }
    }
}

impl From<PricingError> for DialogError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::TariffMissing { .. } => Self::TariffMissing(err.to_string()),
            PricingError::InvalidInput(msg) => Self::Validation(msg),
        }
    }
}

/// Result type for dialog operations.
pub type Result<T> = std::result::Result<T, DialogError>;
