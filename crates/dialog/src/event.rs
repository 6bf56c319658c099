//! Inbound chat events.

/// One thing a user did in a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub chat_id: i64,
    /// Name shown by the platform, used until the user registers.
    pub display_name: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Text(String),
    Button {
        callback_id: String,
        data: String,
        /// Message the button was attached to.
        message_id: Option<i64>,
    },
    Document {
        file_id: String,
        file_name: String,
    },
}

impl ChatEvent {
    pub fn text(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            display_name: String::new(),
            kind: EventKind::Text(text.into()),
        }
    }

    pub fn button(chat_id: i64, callback_id: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            chat_id,
            display_name: String::new(),
            kind: EventKind::Button {
                callback_id: callback_id.into(),
                data: data.into(),
                message_id: None,
            },
        }
    }

    /// Short kind name for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Text(ref t) if t.starts_with('/') => "command",
            EventKind::Text(_) => "text",
            EventKind::Button { .. } => "button",
            EventKind::Document { .. } => "document",
        }
    }
}
