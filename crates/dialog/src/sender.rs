//! Outbound chat trait and implementations.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::keyboard::Keyboard;

/// Trait for talking back to a chat.
///
/// Abstracted to support different transports (Telegram, tests, etc.)
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Send plain text. Returns the message id.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64>;

    /// Send text with an inline keyboard. Returns the message id.
    async fn send_keyboard(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> Result<i64>;

    /// Strip the inline keyboard from an earlier message.
    async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Acknowledge a button press, optionally with a toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()>;

    /// Send a file.
    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> Result<()>;

    /// Download a file the user uploaded.
    async fn fetch_document(&self, file_id: &str) -> Result<Vec<u8>>;
}

/// A no-op sender for testing that discards all messages.
#[derive(Debug, Default)]
pub struct NoOpSender;

#[async_trait]
impl ChatSender for NoOpSender {
    async fn send_text(&self, _chat_id: i64, _text: &str) -> Result<i64> {
        Ok(0)
    }

    async fn send_keyboard(&self, _chat_id: i64, _text: &str, _keyboard: &Keyboard) -> Result<i64> {
        Ok(0)
    }

    async fn clear_keyboard(&self, _chat_id: i64, _message_id: i64) -> Result<()> {
        Ok(())
    }

    async fn answer_callback(&self, _callback_id: &str, _text: Option<&str>) -> Result<()> {
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: i64,
        _file_name: &str,
        _bytes: Vec<u8>,
        _caption: Option<&str>,
    ) -> Result<()> {
        Ok(())
    }

    async fn fetch_document(&self, _file_id: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// A logging sender for debugging that logs all operations.
#[derive(Debug, Default)]
pub struct LoggingSender;

#[async_trait]
impl ChatSender for LoggingSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64> {
        tracing::info!(chat_id, "Sending text: {}", text);
        Ok(0)
    }

    async fn send_keyboard(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> Result<i64> {
        let tags: Vec<&str> = keyboard.callbacks().collect();
        tracing::info!(chat_id, ?tags, "Sending keyboard: {}", text);
        Ok(0)
    }

    async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> Result<()> {
        tracing::info!(chat_id, message_id, "Clearing keyboard");
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> Result<()> {
        tracing::info!(callback_id, ?text, "Answering callback");
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        _caption: Option<&str>,
    ) -> Result<()> {
        tracing::info!(chat_id, file_name, size = bytes.len(), "Sending document");
        Ok(())
    }

    async fn fetch_document(&self, file_id: &str) -> Result<Vec<u8>> {
        tracing::info!(file_id, "Fetching document");
        Ok(Vec::new())
    }
}

/// One outbound operation seen by [`RecordingSender`].
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Text { chat_id: i64, text: String },
    Keyboard { chat_id: i64, text: String, keyboard: Keyboard },
    Cleared { chat_id: i64, message_id: i64 },
    Answered { callback_id: String },
    Document { chat_id: i64, file_name: String },
}

/// An in-memory sender that records everything, for tests.
///
/// Message ids are handed out sequentially starting at 1. Uploaded files are
/// served from `files`.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `bytes` downloadable as `file_id`.
    pub async fn add_file(&self, file_id: &str, bytes: Vec<u8>) {
        self.files.lock().await.push((file_id.to_string(), bytes));
    }

    pub async fn sent(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    /// Text of every message sent to `chat_id`.
    pub async fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .filter_map(|s| match s {
                Sent::Text { chat_id: c, text } | Sent::Keyboard { chat_id: c, text, .. }
                    if *c == chat_id =>
                {
                    Some(text.clone())
                }
                _ => None,
            })
            .collect()
    }

    async fn record(&self, sent: Sent) -> i64 {
        self.sent.lock().await.push(sent);
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl ChatSender for RecordingSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<i64> {
        Ok(self
            .record(Sent::Text {
                chat_id,
                text: text.to_string(),
            })
            .await)
    }

    async fn send_keyboard(&self, chat_id: i64, text: &str, keyboard: &Keyboard) -> Result<i64> {
        Ok(self
            .record(Sent::Keyboard {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.clone(),
            })
            .await)
    }

    async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> Result<()> {
        self.record(Sent::Cleared {
            chat_id,
            message_id,
        })
        .await;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, _text: Option<&str>) -> Result<()> {
        self.record(Sent::Answered {
            callback_id: callback_id.to_string(),
        })
        .await;
        Ok(())
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        _bytes: Vec<u8>,
        _caption: Option<&str>,
    ) -> Result<()> {
        self.record(Sent::Document {
            chat_id,
            file_name: file_name.to_string(),
        })
        .await;
        Ok(())
    }

    async fn fetch_document(&self, file_id: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .await
            .iter()
            .find(|(id, _)| id == file_id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| crate::DialogError::Transport(format!("no file {file_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::Callback;

    #[tokio::test]
    async fn test_noop_sender() {
        let sender = NoOpSender;

        // Should not error
        sender.send_text(1, "test").await.unwrap();
        sender.clear_keyboard(1, 2).await.unwrap();
        sender.answer_callback("cb", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_logging_sender() {
        let sender = LoggingSender;
        let kb = Keyboard::new().button("Back", Callback::Back);

        // Should not error
        sender.send_keyboard(1, "menu", &kb).await.unwrap();
        sender.send_document(1, "stock.xlsx", vec![1, 2], None).await.unwrap();
    }

    #[tokio::test]
    async fn test_recording_sender_numbers_messages() {
        let sender = RecordingSender::new();
        let first = sender.send_text(5, "one").await.unwrap();
        let second = sender
            .send_keyboard(5, "two", &Keyboard::new().nav())
            .await
            .unwrap();
        sender.send_text(6, "other chat").await.unwrap();

        assert_eq!((first, second), (1, 2));
        assert_eq!(sender.texts_for(5).await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_recording_sender_serves_files() {
        let sender = RecordingSender::new();
        sender.add_file("f1", b"PK".to_vec()).await;

        assert_eq!(sender.fetch_document("f1").await.unwrap(), b"PK");
        assert!(sender.fetch_document("f2").await.is_err());
    }
}
