//! Glue between the Telegram client and the dialog controller.

use std::sync::Arc;

use async_trait::async_trait;
use dialog::{ButtonAction, ChatEvent, ChatSender, DialogError, EventKind, Keyboard};
use futures::{Stream, StreamExt};
use telegram::{
    BotClient, InlineKeyboardButton, InlineKeyboardMarkup, TelegramError, Update, XLSX_MIME,
};
use tracing::{debug, error};

use crate::metrics::Metrics;

/// [`ChatSender`] over the Bot API.
#[derive(Clone)]
pub struct TelegramSender {
    client: BotClient,
}

impl TelegramSender {
    pub fn new(client: BotClient) -> Self {
        Self { client }
    }
}

fn transport(e: TelegramError) -> DialogError {
    DialogError::Transport(e.to_string())
}

/// Convert a dialog keyboard to Bot API markup.
pub fn markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: keyboard
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|b| match &b.action {
                        ButtonAction::Callback(data) => {
                            InlineKeyboardButton::callback(&b.text, data)
                        }
                        ButtonAction::Url(url) => InlineKeyboardButton::url(&b.text, url),
                    })
                    .collect()
            })
            .collect(),
    }
}

#[async_trait]
impl ChatSender for TelegramSender {
    async fn send_text(&self, chat_id: i64, text: &str) -> dialog::Result<i64> {
        let message = self.client.send_text(chat_id, text).await.map_err(transport)?;
        Ok(message.message_id)
    }

    async fn send_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: &Keyboard,
    ) -> dialog::Result<i64> {
        let message = self
            .client
            .send_keyboard(chat_id, text, markup(keyboard))
            .await
            .map_err(transport)?;
        Ok(message.message_id)
    }

    async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> dialog::Result<()> {
        match self.client.clear_keyboard(chat_id, message_id).await {
            Err(e) if e.is_stale() => {
                debug!(chat_id, message_id, "Keyboard already gone: {}", e);
                Ok(())
            }
            other => other.map_err(transport),
        }
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> dialog::Result<()> {
        match self.client.answer_callback(callback_id, text).await {
            Err(e) if e.is_stale() => {
                debug!(callback_id, "Callback expired: {}", e);
                Ok(())
            }
            other => other.map_err(transport),
        }
    }

    async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        caption: Option<&str>,
    ) -> dialog::Result<()> {
        self.client
            .send_document(chat_id, file_name, bytes, XLSX_MIME, caption)
            .await
            .map_err(transport)?;
        Ok(())
    }

    async fn fetch_document(&self, file_id: &str) -> dialog::Result<Vec<u8>> {
        self.client.download(file_id).await.map_err(transport)
    }
}

/// Turn an update into a chat event. Updates the bot does not act on
/// (stickers, photos, button presses without data) give `None`.
pub fn update_to_event(update: &Update) -> Option<ChatEvent> {
    if let Some(query) = &update.callback_query {
        let data = query.data.clone()?;
        let chat_id = query
            .message
            .as_ref()
            .map(|m| m.chat.id)
            .unwrap_or(query.from.id);
        return Some(ChatEvent {
            chat_id,
            display_name: query.from.display_name(),
            kind: EventKind::Button {
                callback_id: query.id.clone(),
                data,
                message_id: query.message.as_ref().map(|m| m.message_id),
            },
        });
    }

    let message = update.message.as_ref()?;
    let display_name = message
        .from
        .as_ref()
        .map(|u| u.display_name())
        .unwrap_or_default();

    let kind = if let Some(document) = &message.document {
        EventKind::Document {
            file_id: document.file_id.clone(),
            file_name: document.file_name.clone().unwrap_or_default(),
        }
    } else {
        EventKind::Text(message.text.clone()?)
    };

    Some(ChatEvent {
        chat_id: message.chat.id,
        display_name,
        kind,
    })
}

/// Chat events from a stream of updates, counting every update received.
pub fn chat_events<St>(updates: St, metrics: Arc<Metrics>) -> impl Stream<Item = ChatEvent> + Send
where
    St: Stream<Item = Result<Update, TelegramError>> + Send,
{
    updates.filter_map(move |result| {
        let metrics = Arc::clone(&metrics);
        async move {
            match result {
                Ok(update) => {
                    metrics.update_received();
                    let event = update_to_event(&update);
                    if event.is_none() {
                        debug!(update_id = update.update_id, "Ignoring update");
                    }
                    event
                }
                Err(e) => {
                    error!("Update stream error: {}", e);
                    None
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use dialog::{Button, Callback};
    use serde_json::json;
    use telegram::BotConfig;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const TOKEN: &str = "42:test";

    fn update(value: serde_json::Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_button_event() {
        let event = update_to_event(&update(json!({
            "update_id": 1,
            "callback_query": {
                "id": "cb-9",
                "from": {"id": 7, "first_name": "Anna", "last_name": "K"},
                "message": {
                    "message_id": 100,
                    "chat": {"id": 7, "type": "private"}
                },
                "data": "cons:place:hall"
            }
        })))
        .unwrap();

        assert_eq!(event.chat_id, 7);
        assert_eq!(event.display_name, "Anna K");
        assert_eq!(
            event.kind,
            EventKind::Button {
                callback_id: "cb-9".into(),
                data: "cons:place:hall".into(),
                message_id: Some(100),
            }
        );
    }

    #[test]
    fn test_text_and_document_events() {
        let text = update_to_event(&update(json!({
            "update_id": 2,
            "message": {
                "message_id": 5,
                "chat": {"id": 9, "type": "private"},
                "from": {"id": 9, "first_name": "Oleg"},
                "text": "/start"
            }
        })))
        .unwrap();
        assert_eq!(text.kind, EventKind::Text("/start".into()));
        assert_eq!(text.kind_name(), "command");

        let doc = update_to_event(&update(json!({
            "update_id": 3,
            "message": {
                "message_id": 6,
                "chat": {"id": 9, "type": "private"},
                "document": {"file_id": "F1", "file_name": "stock.xlsx"}
            }
        })))
        .unwrap();
        assert_eq!(
            doc.kind,
            EventKind::Document {
                file_id: "F1".into(),
                file_name: "stock.xlsx".into(),
            }
        );
    }

    #[test]
    fn test_ignored_updates() {
        let sticker = update(json!({
            "update_id": 4,
            "message": {"message_id": 7, "chat": {"id": 9, "type": "private"}}
        }));
        assert!(update_to_event(&sticker).is_none());

        let empty = update(json!({"update_id": 5}));
        assert!(update_to_event(&empty).is_none());
    }

    #[tokio::test]
    async fn test_chat_events_counts_updates() {
        let metrics = Arc::new(Metrics::new());
        let updates = futures::stream::iter(vec![
            Ok(update(json!({
                "update_id": 1,
                "message": {"message_id": 1, "chat": {"id": 3, "type": "private"}, "text": "hi"}
            }))),
            Ok(update(json!({"update_id": 2}))),
            Err(TelegramError::EmptyResult("getUpdates".into())),
        ]);

        let events: Vec<ChatEvent> = chat_events(updates, Arc::clone(&metrics)).collect().await;
        assert_eq!(events, vec![ChatEvent::text(3, "hi")]);
        assert_eq!(metrics.updates_received(), 2);
    }

    #[test]
    fn test_markup() {
        let keyboard = Keyboard::new()
            .row(vec![Button::url("💳 Pay", "https://pay.example.com/payments/pay?invoice=1")])
            .home();
        let markup = markup(&keyboard);
        assert_eq!(markup.inline_keyboard.len(), 2);
        assert_eq!(
            markup.inline_keyboard[0][0].url.as_deref(),
            Some("https://pay.example.com/payments/pay?invoice=1")
        );
        assert_eq!(
            markup.inline_keyboard[1][0].callback_data,
            Some(Callback::MainMenu.to_string())
        );
    }

    async fn sender(server: &MockServer) -> TelegramSender {
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/getMe")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"id": 42, "is_bot": true, "first_name": "Salon"}
            })))
            .mount(server)
            .await;
        let config = BotConfig::new(TOKEN)
            .with_api_url(server.uri())
            .with_poll_timeout(Duration::from_secs(0));
        TelegramSender::new(BotClient::connect(config).await.unwrap())
    }

    fn api_error(code: i32, description: &str) -> ResponseTemplate {
        ResponseTemplate::new(code as u16).set_body_json(json!({
            "ok": false,
            "error_code": code,
            "description": description
        }))
    }

    #[tokio::test]
    async fn test_send_keyboard_returns_message_id() {
        let server = MockServer::start().await;
        let sender = sender(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .and(body_partial_json(json!({
                "chat_id": 7,
                "reply_markup": {"inline_keyboard": [[{"text": "🏠 Main menu", "callback_data": "nav:menu"}]]}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"message_id": 55, "chat": {"id": 7, "type": "private"}}
            })))
            .mount(&server)
            .await;

        let id = sender
            .send_keyboard(7, "Main menu", &Keyboard::new().home())
            .await
            .unwrap();
        assert_eq!(id, 55);
    }

    #[tokio::test]
    async fn test_stale_keyboard_is_not_an_error() {
        let server = MockServer::start().await;
        let sender = sender(&server).await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/editMessageReplyMarkup")))
            .respond_with(api_error(400, "Bad Request: message is not modified"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/bot{TOKEN}/sendMessage")))
            .respond_with(api_error(403, "Forbidden: bot was blocked by the user"))
            .mount(&server)
            .await;

        sender.clear_keyboard(7, 100).await.unwrap();
        let err = sender.send_text(7, "hi").await.unwrap_err();
        assert!(matches!(err, DialogError::Transport(_)));
    }
}
