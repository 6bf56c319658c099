//! Bot API HTTP client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::BotConfig;
use crate::error::TelegramError;
use crate::types::{
    AnswerCallbackParams, EditReplyMarkupParams, File, GetFileParams, GetUpdatesParams,
    InlineKeyboardMarkup, Message, SendMessageParams, Update, User,
};

/// MIME type used for spreadsheet attachments.
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i32>,
}

/// Client for the Telegram Bot API.
#[derive(Clone)]
pub struct BotClient {
    http: Client,
    config: Arc<BotConfig>,
    me: Arc<User>,
}

impl BotClient {
    /// Build a client and verify the token with `getMe`.
    pub async fn connect(config: BotConfig) -> Result<Self, TelegramError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(TelegramError::Http)?;

        let mut client = Self {
            http,
            config: Arc::new(config),
            me: Arc::new(User {
                id: 0,
                is_bot: true,
                first_name: String::new(),
                last_name: None,
                username: None,
            }),
        };

        let me: User = client.api_call::<(), _>("getMe", None).await?;
        info!(
            "Connected to Bot API as @{} ({})",
            me.username.as_deref().unwrap_or("?"),
            me.id
        );
        client.me = Arc::new(me);

        Ok(client)
    }

    /// The bot's own account.
    pub fn me(&self) -> &User {
        &self.me
    }

    /// Get the configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Send a message.
    pub async fn send(&self, params: SendMessageParams) -> Result<Message, TelegramError> {
        self.api_call("sendMessage", Some(params)).await
    }

    /// Send plain text to a chat.
    pub async fn send_text(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        self.send(SendMessageParams::text(chat_id, text)).await
    }

    /// Send text with an inline keyboard.
    pub async fn send_keyboard(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<Message, TelegramError> {
        self.send(SendMessageParams::text(chat_id, text).with_keyboard(keyboard))
            .await
    }

    /// Remove the inline keyboard of a message.
    pub async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let params = EditReplyMarkupParams {
            chat_id,
            message_id,
            reply_markup: None,
        };
        // Returns the edited message, or `true` for inline messages.
        let _: serde_json::Value = self.api_call("editMessageReplyMarkup", Some(params)).await?;
        Ok(())
    }

    /// Acknowledge a callback query, optionally showing a toast.
    pub async fn answer_callback(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
    ) -> Result<(), TelegramError> {
        let params = AnswerCallbackParams {
            callback_query_id: callback_query_id.to_string(),
            text: text.map(str::to_string),
            show_alert: false,
        };
        let _: bool = self.api_call("answerCallbackQuery", Some(params)).await?;
        Ok(())
    }

    /// Resolve a file id to its download path.
    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.api_call("getFile", Some(GetFileParams { file_id })).await
    }

    /// Download a file by id.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::NoFilePath(file_id.to_string()))?;

        debug!("Downloading file {}", file_id);
        let response = self
            .http
            .get(self.config.file_url(&path))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Upload a document.
    pub async fn send_document(
        &self,
        chat_id: i64,
        file_name: &str,
        bytes: Vec<u8>,
        mime: &str,
        caption: Option<&str>,
    ) -> Result<Message, TelegramError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime)?;
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        if let Some(caption) = caption {
            form = form.text("caption", caption.to_string());
        }

        debug!("API call: sendDocument ({})", file_name);
        let response = self
            .http
            .post(self.config.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;

        Self::unwrap_response("sendDocument", response).await
    }

    /// Fetch pending updates starting at `offset`, waiting up to the poll timeout.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        let timeout = self.config.poll_timeout;
        let params = GetUpdatesParams {
            offset,
            timeout: timeout.as_secs(),
            allowed_updates: vec!["message", "callback_query"],
        };

        let response = self
            .http
            .post(self.config.method_url("getUpdates"))
            .timeout(timeout + Duration::from_secs(10))
            .json(&params)
            .send()
            .await?;

        Self::unwrap_response("getUpdates", response).await
    }

    /// Call a Bot API method with a JSON body.
    async fn api_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, TelegramError> {
        debug!("API call: {}", method);

        let mut request = self.http.post(self.config.method_url(method));
        if let Some(params) = params {
            request = request.json(&params);
        }
        let response = request.send().await?;

        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<R: for<'de> Deserialize<'de>>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<R, TelegramError> {
        let status = response.status();
        let body = response.bytes().await?;

        let parsed: ApiResponse<R> = match serde_json::from_slice(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(TelegramError::Json(e)),
            Err(_) => {
                return Err(TelegramError::Api {
                    code: i32::from(status.as_u16()),
                    description: String::from_utf8_lossy(&body).into_owned(),
                })
            }
        };

        if !parsed.ok {
            return Err(TelegramError::Api {
                code: parsed.error_code.unwrap_or(i32::from(status.as_u16())),
                description: parsed.description.unwrap_or_default(),
            });
        }

        parsed
            .result
            .ok_or_else(|| TelegramError::EmptyResult(method.to_string()))
    }
}

impl std::fmt::Debug for BotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotClient")
            .field("config", &self.config)
            .field("bot_id", &self.me.id)
            .finish()
    }
}
