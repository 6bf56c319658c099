//! Client tests against a mock Bot API server.

use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use telegram::{
    BotClient, BotConfig, InlineKeyboardButton, InlineKeyboardMarkup, ReconnectConfig,
    TelegramError,
};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "42:test";

fn ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
}

async fn mock_get_me(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getMe")))
        .respond_with(ok(json!({
            "id": 42,
            "is_bot": true,
            "first_name": "Salon",
            "username": "salon_bot"
        })))
        .mount(server)
        .await;
}

async fn connect(server: &MockServer) -> BotClient {
    mock_get_me(server).await;
    let config = BotConfig::new(TOKEN)
        .with_api_url(server.uri())
        .with_poll_timeout(Duration::from_secs(0));
    BotClient::connect(config).await.unwrap()
}

fn message(id: i64, chat_id: i64) -> serde_json::Value {
    json!({
        "message_id": id,
        "date": 1700000000,
        "chat": {"id": chat_id, "type": "private"},
        "text": "hi"
    })
}

#[tokio::test]
async fn test_connect_reads_identity() {
    let server = MockServer::start().await;
    let client = connect(&server).await;
    assert_eq!(client.me().username.as_deref(), Some("salon_bot"));
}

#[tokio::test]
async fn test_connect_rejects_bad_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getMe")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "ok": false,
            "error_code": 401,
            "description": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let config = BotConfig::new(TOKEN).with_api_url(server.uri());
    let err = BotClient::connect(config).await.unwrap_err();
    assert!(matches!(err, TelegramError::Api { code: 401, .. }));
}

#[tokio::test]
async fn test_send_keyboard() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_partial_json(json!({
            "chat_id": 7,
            "text": "Pick a place",
            "reply_markup": {
                "inline_keyboard": [[{"text": "Hall", "callback_data": "cons:place:hall"}]]
            }
        })))
        .respond_with(ok(message(11, 7)))
        .expect(1)
        .mount(&server)
        .await;

    let keyboard = InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton::callback("Hall", "cons:place:hall")]],
    };
    let sent = client.send_keyboard(7, "Pick a place", keyboard).await.unwrap();
    assert_eq!(sent.message_id, 11);
}

#[tokio::test]
async fn test_stale_callback_error() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/answerCallbackQuery")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: query is too old and response timeout expired"
        })))
        .mount(&server)
        .await;

    let err = client.answer_callback("q1", None).await.unwrap_err();
    assert!(err.is_stale());
}

#[tokio::test]
async fn test_download_file() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getFile")))
        .and(body_partial_json(json!({"file_id": "F1"})))
        .respond_with(ok(json!({"file_id": "F1", "file_path": "documents/f1.xlsx"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/file/bot{TOKEN}/documents/f1.xlsx")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .mount(&server)
        .await;

    assert_eq!(client.download("F1").await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_send_document() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendDocument")))
        .respond_with(ok(message(12, 7)))
        .expect(1)
        .mount(&server)
        .await;

    let sent = client
        .send_document(7, "stock.xlsx", vec![0u8; 8], telegram::XLSX_MIME, Some("Stock"))
        .await
        .unwrap();
    assert_eq!(sent.message_id, 12);
}

#[tokio::test]
async fn test_update_stream_resumes_after_error() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(body_partial_json(json!({"offset": 0})))
        .respond_with(ok(json!([
            {"update_id": 10, "message": message(1, 7)},
            {"update_id": 11, "message": message(2, 8)}
        ])))
        .mount(&server)
        .await;
    // First poll after the batch fails once, then succeeds from the same offset.
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(body_partial_json(json!({"offset": 12})))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(body_partial_json(json!({"offset": 12})))
        .respond_with(ok(json!([{"update_id": 12, "message": message(3, 7)}])))
        .mount(&server)
        .await;

    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        ..Default::default()
    };
    let updates: Vec<_> = telegram::subscribe_with_reconnect(&client, reconnect)
        .take(3)
        .map(|r| r.unwrap().update_id)
        .collect()
        .await;

    assert_eq!(updates, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_update_stream_gives_up() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let reconnect = ReconnectConfig {
        max_retries: Some(2),
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(2),
        ..Default::default()
    };
    let results: Vec<_> = telegram::subscribe_with_reconnect(&client, reconnect)
        .collect()
        .await;

    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}
