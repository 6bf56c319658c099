//! Per-chat dialog state persistence.

use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::DialogStateRow;

/// Load the stored state of a chat. `None` means idle.
pub async fn get_state(pool: &PgPool, chat_id: i64) -> Result<Option<DialogStateRow>> {
    let row = sqlx::query_as::<_, DialogStateRow>(
        r#"
        SELECT chat_id, state, payload, updated_at
        FROM dialog_states
        WHERE chat_id = $1
        "#,
    )
    .bind(chat_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Write the state and payload of a chat.
pub async fn set_state(pool: &PgPool, chat_id: i64, state: &str, payload: &Value) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO dialog_states (chat_id, state, payload, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (chat_id) DO UPDATE SET
            state = EXCLUDED.state,
            payload = EXCLUDED.payload,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(chat_id)
    .bind(state)
    .bind(Json(payload))
    .execute(pool)
    .await?;

    Ok(())
}

/// Drop the state of a chat, returning it to idle.
pub async fn reset_state(pool: &PgPool, chat_id: i64) -> Result<()> {
    sqlx::query("DELETE FROM dialog_states WHERE chat_id = $1")
        .bind(chat_id)
        .execute(pool)
        .await?;

    Ok(())
}
