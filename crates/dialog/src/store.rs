//! Dialog persistence.

use std::collections::HashMap;

use async_trait::async_trait;
use database::{dialog_state, PgPool};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::state::Dialog;

/// Per-chat dialog storage. No stored dialog means idle.
#[async_trait]
pub trait DialogStore: Send + Sync {
    async fn load(&self, chat_id: i64) -> Result<Option<Dialog>>;

    async fn save(&self, chat_id: i64, dialog: &Dialog) -> Result<()>;

    /// Forget the dialog, returning the chat to idle.
    async fn reset(&self, chat_id: i64) -> Result<()>;
}

/// Dialogs stored in the `dialog_states` table.
#[derive(Debug, Clone)]
pub struct PgDialogStore {
    pool: PgPool,
}

impl PgDialogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DialogStore for PgDialogStore {
    async fn load(&self, chat_id: i64) -> Result<Option<Dialog>> {
        let Some(row) = dialog_state::get_state(&self.pool, chat_id).await? else {
            return Ok(None);
        };
        Dialog::decode(&row.state, row.payload.0).map(Some)
    }

    async fn save(&self, chat_id: i64, dialog: &Dialog) -> Result<()> {
        let (state, payload) = dialog.encode()?;
        dialog_state::set_state(&self.pool, chat_id, state, &payload).await?;
        Ok(())
    }

    async fn reset(&self, chat_id: i64) -> Result<()> {
        dialog_state::reset_state(&self.pool, chat_id).await?;
        Ok(())
    }
}

/// In-memory dialogs, for tests and local runs.
///
/// Dialogs go through the same encoding as the database store so that
/// anything that would fail to persist fails here too.
#[derive(Debug, Default)]
pub struct MemoryDialogStore {
    dialogs: RwLock<HashMap<i64, (String, serde_json::Value)>>,
}

impl MemoryDialogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chats with a stored dialog.
    pub async fn len(&self) -> usize {
        self.dialogs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.dialogs.read().await.is_empty()
    }
}

#[async_trait]
impl DialogStore for MemoryDialogStore {
    async fn load(&self, chat_id: i64) -> Result<Option<Dialog>> {
        match self.dialogs.read().await.get(&chat_id) {
            Some((state, payload)) => Dialog::decode(state, payload.clone()).map(Some),
            None => Ok(None),
        }
    }

    async fn save(&self, chat_id: i64, dialog: &Dialog) -> Result<()> {
        let (state, payload) = dialog.encode()?;
        self.dialogs
            .write()
            .await
            .insert(chat_id, (state.to_string(), payload));
        Ok(())
    }

    async fn reset(&self, chat_id: i64) -> Result<()> {
        self.dialogs.write().await.remove(&chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Step;

    #[tokio::test]
    async fn test_memory_store_set_get_reset() {
        let store = MemoryDialogStore::new();
        assert_eq!(store.load(1).await.unwrap(), None);

        let dialog = Dialog::new(Step::WhRename { warehouse_id: 4 }, Some(10));
        store.save(1, &dialog).await.unwrap();
        assert_eq!(store.load(1).await.unwrap(), Some(dialog));

        store.reset(1).await.unwrap();
        assert_eq!(store.load(1).await.unwrap(), None);
        assert!(store.is_empty().await);
    }
}
