//! Search history and last-used settings.
//!
//! A small persistence layer behind a key-value seam: the application decides
//! where values actually live (settings file, database, whatever), the search
//! UI only cares about recent query texts and the per-root mode/scope it
//! should restore on reopen.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::SearchError;
use crate::search::types::SearchMode;

/// Most-recently-used queries kept per store.
pub const HISTORY_LIMIT: usize = 10;

const HISTORY_KEY: &str = "search.history";

/// String key-value persistence the history layer writes through.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>, SearchError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), SearchError>;
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SearchError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SearchError> {
        self.data
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Mode and scope of the last search under a given root, restored when the
/// search pane reopens there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSearch {
    pub mode: SearchMode,
    pub scope_path: String,
}

/// Query history with MRU ordering and per-root last-search settings.
pub struct SearchHistory<S: KvStore> {
    store: S,
}

impl<S: KvStore> SearchHistory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Record a query text: deduplicated, newest first, capped at
    /// [`HISTORY_LIMIT`]. Blank texts are ignored.
    pub async fn record(&self, text: &str) -> Result<(), SearchError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let mut items = self.recent().await?;
        items.retain(|item| item != text);
        items.insert(0, text.to_string());
        items.truncate(HISTORY_LIMIT);

        let raw = serde_json::to_string(&items).map_err(anyhow::Error::from)?;
        self.store.set(HISTORY_KEY, &raw).await
    }

    /// Recent query texts, newest first.
    pub async fn recent(&self) -> Result<Vec<String>, SearchError> {
        match self.store.get(HISTORY_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).map_err(anyhow::Error::from)?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn save_last(&self, root: &str, last: &LastSearch) -> Result<(), SearchError> {
        let raw = serde_json::to_string(last).map_err(anyhow::Error::from)?;
        self.store.set(&last_key(root), &raw).await
    }

    pub async fn load_last(&self, root: &str) -> Result<Option<LastSearch>, SearchError> {
        match self.store.get(&last_key(root)).await? {
            Some(raw) => Ok(Some(
                serde_json::from_str(&raw).map_err(anyhow::Error::from)?,
            )),
            None => Ok(None),
        }
    }
}

fn last_key(root: &str) -> String {
    format!("search.last:{root}")
}
