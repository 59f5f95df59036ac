use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::domain::{ControlId, WorkspaceRecord};
use tokio::sync::RwLock;
use tracing::{debug, warn};

mod sqlite;

pub use sqlite::SqliteBackend;

pub const DEFAULT_KEY_PREFIX: &str = "grc-copilot-assessment-";

/// `set` replaces the whole value in one step.
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

#[derive(Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[derive(Clone)]
pub struct WorkspaceStore {
    backend: Arc<dyn KeyValueBackend>,
    key_prefix: String,
}

impl WorkspaceStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self::with_key_prefix(backend, DEFAULT_KEY_PREFIX)
    }

    pub fn with_key_prefix(backend: Arc<dyn KeyValueBackend>, key_prefix: impl Into<String>) -> Self {
        Self {
            backend,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn key_for(&self, control_id: &ControlId) -> String {
        format!("{}{}", self.key_prefix, control_id)
    }

    /// Unreadable or malformed entries read as `None`.
    pub async fn read(&self, control_id: &ControlId) -> Option<WorkspaceRecord> {
        let key = self.key_for(control_id);
        let raw = match self.backend.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                warn!(%key, %error, "workspace storage unavailable; treating record as absent");
                return None;
            }
        };

        match serde_json::from_str::<WorkspaceRecord>(&raw) {
            Ok(record) if record.control_id() == control_id => Some(record),
            Ok(record) => {
                warn!(
                    %key,
                    stored_control_id = %record.control_id(),
                    "stored workspace belongs to another control; treating record as absent"
                );
                None
            }
            Err(error) => {
                warn!(%key, %error, "malformed workspace record; treating record as absent");
                None
            }
        }
    }

    pub async fn write(&self, record: &mut WorkspaceRecord) -> Result<()> {
        record.touch(Utc::now());
        let key = self.key_for(record.control_id());
        let value = serde_json::to_string(record).context("failed to serialize workspace record")?;
        self.backend
            .set(&key, &value)
            .await
            .with_context(|| format!("failed to persist workspace record '{key}'"))?;
        debug!(%key, status = %record.status(), "persisted workspace record");
        Ok(())
    }

    pub async fn delete(&self, control_id: &ControlId) -> Result<()> {
        let key = self.key_for(control_id);
        self.backend
            .remove(&key)
            .await
            .with_context(|| format!("failed to delete workspace record '{key}'"))
    }

    pub async fn list(&self) -> Result<Vec<WorkspaceRecord>> {
        let keys = self
            .backend
            .keys_with_prefix(&self.key_prefix)
            .await
            .context("failed to enumerate workspace records")?;

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(id) = key.strip_prefix(self.key_prefix.as_str()) else {
                continue;
            };
            if let Some(record) = self.read(&ControlId::new(id)).await {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
