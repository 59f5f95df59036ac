use std::{fs, path::Path, sync::Arc};

use anyhow::Result;
use serde::Deserialize;
use storage::{SqliteBackend, WorkspaceStore, DEFAULT_KEY_PREFIX};

use crate::reporting::{DisabledEventSink, EventSink, HttpEventSink};

pub const SETTINGS_FILE: &str = "workspace.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub database_url: String,
    pub key_prefix: String,
    pub collector_url: String,
    pub reporting_enabled: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/workspace.db".into(),
            key_prefix: DEFAULT_KEY_PREFIX.into(),
            collector_url: "http://127.0.0.1:8080".into(),
            reporting_enabled: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    database_url: Option<String>,
    key_prefix: Option<String>,
    collector_url: Option<String>,
    reporting_enabled: Option<bool>,
}

impl ClientSettings {
    pub async fn open_store(&self) -> Result<WorkspaceStore> {
        let backend = SqliteBackend::new(&self.database_url).await?;
        Ok(WorkspaceStore::with_key_prefix(
            Arc::new(backend),
            self.key_prefix.clone(),
        ))
    }

    pub fn event_sink(&self) -> Result<Arc<dyn EventSink>> {
        if !self.reporting_enabled {
            return Ok(Arc::new(DisabledEventSink));
        }
        Ok(Arc::new(HttpEventSink::new(&self.collector_url)?))
    }
}

/// Defaults, then `workspace.toml` in the working directory, then `APP__*`
/// environment variables.
pub fn load_settings() -> ClientSettings {
    let mut settings = load_settings_file(Path::new(SETTINGS_FILE));
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    settings
}

fn load_settings_file(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    let Ok(raw) = fs::read_to_string(path) else {
        return settings;
    };
    let Ok(file_cfg) = toml::from_str::<FileSettings>(&raw) else {
        tracing::warn!(path = %path.display(), "ignoring unparseable settings file");
        return settings;
    };

    if let Some(v) = file_cfg.database_url {
        settings.database_url = v;
    }
    if let Some(v) = file_cfg.key_prefix {
        settings.key_prefix = v;
    }
    if let Some(v) = file_cfg.collector_url {
        settings.collector_url = v;
    }
    if let Some(v) = file_cfg.reporting_enabled {
        settings.reporting_enabled = v;
    }
    settings
}

fn apply_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = lookup("APP__KEY_PREFIX") {
        settings.key_prefix = v;
    }
    if let Some(v) = lookup("APP__COLLECTOR_URL") {
        settings.collector_url = v;
    }
    if let Some(v) = lookup("APP__REPORTING_ENABLED") {
        if let Ok(parsed) = v.parse::<bool>() {
            settings.reporting_enabled = parsed;
        }
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
