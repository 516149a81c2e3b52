//! Data directory layout and the user-editable settings file.

use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::{Context, eyre};
use directories::ProjectDirs;
use serde::Deserialize;
use serde_json::Value;

use canopy_explorer::SETTINGS_NAMESPACE;

use crate::constants::{
    CANOPY_HOME_ENV, DEFAULT_EXPLORERS, DEFAULT_STORE_TIMEOUT_SECS, DEFAULT_WATCH_INTERVAL_SECS,
    LOG_DIR, LOG_FILE, SETTINGS_FILE, STATE_DB_FILE,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub settings_file: PathBuf,
    pub state_db: PathBuf,
    pub log_dir: PathBuf,
}

impl Paths {
    /// `$CANOPY_HOME` when set, else the platform's local data directory.
    pub fn resolve() -> Result<Self> {
        if let Some(home) = std::env::var_os(CANOPY_HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::under(PathBuf::from(home)));
        }
        let dirs = ProjectDirs::from("dev", "canopy", "canopy")
            .ok_or_else(|| eyre!("unable to determine a home directory; set {CANOPY_HOME_ENV}"))?;
        Ok(Self::under(dirs.data_local_dir().to_path_buf()))
    }

    pub fn under(data_dir: PathBuf) -> Self {
        Paths {
            settings_file: data_dir.join(SETTINGS_FILE),
            state_db: data_dir.join(STATE_DB_FILE),
            log_dir: data_dir.join(LOG_DIR),
            data_dir,
        }
    }
}

/// Typed view of the `canopy` section of the settings file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub watch_interval_secs: u64,
    pub store_timeout_secs: f64,
    /// Overrides `<data dir>/state.db`.
    pub state_db: Option<PathBuf>,
    pub log_file: String,
    /// Tabs to show, by explorer title.
    pub explorers: Vec<String>,
    /// Root of the filesystem explorer; the user's home directory when unset.
    pub home: Option<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            watch_interval_secs: DEFAULT_WATCH_INTERVAL_SECS,
            store_timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            state_db: None,
            log_file: LOG_FILE.to_owned(),
            explorers: DEFAULT_EXPLORERS.iter().map(|e| (*e).to_owned()).collect(),
            home: None,
            kubeconfig: None,
        }
    }
}

impl Settings {
    pub fn from_document(document: &Value) -> Self {
        let Some(section) = document.get(SETTINGS_NAMESPACE) else {
            return Settings::default();
        };
        match serde_json::from_value(section.clone()) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!("Ignoring invalid {} settings: {}", SETTINGS_NAMESPACE, err);
                Settings::default()
            }
        }
    }

    pub fn state_db(&self, paths: &Paths) -> PathBuf {
        self.state_db.clone().unwrap_or_else(|| paths.state_db.clone())
    }

    pub fn is_enabled(&self, explorer: &str) -> bool {
        self.explorers.iter().any(|e| e == explorer)
    }
}

/// Reads the settings document. A missing file is an empty document.
pub async fn load_document(path: &Path) -> Result<Value> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) if raw.trim().is_empty() => Ok(Value::Object(Default::default())),
        Ok(raw) => serde_json::from_str(&raw)
            .wrap_err_with(|| format!("{} is not valid JSON", path.display())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Ok(Value::Object(Default::default()))
        }
        Err(err) => Err(err).wrap_err_with(|| format!("failed to read {}", path.display())),
    }
}
