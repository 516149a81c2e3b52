use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::interval;

use canopy_explorer::ConfigChange;

use crate::settings::load_document;

/// Reloads the settings file and reports what changed since `last`.
pub async fn poll_settings(path: &Path, last: &mut Value) -> Option<ConfigChange> {
    let current = match load_document(path).await {
        Ok(document) => document,
        Err(err) => {
            tracing::warn!("Keeping previous settings: {:#}", err);
            return None;
        }
    };
    let change = ConfigChange::between(last, &current);
    *last = current;
    (!change.is_empty()).then_some(change)
}

/// Periodically polls the settings file and publishes changes to every explorer.
pub async fn periodic_settings_watch(
    path: PathBuf,
    mut last: Value,
    every: Duration,
    changes: broadcast::Sender<ConfigChange>,
) {
    let mut ticker = interval(every);
    tracing::info!("Settings watcher started on {}", path.display());

    loop {
        ticker.tick().await;
        let Some(change) = poll_settings(&path, &mut last).await else {
            continue;
        };
        tracing::info!("Settings changed: {:?}", change.sections);
        if changes.send(change).is_err() {
            tracing::debug!("No explorer is listening for settings changes");
        }
    }
}
