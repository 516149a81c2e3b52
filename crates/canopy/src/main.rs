use std::sync::Arc;
use std::time::Duration;

use canopy::app::{Canopy, Services};
use canopy::clipboard::TerminalClipboard;
use canopy::constants::TICK_RATE_MILLIS;
use canopy::event::EventHandler;
use canopy::interaction::TuiInteraction;
use canopy::settings::{Paths, Settings, load_document};
use canopy::sync::periodic_settings_watch;
use canopy::tracing::init_tracing;

use canopy_explorer::backends::{EtcdProvider, FileProvider, GitProvider, MinioProvider};
use canopy_explorer::{Explorer, Interaction, Session};
use canopy_sqlite_backend::{SqliteState, StateStore};
use color_eyre::eyre::eyre;
use directories::BaseDirs;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Settings
    let paths = Paths::resolve()?;
    let document = load_document(&paths.settings_file).await?;
    let settings = Settings::from_document(&document);

    // Init Tracing
    let _guard = init_tracing(&paths.log_dir, &settings.log_file)?;
    tracing::info!("Data directory: {}", paths.data_dir.display());

    // Explorer state
    let store: Arc<dyn StateStore> = Arc::new(
        SqliteState::open(settings.state_db(&paths), settings.store_timeout_secs)
            .await
            .map_err(|e| {
                tracing::error!("Failed to open explorer state: {:#}", e);
                e
            })?,
    );

    // Settings watcher
    let (config_tx, _) = broadcast::channel(16);
    tokio::spawn(periodic_settings_watch(
        paths.settings_file.clone(),
        document,
        Duration::from_secs(settings.watch_interval_secs.max(1)),
        config_tx.clone(),
    ));
    tracing::info!("Settings watcher spawned.");

    let events = EventHandler::new(Duration::from_millis(TICK_RATE_MILLIS));
    let ui: Arc<dyn Interaction> = Arc::new(TuiInteraction::new(events.sender()));

    let home = match settings.home.clone() {
        Some(home) => home,
        None => BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| eyre!("unable to determine the home directory"))?,
    };

    let mut explorers = Vec::new();
    for name in &settings.explorers {
        let explorer = match name.as_str() {
            "etcd" => Explorer::new(EtcdProvider, Arc::clone(&store), Arc::clone(&ui), &config_tx),
            "git" => Explorer::new(GitProvider, Arc::clone(&store), Arc::clone(&ui), &config_tx),
            "minio" => Explorer::new(MinioProvider, Arc::clone(&store), Arc::clone(&ui), &config_tx),
            "files" => Explorer::new(
                FileProvider::new(home.clone()),
                Arc::clone(&store),
                Arc::clone(&ui),
                &config_tx,
            ),
            other => {
                tracing::warn!("Unknown explorer '{}' in settings", other);
                continue;
            }
        };
        explorers.push(explorer);
    }
    tracing::info!("{} explorers ready.", explorers.len());

    let services = Services {
        session: Arc::new(Session::new()),
        store,
        ui,
        clipboard: Arc::new(TerminalClipboard),
        kubeconfig: settings.kubeconfig.clone(),
    };

    // Run TUI
    let terminal = ratatui::init();
    let result = Canopy::new(events, explorers, services).run(terminal).await;

    ratatui::restore();

    result
}
