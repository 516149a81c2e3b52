pub const CANOPY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the data directory (settings, state, logs).
pub const CANOPY_HOME_ENV: &str = "CANOPY_HOME";

pub const SETTINGS_FILE: &str = "settings.json";
pub const STATE_DB_FILE: &str = "state.db";
pub const LOG_DIR: &str = "logs";
pub const LOG_FILE: &str = "canopy.log";

/// Explorer titles shown when the settings do not list any.
pub const DEFAULT_EXPLORERS: [&str; 4] = ["etcd", "git", "minio", "files"];

pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_STORE_TIMEOUT_SECS: f64 = 5.0;
pub const TICK_RATE_MILLIS: u64 = 250;
pub const TOAST_TICKS: u8 = 16;

/// State key remembering the tab that was active on exit.
pub const LAST_TAB_KEY: &str = "canopy.ui.last-tab";
