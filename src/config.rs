use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_SYNC_SECS: u64 = 30;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Runtime settings, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: PathBuf,
    pub events_path: Option<PathBuf>,
    pub remote_url: Option<String>,
    pub sync_interval: Duration,
    pub remote_timeout: Duration,
    pub admin_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        Self {
            port: non_empty("PORT")
                .and_then(|value| value.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            data_dir: non_empty("APP_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            events_path: non_empty("SWIM_EVENTS_PATH").map(PathBuf::from),
            remote_url: non_empty("SWIM_REMOTE_URL"),
            sync_interval: Duration::from_secs(
                non_empty("SWIM_SYNC_INTERVAL_SECS")
                    .and_then(|value| value.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_SYNC_SECS),
            ),
            remote_timeout: Duration::from_secs(
                non_empty("SWIM_REMOTE_TIMEOUT_SECS")
                    .and_then(|value| value.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            admin_token: non_empty("SWIM_ADMIN_TOKEN"),
        }
    }
}
