use crate::errors::SyncError;
use crate::models::InteractionKey;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendMode {
    /// Counts live on the counting service.
    Remote,
    /// Counts live only in this browser's storage.
    Local,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "site-counters")]
#[command(about = "Load the site's counters and reaction buttons once, as a page would", long_about = None)]
pub struct Config {
    /// Where authoritative counts come from
    #[arg(long, env = "COUNTER_BACKEND", value_enum, default_value = "remote")]
    pub backend: BackendMode,

    /// Base URL of the counting service
    #[arg(long, env = "COUNTER_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Directory for durable and session storage files
    #[arg(long, env = "COUNTER_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Minutes of inactivity after which the browsing session ends
    #[arg(long, env = "COUNTER_SESSION_IDLE_MINUTES", default_value_t = 30)]
    pub session_idle_minutes: u32,

    /// Click the download link after the page has loaded
    #[arg(long)]
    pub download: bool,

    /// Reaction button present on the page (repeatable)
    #[arg(long = "react", value_name = "POST:TYPE")]
    pub reactions: Vec<InteractionKey>,

    /// Reaction button to click after load, in order (repeatable)
    #[arg(long = "toggle", value_name = "POST:TYPE")]
    pub toggles: Vec<InteractionKey>,
}

impl Config {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.backend == BackendMode::Remote {
            let url = self.api_url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(SyncError::config(format!(
                    "api url must be http(s), got '{}'",
                    self.api_url
                )));
            }
        }
        if self.session_idle_minutes == 0 {
            return Err(SyncError::config("session idle minutes must be positive"));
        }
        Ok(())
    }

    pub fn durable_path(&self) -> PathBuf {
        self.data_dir.join("local.json")
    }

    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    pub fn session_idle(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.session_idle_minutes))
    }

    /// Every button on the page: declared reactions followed by any toggled
    /// keys not already declared.
    pub fn buttons(&self) -> Vec<InteractionKey> {
        let mut keys = self.reactions.clone();
        for key in &self.toggles {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }
}
