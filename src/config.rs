//! Configuration and CLI argument handling

use std::{path::PathBuf, sync::Arc, time::Duration};
use clap::Parser;

use crate::{
    store::{JsonFileStore, MemoryStore, TimerStore, STORAGE_KEY},
    sync::{SyncHub, CHANNEL_NAME, DEFAULT_CAPACITY},
};

/// CLI argument parsing structure
#[derive(Parser, Debug, Clone)]
#[command(name = "study-timer")]
#[command(about = "A shared wall-clock study timer with persistence and cross-context sync")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// File holding the persisted timer state
    #[arg(long, default_value_t = default_state_file())]
    pub state_file: String,

    /// Keep the timer state in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Name of the cross-context sync channel
    #[arg(long, default_value = CHANNEL_NAME)]
    pub channel: String,

    /// Disable cross-context sync
    #[arg(long)]
    pub no_sync: bool,

    /// Display refresh interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub tick_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn default_state_file() -> String {
    format!("{}.json", STORAGE_KEY)
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Display refresh interval, never shorter than 10ms
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(&self.state_file)
    }

    /// Build the configured timer store
    pub fn store(&self) -> Arc<dyn TimerStore> {
        if self.ephemeral {
            Arc::new(MemoryStore::new())
        } else {
            Arc::new(JsonFileStore::new(self.state_path()))
        }
    }

    /// Build the sync hub, or an unavailable one when sync is disabled
    pub fn hub(&self) -> SyncHub {
        if self.no_sync {
            SyncHub::unavailable()
        } else {
            SyncHub::new(DEFAULT_CAPACITY)
        }
    }
}
