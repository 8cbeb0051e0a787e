// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Seconds of section time remaining at which the one-shot low-time
/// warnings fire. Sorted loosest first; each fires at most once.
pub const WARNING_THRESHOLDS_SECS: [u32; 2] = [300, 60];

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub snapshot_dir: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let snapshot_dir = env::var("SNAPSHOT_DIR")
            .unwrap_or_else(|_| "data/snapshots".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            snapshot_dir,
            rust_log,
        }
    }
}
