//! Tracing setup. The terminal belongs to the dashboard, so logs go to a file.

use std::{fs::OpenOptions, io, path::PathBuf, sync::Mutex};
use tracing_subscriber::EnvFilter;

use crate::profiles::config_dir;

pub const LOG_ENV: &str = "INFRASENTINEL_LOG";

pub fn log_path() -> PathBuf {
    config_dir().join("infrasentinel.log")
}

pub fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let path = log_path();
    let file = path
        .parent()
        .map(std::fs::create_dir_all)
        .transpose()
        .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));
    match file {
        Ok(f) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(f))
                .try_init();
        }
        Err(_) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}
