//! Configuration for the meetday server
//!
//! Handles data directory configuration with the following precedence:
//! 1. MEETDAY_DATA_DIR environment variable
//! 2. The platform data directory (e.g. ~/.local/share/meetday)
//! 3. ./data (fallback for development)

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::persistence::sqlite::Migrations;

const DATA_DIR_ENV: &str = "MEETDAY_DATA_DIR";
const MIGRATIONS_DIR_ENV: &str = "MEETDAY_MIGRATIONS_DIR";
const OPEN_TIMEOUT_ENV: &str = "MEETDAY_OPEN_TIMEOUT_SECS";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Get the data directory holding `main.db`, `sessions/` and `logs/`.
///
/// Priority:
/// 1. MEETDAY_DATA_DIR env variable if set
/// 2. the platform data directory for "meetday"
/// 3. ./data as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(dirs) = directories::ProjectDirs::from("", "", "meetday") {
        return dirs.data_dir().to_path_buf();
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Where schema migrations come from.
///
/// MEETDAY_MIGRATIONS_DIR points at a directory with one subdirectory per
/// schema family; without it the migrations compiled into the binary are used.
pub fn get_migrations() -> Migrations {
    match std::env::var(MIGRATIONS_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Migrations::Directory(PathBuf::from(dir)),
        _ => Migrations::Embedded,
    }
}

/// Upper bound on opening a session store.
pub fn get_open_timeout() -> Duration {
    parse_open_timeout(std::env::var(OPEN_TIMEOUT_ENV).ok().as_deref())
}

fn parse_open_timeout(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_OPEN_TIMEOUT)
}

pub fn get_log_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("logs")
}

pub fn get_main_store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("main.db")
}
