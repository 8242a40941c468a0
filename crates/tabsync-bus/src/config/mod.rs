//! Config loader (strict parsing).

pub mod schema;

use std::fs;

use tabsync_core::error::{Result, TabSyncError};

pub use schema::{BusSection, RelaySection, TabSyncConfig, TransportKind};

pub fn load_from_file(path: &str) -> Result<TabSyncConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TabSyncError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<TabSyncConfig> {
    let cfg: TabSyncConfig = serde_yaml::from_str(s)
        .map_err(|e| TabSyncError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
