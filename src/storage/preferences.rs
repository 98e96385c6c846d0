use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::checkpoint::write_atomic;
use crate::error::StorageError;
use crate::types::SyncMode;

const PREFERENCES_FILE: &str = "preferences.json";

/// User preferences read by the bootstrap. Missing keys read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub fast_sync_enabled: bool,
}

impl Preferences {
    /// Load preferences from `dir`, or defaults if the file doesn't exist
    pub fn load(dir: &Path) -> Result<Self, StorageError> {
        let path = dir.join(PREFERENCES_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let prefs = serde_json::from_str(&contents)?;
        Ok(prefs)
    }

    pub fn save(&self, dir: &Path) -> Result<(), StorageError> {
        fs::create_dir_all(dir)?;
        write_atomic(&dir.join(PREFERENCES_FILE), &serde_json::to_vec_pretty(self)?)
    }

    pub fn sync_mode(&self) -> SyncMode {
        SyncMode::from_fast_sync_flag(self.fast_sync_enabled)
    }
}
