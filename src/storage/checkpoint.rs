use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StorageError;
use crate::types::StartBlock;

const CHECKPOINT_FILE: &str = "checkpoint.json";
const BLOCKS_FILE: &str = "blocks.json";

/// Persisted record of the block SPV sync starts from.
///
/// Written only by the bootstrap decider, read by anyone at startup.
pub trait CheckpointStore: Send + Sync {
    /// Last persisted checkpoint, `None` if never set or unreadable
    fn load(&self) -> Option<StartBlock>;

    /// Persist atomically
    fn save(&self, block: &StartBlock) -> Result<(), StorageError>;

    /// Whether the locally persisted partial chain has zero entries
    fn is_local_block_database_empty(&self) -> bool;
}

/// File-backed store: `checkpoint.json` plus a `blocks.json` block log
#[derive(Clone, Debug)]
pub struct FileCheckpointStore {
    base_path: PathBuf,
}

impl FileCheckpointStore {
    /// Open (creating if needed) a store rooted at `base_path`
    pub fn open(base_path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_path
    }

    fn checkpoint_path(&self) -> PathBuf {
        self.base_path.join(CHECKPOINT_FILE)
    }

    fn blocks_path(&self) -> PathBuf {
        self.base_path.join(BLOCKS_FILE)
    }

    /// Blocks recorded in the local block log, oldest first
    pub fn load_blocks(&self) -> Result<Vec<StartBlock>, StorageError> {
        let path = self.blocks_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(path)?;
        let blocks = serde_json::from_str(&contents)?;
        Ok(blocks)
    }

    /// Append blocks to the local block log
    pub fn append_blocks(&self, blocks: &[StartBlock]) -> Result<(), StorageError> {
        let mut all = self.load_blocks()?;
        all.extend_from_slice(blocks);
        write_atomic(&self.blocks_path(), &serde_json::to_vec_pretty(&all)?)
    }

    /// Remove checkpoint and block log (wallet reset)
    pub fn clear(&self) -> Result<(), StorageError> {
        for path in [self.checkpoint_path(), self.blocks_path()] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        log::warn!("Cleared chain checkpoint data in {:?}", self.base_path);
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Option<StartBlock> {
        let path = self.checkpoint_path();
        if !path.exists() {
            return None;
        }
        let parsed = fs::read_to_string(&path)
            .map_err(StorageError::from)
            .and_then(|contents| serde_json::from_str(&contents).map_err(StorageError::from));
        match parsed {
            Ok(block) => Some(block),
            Err(e) => {
                log::warn!("Ignoring unreadable checkpoint {:?}: {}", path, e);
                None
            }
        }
    }

    fn save(&self, block: &StartBlock) -> Result<(), StorageError> {
        if !self.base_path.exists() {
            return Err(StorageError::DirectoryNotFound(
                self.base_path.display().to_string(),
            ));
        }
        let checkpoint = serde_json::to_vec_pretty(block)?;

        // The start block becomes the first entry of an empty local chain so
        // that a restart resumes from it instead of resolving again. The log
        // is seeded first: a block log that can't be read or written fails
        // the save before any checkpoint reaches disk.
        let seeded = if self.load_blocks()?.is_empty() {
            self.append_blocks(std::slice::from_ref(block))?;
            true
        } else {
            false
        };

        if let Err(e) = write_atomic(&self.checkpoint_path(), &checkpoint) {
            if seeded {
                if let Err(rollback) = fs::remove_file(self.blocks_path()) {
                    log::error!("Could not roll back seeded block log: {}", rollback);
                }
            }
            return Err(e);
        }
        log::debug!("Checkpoint saved: {}", block);
        Ok(())
    }

    fn is_local_block_database_empty(&self) -> bool {
        match self.load_blocks() {
            Ok(blocks) => blocks.is_empty(),
            Err(e) => {
                log::warn!("Block log unreadable, treating as empty: {}", e);
                true
            }
        }
    }
}

/// Write to a sibling temp file and rename over the target
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
