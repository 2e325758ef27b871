use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::coach::engine::Documents;
use crate::coach::types::{LearnerState, VocabularyPool};

pub const POOL_FILE: &str = "vocab.json";
pub const STATE_FILE: &str = "user_data.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt document {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whole-document JSON store rooted at a data directory
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pool_path(&self) -> PathBuf {
        self.root.join(POOL_FILE)
    }

    pub fn state_path(&self) -> PathBuf {
        self.root.join(STATE_FILE)
    }

    pub async fn load_pool(&self) -> Result<VocabularyPool, StoreError> {
        let mut pool: VocabularyPool = load_or_default(&self.pool_path()).await?;
        let fixed = pool.enforce_weight_floor();
        if fixed > 0 {
            warn!(fixed, "weights below floor repaired on load");
        }
        Ok(pool)
    }

    pub async fn load_state(&self) -> Result<LearnerState, StoreError> {
        load_or_default(&self.state_path()).await
    }

    pub async fn save_pool(&self, pool: &VocabularyPool) -> Result<(), StoreError> {
        write_atomic(&self.pool_path(), pool).await
    }

    pub async fn save_state(&self, state: &LearnerState) -> Result<(), StoreError> {
        write_atomic(&self.state_path(), state).await
    }

    pub async fn load(&self) -> Result<Documents, StoreError> {
        let pool = self.load_pool().await?;
        let state = self.load_state().await?;
        info!(words = pool.len(), watermark = state.last_update_id, "documents loaded");
        Ok(Documents { pool, state })
    }

    /// Pool first, learner state (and its watermark) last.
    pub async fn save(&self, documents: &Documents) -> Result<(), StoreError> {
        self.save_pool(&documents.pool).await?;
        self.save_state(&documents.state).await?;
        debug!(root = %self.root.display(), "documents saved");
        Ok(())
    }
}

async fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "document missing, using defaults");
            return Ok(T::default());
        }
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &body).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    Ok(())
}
