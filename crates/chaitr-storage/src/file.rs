use async_trait::async_trait;
use chaitr_core::{ChaitrError, Result};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::store::KeyValueStore;

/// File-based store keeping one JSON document per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        debug!("FileStore initialized: base_dir={:?}", base_dir);
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Location of the record for `key`: readable name plus a hash of the raw key
    pub fn path_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        let safe_name = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            })
            .collect::<String>();

        self.base_dir.join(format!("{}-{}.json", safe_name, &hash[..8]))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(contents) => {
                debug!("Read '{}' from {:?}", key, path);
                Ok(Some(contents))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ChaitrError::PersistenceRead {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let write_error = |e: std::io::Error| ChaitrError::PersistenceWrite {
            key: key.to_string(),
            message: e.to_string(),
        };

        fs::create_dir_all(&self.base_dir).await.map_err(write_error)?;

        let path = self.path_for(key);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, value).await.map_err(write_error)?;
        fs::rename(&tmp_path, &path).await.map_err(write_error)?;

        debug!("Wrote '{}' to {:?}", key, path);
        Ok(())
    }
}
