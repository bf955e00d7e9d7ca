use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::{ObjectStore, StoreError};

/// Stores photos on the local filesystem under one root directory. The
/// returned URLs sit under `public_base`, where the static file service
/// exposes the same root.
pub struct FsObjectStore {
    root: PathBuf,
    public_base: String,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        let mut public_base: String = public_base.into();
        while public_base.ends_with('/') {
            public_base.pop();
        }
        Self {
            root: root.into(),
            public_base,
        }
    }
}

/// Keys must stay relative paths made of plain segments.
fn validate_key(key: &str) -> Result<(), StoreError> {
    let path = Path::new(key);
    if key.is_empty() || path.is_absolute() || key.contains('\\') {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    for component in path.components() {
        match component {
            Component::Normal(_) => {}
            _ => return Err(StoreError::InvalidKey(key.to_string())),
        }
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put_object(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        validate_key(key)?;
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(format!("{}/{}", self.public_base, key))
    }
}
