use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

pub mod fs_store;
pub mod mock_store;

pub use fs_store::FsObjectStore;
pub use mock_store::MockObjectStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Blob storage for ticket photos. Implementations return the public URL
/// the stored object is reachable under.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError>;
}

/// Builds the storage key for an uploaded photo:
/// `<namespace>/<user id>/<unix millis>_<filename>`. Both caller-supplied
/// segments are sanitized so the key stays a plain relative path.
pub fn object_key(namespace: &str, user_id: &str, filename: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!(
        "{}/{}/{}_{}",
        sanitize_segment(namespace),
        sanitize_segment(user_id),
        millis,
        sanitize_segment(filename)
    )
}

fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    // Rejoining the non-empty dot-separated chunks rules out ".." runs.
    let joined = cleaned
        .split('.')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    if joined.is_empty() {
        "unnamed".to_string()
    } else {
        joined
    }
}
