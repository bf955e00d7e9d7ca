use async_trait::async_trait;
use std::sync::Mutex;

use super::{ObjectStore, StoreError};

/// Records uploads for handler tests.
#[derive(Default)]
pub struct MockObjectStore {
    pub objects: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail_puts: bool,
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn put_object(&self, key: &str, bytes: &[u8]) -> Result<String, StoreError> {
        if self.fail_puts {
            return Err(StoreError::Io(std::io::Error::other("mock store failure")));
        }
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.to_vec()));
        Ok(format!("/files/{}", key))
    }
}
