use async_trait::async_trait;
use cashup_types::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Object storage for uploaded photo bytes. Lives outside the ledger
/// transaction, so failed submissions clean up through
/// `delete_if_exists`.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn put(&self, bytes: &[u8]) -> Result<String>;
    async fn delete_if_exists(&self, storage_ref: &str) -> Result<()>;
}

/// In-memory object store.
#[derive(Default)]
pub struct MemoryPhotoStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    next_id: AtomicU64,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, storage_ref: &str) -> bool {
        self.objects.read().await.contains_key(storage_ref)
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn put(&self, bytes: &[u8]) -> Result<String> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let storage_ref = format!("mem://photos/{}", id);
        self.objects
            .write()
            .await
            .insert(storage_ref.clone(), bytes.to_vec());
        Ok(storage_ref)
    }

    async fn delete_if_exists(&self, storage_ref: &str) -> Result<()> {
        self.objects.write().await.remove(storage_ref);
        Ok(())
    }
}
