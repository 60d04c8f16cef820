use cashup_types::FestivalId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-festival mutex registry. Every gated write path holds its
/// festival's lock across the compare-and-commit section, so concurrent
/// requests against one festival serialize while different festivals
/// proceed independently.
#[derive(Default)]
pub struct FestivalLocks {
    locks: Mutex<HashMap<FestivalId, Arc<Mutex<()>>>>,
}

impl FestivalLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, festival_id: &FestivalId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(festival_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
