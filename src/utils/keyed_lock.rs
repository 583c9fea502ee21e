use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use futures::lock::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Entries beyond this count are pruned when nobody holds them.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per key. Holding the guard serialises every unit of
/// work for that key within this process. Clones share the same table.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    slots: Arc<Mutex<HashMap<u64, Arc<AsyncMutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: u64) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            if slots.len() > PRUNE_THRESHOLD {
                // a held guard keeps its own Arc, so count 1 means idle
                slots.retain(|_, m| Arc::strong_count(m) > 1);
            }
            slots
                .entry(key)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }
}
