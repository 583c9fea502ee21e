use std::time::Duration;

use moka::future::Cache;

use crate::repo::{Store, StoreResult};

pub const UNKNOWN_USER: &str = "Unknown";

/// employee id => username, for joining display names onto request lists
#[derive(Clone)]
pub struct UsernameCache {
    cache: Cache<u64, String>,
}

impl UsernameCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Cached name, else a directory read. Absent employees resolve to
    /// [`UNKNOWN_USER`] and are not cached.
    pub async fn username_of(&self, store: &dyn Store, employee_id: u64) -> StoreResult<String> {
        if let Some(name) = self.cache.get(&employee_id).await {
            return Ok(name);
        }

        match store.find_employee(employee_id).await? {
            Some(employee) => {
                self.cache
                    .insert(employee_id, employee.username.clone())
                    .await;
                Ok(employee.username)
            }
            None => Ok(UNKNOWN_USER.to_string()),
        }
    }

    pub async fn forget(&self, employee_id: u64) {
        self.cache.invalidate(&employee_id).await;
    }
}

impl Default for UsernameCache {
    fn default() -> Self {
        Self::new(50_000, Duration::from_secs(3600))
    }
}
