// Per-key async locks. Idle entries are dropped when the next lock is taken.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder of `key` remains.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // Only the map holds an idle entry.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(key.to_string()).or_default().clone()
        };
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn idle_keys_are_pruned_on_next_lock() {
        let locks = KeyedLocks::new();
        assert!(locks.is_empty());

        let web = locks.lock("web/scale-out").await;
        drop(locks.lock("api/scale-out").await);
        assert_eq!(locks.len(), 2);

        // "api" is idle; "web" is still held.
        let _other = locks.lock("web/scale-in").await;
        assert_eq!(locks.len(), 2);

        drop(web);
        drop(_other);
        let _again = locks.lock("web/scale-out").await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let held = locks.lock("web/scale-out").await;

        let waiting = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.lock("web/scale-out"),
        )
        .await;
        assert!(waiting.is_err());

        drop(held);
        let _acquired = locks.lock("web/scale-out").await;
    }
}
