use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as TokioMutex, OwnedMutexGuard};

type SnapshotKey = (u64, u64);

/// One async lock per `(customer_id, snapshot_id)`.
///
/// Entries are weak so a snapshot nobody is writing costs nothing; dead
/// entries are pruned whenever a new lock is created.
#[derive(Debug, Default)]
pub(crate) struct SnapshotLocks {
    locks: Mutex<HashMap<SnapshotKey, Weak<TokioMutex<()>>>>,
}

impl SnapshotLocks {
    pub(crate) async fn acquire(&self, customer_id: u64, snapshot_id: u64) -> OwnedMutexGuard<()> {
        let lock = self.lock_for((customer_id, snapshot_id));
        lock.lock_owned().await
    }

    fn lock_for(&self, key: SnapshotKey) -> Arc<TokioMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(&key).and_then(Weak::upgrade) {
            return lock;
        }

        locks.retain(|_, lock| lock.strong_count() > 0);
        let lock = Arc::new(TokioMutex::new(()));
        locks.insert(key, Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn live(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|lock| lock.strong_count() > 0).count()
    }
}
