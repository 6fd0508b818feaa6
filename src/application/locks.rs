use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::AccountId;

/// Per-account mutexes serializing the read-check-write window of any two
/// operations that touch the same account.
///
/// Both guards are acquired in ascending account-id order, so
/// Transfer(A→B) racing Transfer(B→A) cannot circular-wait. Tokio mutexes
/// queue waiters FIFO, which gives fair per-account ordering, and a waiter
/// whose future is dropped before acquisition holds nothing.
#[derive(Default)]
pub struct AccountLocks {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

/// Holds both account locks for the duration of one atomic operation.
pub struct PairGuard {
    _first: OwnedMutexGuard<()>,
    _second: OwnedMutexGuard<()>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn mutex_for(&self, id: AccountId) -> Arc<Mutex<()>> {
        self.locks.entry(id).or_default().value().clone()
    }

    /// Lock two distinct accounts, lowest id first.
    pub async fn lock_pair(&self, a: AccountId, b: AccountId) -> PairGuard {
        assert!(a != b, "Lock ordering requires distinct accounts");
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let first = self.mutex_for(lo).lock_owned().await;
        let second = self.mutex_for(hi).lock_owned().await;
        PairGuard {
            _first: first,
            _second: second,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn test_opposing_lock_orders_do_not_deadlock() {
        let locks = Arc::new(AccountLocks::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut handles = Vec::new();
        for i in 0..20 {
            let locks = Arc::clone(&locks);
            let (x, y) = if i % 2 == 0 { (a, b) } else { (b, a) };
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock_pair(x, y).await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }));
        }

        let all = async {
            for handle in handles {
                handle.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("lock pairs deadlocked");
    }

    #[tokio::test]
    async fn test_same_account_is_exclusive() {
        let locks = AccountLocks::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let guard = locks.lock_pair(a, b).await;
        // (a, c) shares account a, so it must wait until the guard drops.
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), locks.lock_pair(a, c)).await;
        assert!(blocked.is_err());

        drop(guard);
        tokio::time::timeout(Duration::from_millis(50), locks.lock_pair(a, c))
            .await
            .expect("lock should be free after guard drop");
    }
}
