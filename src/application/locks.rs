use crate::domain::account::UserId;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<UserId, Arc<Mutex<()>>>;

/// One async mutex per user.
///
/// Every balance or session mutation for a user runs while holding that user's
/// guard, so read-compute-write sequences on the ledger and session transitions
/// are linearized per user while different users proceed in parallel.
///
/// Entries live only while a guard is held or awaited; the map never grows past
/// the number of users with work in flight.
#[derive(Default)]
pub struct UserLocks {
    locks: Arc<LockMap>,
}

/// Held for the duration of one user's critical section.
pub struct UserGuard {
    guard: Option<OwnedMutexGuard<()>>,
    user_id: UserId,
    locks: Arc<LockMap>,
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        // Release the mutex first so its Arc no longer counts as a holder.
        self.guard.take();
        // Pending acquirers hold a clone, so a count of one means only the map
        // references this lock. The check runs under the shard write lock.
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: UserId) -> UserGuard {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self.locks.entry(user_id).or_default().clone();
        let guard = lock.lock_owned().await;
        UserGuard {
            guard: Some(guard),
            user_id,
            locks: Arc::clone(&self.locks),
        }
    }

    pub fn tracked_users(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_users_do_not_block() {
        let locks = UserLocks::new();
        let _first = locks.acquire(1).await;
        let _second = tokio::time::timeout(Duration::from_millis(100), locks.acquire(2))
            .await
            .expect("user 2 must not wait on user 1");
        assert_eq!(locks.tracked_users(), 2);
    }

    #[tokio::test]
    async fn test_idle_users_are_pruned() {
        let locks = UserLocks::new();
        for user in 0..1_000 {
            let _guard = locks.acquire(user).await;
        }
        assert_eq!(locks.tracked_users(), 0);
    }

    #[tokio::test]
    async fn test_entry_survives_while_contended() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.acquire(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
                locks.tracked_users()
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(contender.await.unwrap(), 1);
        assert_eq!(locks.tracked_users(), 0);
    }
}
