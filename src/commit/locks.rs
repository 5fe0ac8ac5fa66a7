use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::db::UserId;

/// One mutex per user, created on first use and dropped once released by
/// the last holder
#[derive(Debug, Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(&self, user_id: UserId) -> Arc<Mutex<()>> {
        // The map and the unit guards carry no state a panic could corrupt
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(map.entry(user_id).or_default())
    }

    /// Forget the user's mutex unless someone else still holds a handle to it.
    /// Callers drop their own handle first.
    pub fn release(&self, user_id: UserId) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if map
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&user_id);
        }
    }

    pub fn user_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Hold `lock` for the lifetime of the returned guard
pub fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}
