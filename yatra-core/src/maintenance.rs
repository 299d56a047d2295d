use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Keeps inventory regeneration apart from customer booking traffic.
/// Booking operations hold the shared side, regeneration and bulk clears the
/// exclusive side.
#[derive(Debug, Default)]
pub struct MaintenanceLock {
    gate: RwLock<()>,
}

impl MaintenanceLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// `None` while a maintenance window or booking is in flight
    pub fn try_exclusive(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        self.gate.try_write().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exclusive_waits_for_shared() {
        let lock = MaintenanceLock::new();

        let booking = lock.shared().await;
        assert!(lock.try_exclusive().is_none());
        drop(booking);

        let maintenance = lock.try_exclusive();
        assert!(maintenance.is_some());
    }
}
