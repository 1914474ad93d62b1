//! Live session gauge.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Count of bridged sessions currently running.
#[derive(Clone, Debug, Default)]
pub struct ActiveSessions {
    count: Arc<AtomicUsize>,
}

impl ActiveSessions {
    /// An empty gauge.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions currently running.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Count a session until the guard drops.
    pub fn enter(&self) -> SessionGuard {
        let _ = self.count.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            count: Arc::clone(&self.count),
        }
    }
}

/// Decrements the gauge on drop.
#[derive(Debug)]
pub struct SessionGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.count.fetch_sub(1, Ordering::Relaxed);
    }
}
