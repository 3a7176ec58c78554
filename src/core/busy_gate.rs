use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Single shared flag enforcing at most one in-flight capture/submit
/// operation across all timers and explicit actions. Acquisition is
/// try-only: a tick that finds the gate held is dropped, never queued.
#[derive(Clone, Default)]
pub struct BusyGate {
    held: Arc<AtomicBool>,
}

/// RAII permit. Releasing on drop guarantees the gate opens again on every
/// exit path, including early returns and panics in the holder.
pub struct BusyPermit {
    held: Arc<AtomicBool>,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<BusyPermit> {
        if self
            .held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(BusyPermit { held: Arc::clone(&self.held) })
        } else {
            None
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Drop for BusyPermit {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
