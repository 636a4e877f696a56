//! Admission gate closed once by the drain.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Shared flag deciding whether new connections may be admitted.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    open: Arc<AtomicBool>,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the gate. Returns `true` only for the call that actually closed it.
    pub fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}
