//! The one piece of state the sensor side and the playback side share.

use crate::aggregator::ProximityVector;

use std::sync::{Arc, Mutex, PoisonError};

/// A single-slot mailbox holding the newest [ProximityVector].
///
/// Writers swap in a whole new vector and readers take a handle to whichever
/// vector is current, so a reader can never see half of one frame and half of
/// the next. Cloning the slot clones the handle, not the vector.
#[derive(Debug, Clone, Default)]
pub struct ProximitySlot {
    latest: Arc<Mutex<Arc<ProximityVector>>>,
}

impl ProximitySlot {
    /// A slot initially holding `initial`.
    pub fn new(initial: ProximityVector) -> Self {
        Self {
            latest: Arc::new(Mutex::new(Arc::new(initial))),
        }
    }

    /// Replaces the current vector.
    pub fn publish(&self, vector: ProximityVector) {
        let fresh = Arc::new(vector);
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
    }

    /// The current vector. The returned handle stays valid and unchanged
    /// even if a newer vector is published afterwards.
    pub fn load(&self) -> Arc<ProximityVector> {
        Arc::clone(&self.latest.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
