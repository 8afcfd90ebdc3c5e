use std::sync::{Arc, Mutex, PoisonError};

use viewport::Pose;

/// Latest viewer pose, shared between the render loop and the feedback
/// thread.
#[derive(Debug, Clone, Default)]
pub struct PoseLock {
    inner: Arc<Mutex<Pose>>,
}

impl PoseLock {
    pub fn new(pose: Pose) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pose)),
        }
    }

    pub fn set(&self, pose: Pose) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = pose;
    }

    pub fn get(&self) -> Pose {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
