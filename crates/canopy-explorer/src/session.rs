use std::sync::atomic::{AtomicBool, Ordering};

use uuid::Uuid;

/// Per-run state shared by the presentation layer and the explorers.
///
/// Created once at startup and passed explicitly; `reset` returns it to the
/// freshly-created state.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    preview_shown: AtomicBool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            id: Uuid::now_v7(),
            preview_shown: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn has_preview_been_shown(&self) -> bool {
        self.preview_shown.load(Ordering::Acquire)
    }

    /// Marks the preview as shown; returns true only for the first call.
    pub fn record_preview_shown(&self) -> bool {
        !self.preview_shown.swap(true, Ordering::AcqRel)
    }

    pub fn reset(&self) {
        self.preview_shown.store(false, Ordering::Release);
    }
}
