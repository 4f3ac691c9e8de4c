//! Single-slot error channel.
//!
//! Every boundary failure in the session ends up here as a user-facing
//! string. Only the latest message is kept; a new report overwrites it.

use core_runtime::events::{CoreEvent, ErrorEvent, EventBus};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::warn;

struct Inner {
    slot: watch::Sender<Option<String>>,
    events: EventBus,
}

#[derive(Clone)]
pub struct ErrorChannel {
    inner: Arc<Inner>,
}

impl ErrorChannel {
    pub fn new(events: EventBus) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner { slot, events }),
        }
    }

    /// Overwrite the slot with `message`.
    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "error reported");
        self.inner.slot.send_replace(Some(message.clone()));
        self.inner
            .events
            .emit(CoreEvent::Error(ErrorEvent::Reported { message }))
            .ok();
    }

    /// The most recent message, if any.
    pub fn latest(&self) -> Option<String> {
        self.inner.slot.borrow().clone()
    }

    pub fn clear(&self) {
        let previous = self.inner.slot.send_replace(None);
        if previous.is_some() {
            self.inner
                .events
                .emit(CoreEvent::Error(ErrorEvent::Cleared))
                .ok();
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.inner.slot.subscribe()
    }
}

impl std::fmt::Debug for ErrorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorChannel")
            .field("latest", &self.latest())
            .finish()
    }
}
