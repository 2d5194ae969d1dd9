//! Caller-owned subscription handles.

use std::fmt;

/// Handle owning a live store subscription.
///
/// The caller owns disposal: dropping the handle or calling [`stop`]
/// releases the underlying listener. A handle that is kept alive keeps the
/// listener alive, so holding one in long-lived state without ever
/// dropping it keeps the subscription active indefinitely.
///
/// [`stop`]: Subscription::stop
pub struct Subscription {
    canceller: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps the backend-specific cancel action.
    pub fn new(canceller: impl FnOnce() + Send + 'static) -> Self {
        Self {
            canceller: Some(Box::new(canceller)),
        }
    }

    /// Explicitly releases the listener.
    pub fn stop(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.canceller.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.canceller.is_some())
            .finish()
    }
}
