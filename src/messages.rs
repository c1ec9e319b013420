//! User-facing message channel.
//!
//! When the processor rejects a request with a structured error, the
//! customer should see the processor's own explanation rather than a
//! generic failure page. The gateway pushes those messages through
//! [`MessageSink`] and lets the embedding checkout pipeline decide how to
//! render them.

use std::sync::Mutex;
use tracing::error;

pub trait MessageSink: Send + Sync {
    fn add_error(&self, message: &str);
}

/// Default sink for headless deployments: messages land in the log.
#[derive(Debug, Default)]
pub struct TracingMessages;

impl TracingMessages {
    pub fn new() -> Self {
        Self
    }
}

impl MessageSink for TracingMessages {
    fn add_error(&self, message: &str) {
        error!(error = message, "processor reported an error");
    }
}

/// Buffering sink. Checkout pipelines drain it into their own UI; tests
/// assert on it directly.
#[derive(Debug, Default)]
pub struct CollectedMessages {
    errors: Mutex<Vec<String>>,
}

impl CollectedMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("message lock poisoned").clone()
    }
}

impl MessageSink for CollectedMessages {
    fn add_error(&self, message: &str) {
        self.errors
            .lock()
            .expect("message lock poisoned")
            .push(message.to_string());
    }
}
