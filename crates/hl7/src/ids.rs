use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe sequence of message control ids (`MSH-10`) such as `MSG_ID_1`, `MSG_ID_2`.
#[derive(Debug)]
pub struct MessageIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{}", self.prefix, n)
    }
}
