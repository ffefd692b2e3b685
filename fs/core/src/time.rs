//! Time-related core types.

use std::time::{SystemTime, UNIX_EPOCH};

/// A filesystem timestamp with millisecond granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTime {
    millis: i64,
}

impl FileTime {
    pub const fn from_millis(millis: i64) -> Self {
        Self { millis }
    }

    pub const fn as_millis(self) -> i64 {
        self.millis
    }

    /// The current wall-clock time, truncated to milliseconds.
    pub fn now() -> Self {
        let millis = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_millis() as i64,
            Err(before) => -(before.duration().as_millis() as i64),
        };
        Self { millis }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_is_not_before_epoch() {
        assert!(FileTime::now() >= FileTime::from_millis(0));
    }

    #[test]
    fn ordering_follows_millis() {
        assert!(FileTime::from_millis(1) < FileTime::from_millis(2));
    }
}
