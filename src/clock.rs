//! Clock abstraction.

use jiff::Timestamp;
use mockall::automock;

/// Source of the current time, injected so token lifetimes are
/// deterministic under test.
#[automock]
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
