//! Injectable time source for span timestamps.
//!
//! Instrumentation that stamps spans itself takes a [`Clock`] at
//! construction instead of calling `SystemTime::now` directly, so tests can
//! substitute a fixed instant and assert exact timestamps.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// A cloneable source of wall-clock time.
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> SystemTime + Send + Sync>);

impl Clock {
    /// Create a clock from an arbitrary time function.
    pub fn new(f: impl Fn() -> SystemTime + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// The system clock.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SystemTime::now)
    }

    /// A clock frozen at the given instant.
    #[must_use]
    pub fn fixed(at: SystemTime) -> Self {
        Self::new(move || at)
    }

    /// Read the current time.
    #[must_use]
    pub fn now(&self) -> SystemTime {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}
