use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// Time source for dispatch timing and profiling.
pub trait Clock: Send + Sync {
    /// Monotonic milliseconds from an arbitrary origin.
    fn milli_count(&self) -> u64;

    fn wall_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn milli_count(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            millis: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn milli_count(&self) -> u64 {
        self.millis.load(Ordering::Relaxed)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn milli_count(&self) -> u64 {
        (**self).milli_count()
    }

    fn wall_time(&self) -> SystemTime {
        (**self).wall_time()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_on_request() {
        let clock = ManualClock::new(10);
        assert_eq!(clock.milli_count(), 10);
        clock.advance(5);
        assert_eq!(clock.milli_count(), 15);
        clock.set(3);
        assert_eq!(clock.milli_count(), 3);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.milli_count();
        let b = clock.milli_count();
        assert!(b >= a);
    }
}
