//! Wall-clock source for duration limits

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Time source used for duration-limit bookkeeping
///
/// The system clock follows `Instant::now()`. A manual clock only moves when
/// [`FrameClock::advance`] is called, which makes duration limits testable
/// without sleeping. Clones share the same manual offset.
#[derive(Clone, Debug)]
pub struct FrameClock {
    origin: Instant,
    manual: Option<Arc<Mutex<Duration>>>,
}

impl FrameClock {
    /// Clock following real time
    pub fn system() -> Self {
        Self {
            origin: Instant::now(),
            manual: None,
        }
    }

    /// Clock frozen at creation until advanced by hand
    pub fn manual() -> Self {
        Self {
            origin: Instant::now(),
            manual: Some(Arc::new(Mutex::new(Duration::ZERO))),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.manual.is_some()
    }

    /// Current instant
    pub fn now(&self) -> Instant {
        match &self.manual {
            Some(offset) => self.origin + *offset.lock(),
            None => Instant::now(),
        }
    }

    /// Time elapsed since `epoch`, saturating at zero
    pub fn since(&self, epoch: Instant) -> Duration {
        self.now().saturating_duration_since(epoch)
    }

    /// Move a manual clock forward; no-op on the system clock
    pub fn advance(&self, by: Duration) {
        match &self.manual {
            Some(offset) => *offset.lock() += by,
            None => tracing::warn!("FrameClock::advance ignored on the system clock"),
        }
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::system()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_only_moves_when_advanced() {
        let clock = FrameClock::manual();
        let start = clock.now();
        assert_eq!(clock.since(start), Duration::ZERO);

        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.since(start), Duration::from_millis(250));
    }

    #[test]
    fn test_manual_clock_clones_share_offset() {
        let clock = FrameClock::manual();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_secs(1));
        assert_eq!(clock.since(start), Duration::from_secs(1));
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = FrameClock::system();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
        assert!(!clock.is_manual());
    }
}
