//! Per-animation lifecycle state machine
//!
//! ```text
//! NotStarted --start--> Running --stop--> Stopped --start--> Running
//!                          |
//!                          +--limit reached--> Finished --stop--> Stopped
//! ```
//!
//! `started` and the generation counter are atomics so `stop()` can be called
//! from any thread without blocking. Frame progress lives behind a mutex that
//! also serializes generation changes, so a runner's "may I produce frame N
//! for generation G" check and its index advance are a single step.

use crate::clock::FrameClock;
use crate::value::AttrValue;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Observable lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Never started.
    NotStarted,
    /// Producing frames.
    Running,
    /// Stopped explicitly (or after a frame failure); `start()` resumes.
    Stopped,
    /// A frame, cycle or duration limit was reached.
    Finished,
}

/// Termination conditions and pacing
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationLimits {
    pub cycle: Option<Vec<AttrValue>>,
    pub cycle_count: Option<u64>,
    pub frame_count: Option<u64>,
    pub duration_limit: Option<Duration>,
    pub frame_delay: Option<Duration>,
}

impl AnimationLimits {
    /// Length of the cycle, if a non-empty one is configured
    pub fn cycle_len(&self) -> Option<usize> {
        self.cycle.as_ref().map(Vec::len).filter(|len| *len > 0)
    }

    pub fn is_cycle_enabled(&self) -> bool {
        self.cycle_len().is_some()
    }

    /// A cycle count without a cycle never limits anything
    pub fn is_cycle_limited(&self) -> bool {
        self.is_cycle_enabled() && self.cycle_count.is_some()
    }

    pub fn is_frame_count_limited(&self) -> bool {
        self.frame_count.is_some()
    }

    pub fn is_duration_limited(&self) -> bool {
        self.duration_limit.is_some()
    }

    pub fn is_finite(&self) -> bool {
        self.is_frame_count_limited() || self.is_cycle_limited() || self.is_duration_limited()
    }

    fn cycle_value(&self, frame_index: u64) -> Option<AttrValue> {
        let cycle = self.cycle.as_ref()?;
        let len = self.cycle_len()? as u64;
        cycle.get((frame_index % len) as usize).cloned()
    }
}

/// Frame and cycle position
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameProgress {
    pub frame_index: u64,
    pub cycle_index: u64,
}

/// Permission to render one frame, captured when the frame was produced
#[derive(Clone, Debug, PartialEq)]
pub struct FrameTicket {
    pub generation: u64,
    /// Progress before this frame advanced it
    pub snapshot: FrameProgress,
    pub cycle_value: Option<AttrValue>,
}

impl FrameTicket {
    pub fn frame_index(&self) -> u64 {
        self.snapshot.frame_index
    }
}

/// Why a runner must stop producing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameHalt {
    /// The animation was stopped.
    Stopped,
    /// A newer generation replaced this runner.
    Superseded,
    FrameCountReached,
    CycleCountReached,
    DurationExceeded,
}

impl FrameHalt {
    pub fn is_limit(self) -> bool {
        matches!(
            self,
            FrameHalt::FrameCountReached | FrameHalt::CycleCountReached | FrameHalt::DurationExceeded
        )
    }
}

#[derive(Default)]
struct Timing {
    /// Start of the current run
    start_epoch: Option<Instant>,
    /// First start since creation or the last restart
    first_started_at: Option<Instant>,
    /// Run time banked by earlier stops
    accumulated: Duration,
}

/// Mutable state of one animation
pub struct AnimationState {
    started: AtomicBool,
    finished: AtomicBool,
    generation: AtomicU64,
    progress: Mutex<FrameProgress>,
    timing: Mutex<Timing>,
    limits: RwLock<AnimationLimits>,
    clock: FrameClock,
}

impl AnimationState {
    pub fn new(limits: AnimationLimits, clock: FrameClock) -> Self {
        Self {
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            progress: Mutex::new(FrameProgress::default()),
            timing: Mutex::new(Timing::default()),
            limits: RwLock::new(limits),
            clock,
        }
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Enter a new run, returning its generation
    ///
    /// Returns `None` if the animation is already started. A finished
    /// animation still counts as started until it is stopped.
    pub fn begin_run(&self) -> Option<u64> {
        let _progress = self.progress.lock();
        if self.started.load(Ordering::Acquire) {
            return None;
        }

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.finished.store(false, Ordering::Release);
        {
            let mut timing = self.timing.lock();
            let now = self.clock.now();
            timing.start_epoch = Some(now);
            timing.first_started_at.get_or_insert(now);
        }
        self.started.store(true, Ordering::Release);
        Some(generation)
    }

    /// Leave the current run; returns false if it was not started
    ///
    /// Run time is banked so a later `begin_run` resumes the duration clock.
    pub fn end_run(&self) -> bool {
        if !self.started.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.finished.store(false, Ordering::Release);

        if self.limits.read().is_duration_limited() {
            let mut timing = self.timing.lock();
            if let Some(epoch) = timing.start_epoch {
                timing.accumulated += self.clock.since(epoch);
            }
        }
        true
    }

    /// Forget all progress and timing
    pub fn reset(&self) {
        *self.progress.lock() = FrameProgress::default();
        *self.timing.lock() = Timing::default();
        self.finished.store(false, Ordering::Release);
    }

    /// Decide whether `generation` may produce another frame
    ///
    /// On success the progress is advanced and the ticket carries the
    /// pre-advance snapshot. Reaching a limit marks the animation finished.
    pub fn next_frame(&self, generation: u64) -> Result<FrameTicket, FrameHalt> {
        let mut progress = self.progress.lock();

        if !self.started.load(Ordering::Acquire) {
            return Err(FrameHalt::Stopped);
        }
        if self.generation.load(Ordering::Acquire) != generation {
            return Err(FrameHalt::Superseded);
        }

        let limits = self.limits.read();
        let halt = if limits.frame_count == Some(progress.frame_index) {
            Some(FrameHalt::FrameCountReached)
        } else if limits.is_cycle_limited() && limits.cycle_count == Some(progress.cycle_index) {
            Some(FrameHalt::CycleCountReached)
        } else if self.duration_exceeded_with(&limits) {
            Some(FrameHalt::DurationExceeded)
        } else {
            None
        };
        if let Some(halt) = halt {
            self.finished.store(true, Ordering::Release);
            return Err(halt);
        }

        let ticket = FrameTicket {
            generation,
            snapshot: *progress,
            cycle_value: limits.cycle_value(progress.frame_index),
        };

        progress.frame_index += 1;
        if let Some(len) = limits.cycle_len() {
            if progress.frame_index % len as u64 == 0 {
                progress.cycle_index += 1;
            }
        }

        Ok(ticket)
    }

    /// Whether a frame produced under `ticket` may still be drawn
    pub fn is_ticket_valid(&self, ticket: &FrameTicket) -> bool {
        self.started.load(Ordering::Acquire)
            && self.generation.load(Ordering::Acquire) == ticket.generation
            && self.within_duration_limit()
    }

    /// Undo the speculative advance of a frame that will never be drawn
    ///
    /// Only applies while stopped and only if progress moved past the
    /// ticket. Returns true if progress was rolled back.
    pub fn rollback(&self, ticket: &FrameTicket) -> bool {
        let mut progress = self.progress.lock();
        if self.started.load(Ordering::Acquire) {
            return false;
        }
        if progress.frame_index > ticket.snapshot.frame_index {
            *progress = ticket.snapshot;
            return true;
        }
        false
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn phase(&self) -> PlaybackState {
        if self.finished.load(Ordering::Acquire) {
            PlaybackState::Finished
        } else if self.started.load(Ordering::Acquire) {
            PlaybackState::Running
        } else if self.generation.load(Ordering::Acquire) == 0 {
            PlaybackState::NotStarted
        } else {
            PlaybackState::Stopped
        }
    }

    /// Actively producing frames (started and not finished)
    ///
    /// Frames a finished run already queued still render after this turns
    /// false; only `stop()` or `restart()` discards them.
    pub fn is_started(&self) -> bool {
        self.phase() == PlaybackState::Running
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn progress(&self) -> FrameProgress {
        *self.progress.lock()
    }

    pub fn frame_index(&self) -> u64 {
        self.progress.lock().frame_index
    }

    pub fn cycle_index(&self) -> u64 {
        self.progress.lock().cycle_index
    }

    pub fn first_started_at(&self) -> Option<Instant> {
        self.timing.lock().first_started_at
    }

    /// Run time counted against the duration limit
    pub fn elapsed(&self) -> Duration {
        let timing = self.timing.lock();
        let current = match timing.start_epoch {
            Some(epoch) if self.started.load(Ordering::Acquire) => self.clock.since(epoch),
            _ => Duration::ZERO,
        };
        timing.accumulated + current
    }

    pub fn within_duration_limit(&self) -> bool {
        !self.duration_exceeded_with(&self.limits.read())
    }

    fn duration_exceeded_with(&self, limits: &AnimationLimits) -> bool {
        let Some(limit) = limits.duration_limit else {
            return false;
        };
        let timing = self.timing.lock();
        match timing.start_epoch {
            Some(epoch) => timing.accumulated + self.clock.since(epoch) >= limit,
            None => timing.accumulated >= limit,
        }
    }

    pub fn limits(&self) -> AnimationLimits {
        self.limits.read().clone()
    }

    pub fn frame_delay(&self) -> Option<Duration> {
        self.limits.read().frame_delay
    }

    pub fn update_limits<R>(&self, f: impl FnOnce(&mut AnimationLimits) -> R) -> R {
        f(&mut self.limits.write())
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(limits: AnimationLimits) -> AnimationState {
        AnimationState::new(limits, FrameClock::manual())
    }

    #[test]
    fn test_state_transitions() {
        let state = state(AnimationLimits::default());
        assert_eq!(state.phase(), PlaybackState::NotStarted);

        assert_eq!(state.begin_run(), Some(1));
        assert_eq!(state.phase(), PlaybackState::Running);

        // Already started
        assert_eq!(state.begin_run(), None);
        assert_eq!(state.generation(), 1);

        assert!(state.end_run());
        assert_eq!(state.phase(), PlaybackState::Stopped);
        assert!(!state.end_run());

        assert_eq!(state.begin_run(), Some(2));
        assert_eq!(state.phase(), PlaybackState::Running);
    }

    #[test]
    fn test_frame_count_limit() {
        let state = state(AnimationLimits {
            frame_count: Some(3),
            ..Default::default()
        });
        let generation = state.begin_run().unwrap();

        let indices: Vec<u64> = (0..3)
            .map(|_| state.next_frame(generation).unwrap().frame_index())
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);

        assert_eq!(
            state.next_frame(generation),
            Err(FrameHalt::FrameCountReached)
        );
        assert_eq!(state.phase(), PlaybackState::Finished);
        assert!(!state.is_started());

        // Finished but never stopped: start is still a no-op
        assert_eq!(state.begin_run(), None);
    }

    #[test]
    fn test_cycle_values_and_cycle_count() {
        let state = state(AnimationLimits {
            cycle: Some(vec!["a".into(), "b".into(), "c".into()]),
            cycle_count: Some(2),
            ..Default::default()
        });
        let generation = state.begin_run().unwrap();

        let mut values = Vec::new();
        while let Ok(ticket) = state.next_frame(generation) {
            values.push(ticket.cycle_value.unwrap().to_string());
        }

        assert_eq!(values, vec!["a", "b", "c", "a", "b", "c"]);
        assert_eq!(state.cycle_index(), 2);
        assert_eq!(state.phase(), PlaybackState::Finished);
    }

    #[test]
    fn test_cycle_count_without_cycle_is_unlimited() {
        let state = state(AnimationLimits {
            cycle_count: Some(0),
            ..Default::default()
        });
        assert!(!state.limits().is_finite());

        let generation = state.begin_run().unwrap();
        for _ in 0..10 {
            assert!(state.next_frame(generation).is_ok());
        }
        assert_eq!(state.cycle_index(), 0);
    }

    #[test]
    fn test_superseded_generation() {
        let state = state(AnimationLimits::default());
        let old = state.begin_run().unwrap();
        state.end_run();
        let new = state.begin_run().unwrap();

        assert_eq!(state.next_frame(old), Err(FrameHalt::Superseded));
        assert!(state.next_frame(new).is_ok());
    }

    #[test]
    fn test_stale_ticket_rolls_back_once() {
        let state = state(AnimationLimits::default());
        let generation = state.begin_run().unwrap();

        let first = state.next_frame(generation).unwrap();
        let second = state.next_frame(generation).unwrap();
        assert_eq!(state.frame_index(), 2);

        state.end_run();
        assert!(!state.is_ticket_valid(&first));

        assert!(state.rollback(&first));
        assert_eq!(state.frame_index(), 0);

        // Later tickets never move progress forward again
        assert!(!state.rollback(&second));
        assert_eq!(state.frame_index(), 0);
    }

    #[test]
    fn test_no_rollback_while_running() {
        let state = state(AnimationLimits::default());
        let old = state.begin_run().unwrap();
        let ticket = state.next_frame(old).unwrap();

        // Restart-style race: new generation is already running
        state.end_run();
        state.begin_run().unwrap();
        state.next_frame(state.generation()).unwrap();

        assert!(!state.is_ticket_valid(&ticket));
        assert!(!state.rollback(&ticket));
        assert_eq!(state.frame_index(), 2);
    }

    #[test]
    fn test_zero_duration_limit() {
        let state = state(AnimationLimits {
            duration_limit: Some(Duration::ZERO),
            ..Default::default()
        });
        let generation = state.begin_run().unwrap();
        assert_eq!(
            state.next_frame(generation),
            Err(FrameHalt::DurationExceeded)
        );
    }

    #[test]
    fn test_duration_resumes_across_stop() {
        let clock = FrameClock::manual();
        let state = AnimationState::new(
            AnimationLimits {
                duration_limit: Some(Duration::from_secs(10)),
                ..Default::default()
            },
            clock.clone(),
        );

        let generation = state.begin_run().unwrap();
        clock.advance(Duration::from_secs(6));
        assert!(state.next_frame(generation).is_ok());
        state.end_run();

        // Time spent stopped does not count
        clock.advance(Duration::from_secs(100));
        assert_eq!(state.elapsed(), Duration::from_secs(6));

        let generation = state.begin_run().unwrap();
        clock.advance(Duration::from_secs(3));
        assert!(state.next_frame(generation).is_ok());

        clock.advance(Duration::from_secs(1));
        assert_eq!(
            state.next_frame(generation),
            Err(FrameHalt::DurationExceeded)
        );
    }

    #[test]
    fn test_reset_clears_progress_and_timing() {
        let clock = FrameClock::manual();
        let state = AnimationState::new(
            AnimationLimits {
                duration_limit: Some(Duration::from_secs(5)),
                ..Default::default()
            },
            clock.clone(),
        );
        let generation = state.begin_run().unwrap();
        state.next_frame(generation).unwrap();
        clock.advance(Duration::from_secs(2));
        state.end_run();

        state.reset();
        assert_eq!(state.progress(), FrameProgress::default());
        assert_eq!(state.elapsed(), Duration::ZERO);
        assert!(state.first_started_at().is_none());
    }
}
