//! Animation frame scheduler
//!
//! Multiplexes frames from many animations onto one UI executor. Each
//! registered animation owns a queue of pending frame tasks; every enqueue
//! posts exactly one pump to the executor, and each pump serves one frame
//! from the next animation in round-robin order. The scheduler has no timer
//! or thread of its own - it rides entirely on the executor's serial queue.

use crate::error::{AnimationError, Result};
use indexmap::IndexMap;
use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, Weak};
use strobe_platform::{panic_message, UiExecutor};

// ============================================================================
// Global Animation Scheduler State
// ============================================================================

/// Process-wide scheduler handle, installed once at startup
static GLOBAL_SCHEDULER: OnceLock<SchedulerHandle> = OnceLock::new();

/// Install the process-wide scheduler handle
///
/// The scheduler itself stays owned by the application; the global slot only
/// holds a weak handle to it.
pub fn set_global_scheduler(handle: SchedulerHandle) -> Result<()> {
    GLOBAL_SCHEDULER
        .set(handle)
        .map_err(|_| AnimationError::SchedulerAlreadyInstalled)
}

/// The process-wide scheduler handle, if one was installed
pub fn try_get_scheduler() -> Option<SchedulerHandle> {
    GLOBAL_SCHEDULER.get().cloned()
}

/// Check if the global scheduler has been installed
pub fn is_scheduler_initialized() -> bool {
    GLOBAL_SCHEDULER.get().is_some()
}

new_key_type! {
    /// Handle to an animation registered with the scheduler
    pub struct AnimationId;
}

/// A pending frame, run on the UI thread
pub type FrameTask = Box<dyn FnOnce() -> anyhow::Result<()> + Send + 'static>;

/// Counters describing scheduler activity
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Pumps executed on the UI thread
    pub pumps: u64,
    /// Frame tasks that completed successfully
    pub frames_run: u64,
    /// Frame tasks that returned an error or panicked
    pub frames_failed: u64,
    /// Pumps that found nothing to do
    pub idle_pumps: u64,
}

/// Queue set plus round-robin bookkeeping
struct SchedulerInner {
    /// Registered animations and their log labels
    animations: SlotMap<AnimationId, String>,
    /// Pending tasks; iteration order is the rotation order
    queues: IndexMap<AnimationId, VecDeque<FrameTask>>,
    /// Position in `queues` to try next
    cursor: usize,
    stats: SchedulerStats,
}

impl SchedulerInner {
    /// Advance the rotation to the next animation with pending work
    ///
    /// Empty queues met along the way are pruned from the rotation.
    fn select_next(&mut self) -> Option<AnimationId> {
        loop {
            if self.queues.is_empty() {
                self.cursor = 0;
                return None;
            }

            let index = self.cursor % self.queues.len();
            let (id, empty) = self
                .queues
                .get_index(index)
                .map(|(id, queue)| (*id, queue.is_empty()))?;
            if empty {
                // The following entry slides into `index`, so retry there
                self.queues.shift_remove_index(index);
                self.cursor = index;
                continue;
            }

            self.cursor = index + 1;
            return Some(id);
        }
    }

    /// Select the next animation and take its oldest pending frame
    fn take_next(&mut self) -> Option<(AnimationId, FrameTask)> {
        let id = self.select_next()?;
        let task = self.queues.get_mut(&id)?.pop_back()?;
        Some((id, task))
    }

    fn label(&self, id: AnimationId) -> &str {
        self.animations.get(id).map(String::as_str).unwrap_or("<unregistered>")
    }
}

struct SchedulerShared {
    inner: Mutex<SchedulerInner>,
    executor: Arc<dyn UiExecutor>,
}

impl SchedulerShared {
    fn register(&self, label: String) -> AnimationId {
        let id = self.inner.lock().animations.insert(label);
        tracing::trace!("AnimationScheduler: registered {:?}", id);
        id
    }

    fn unregister(&self, id: AnimationId) -> usize {
        let mut inner = self.inner.lock();
        let label = inner.animations.remove(id);
        let dropped = inner
            .queues
            .shift_remove(&id)
            .map(|queue| queue.len())
            .unwrap_or(0);
        if let Some(label) = label {
            tracing::debug!(
                "AnimationScheduler: unregistered '{}' ({} pending frames dropped)",
                label,
                dropped
            );
        }
        dropped
    }

    fn enqueue(self: &Arc<Self>, id: AnimationId, task: FrameTask) -> Result<()> {
        // Posting happens under the lock so a rejected post undoes exactly
        // this push. Executors never run posted tasks inline.
        let mut inner = self.inner.lock();
        if !inner.animations.contains_key(id) {
            return Err(AnimationError::Unregistered(id));
        }
        inner.queues.entry(id).or_default().push_front(task);

        let weak = Arc::downgrade(self);
        let posted = self.executor.post(Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.pump();
            }
        }));

        if let Err(err) = posted {
            let emptied = inner.queues.get_mut(&id).map_or(false, |queue| {
                queue.pop_front();
                queue.is_empty()
            });
            if emptied {
                inner.queues.shift_remove(&id);
            }
            return Err(err.into());
        }
        Ok(())
    }

    fn pump(&self) -> bool {
        let next = {
            let mut inner = self.inner.lock();
            inner.stats.pumps += 1;
            let next = inner.take_next();
            if next.is_none() {
                inner.stats.idle_pumps += 1;
            }
            next
        };
        let Some((id, task)) = next else {
            return false;
        };

        // Run without the lock so frames may touch the scheduler
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));

        let mut inner = self.inner.lock();
        match outcome {
            Ok(Ok(())) => inner.stats.frames_run += 1,
            Ok(Err(err)) => {
                inner.stats.frames_failed += 1;
                tracing::error!("Animation '{}' frame failed: {:#}", inner.label(id), err);
            }
            Err(payload) => {
                inner.stats.frames_failed += 1;
                tracing::error!(
                    "Animation '{}' frame panicked: {}",
                    inner.label(id),
                    panic_message(payload.as_ref())
                );
            }
        }
        true
    }
}

/// The scheduler that serializes animation frames onto the UI executor
///
/// Owned by the application (typically created once at startup); animations
/// hold a weak [`SchedulerHandle`].
///
/// ```ignore
/// let executor = Arc::new(ThreadExecutor::spawn("strobe-ui")?);
/// let scheduler = AnimationScheduler::new(executor);
/// set_global_scheduler(scheduler.handle())?;
/// ```
pub struct AnimationScheduler {
    shared: Arc<SchedulerShared>,
}

impl AnimationScheduler {
    pub fn new(executor: Arc<dyn UiExecutor>) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                inner: Mutex::new(SchedulerInner {
                    animations: SlotMap::with_key(),
                    queues: IndexMap::new(),
                    cursor: 0,
                    stats: SchedulerStats::default(),
                }),
                executor,
            }),
        }
    }

    /// Get a handle to this scheduler for passing to animations
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Register an animation; its frames can be enqueued under the returned id
    pub fn register(&self, label: impl Into<String>) -> AnimationId {
        self.shared.register(label.into())
    }

    /// Forget an animation, dropping its pending frames
    ///
    /// Returns the number of frames dropped.
    pub fn unregister(&self, id: AnimationId) -> usize {
        self.shared.unregister(id)
    }

    /// Queue a frame for `id` and post one pump to the UI executor
    pub fn enqueue(&self, id: AnimationId, task: FrameTask) -> Result<()> {
        self.shared.enqueue(id, task)
    }

    /// Advance the round-robin rotation without running anything
    pub fn select_next(&self) -> Option<AnimationId> {
        self.shared.inner.lock().select_next()
    }

    /// Run one frame from the next animation in rotation
    ///
    /// Must only be called on the UI thread. Returns false if no frame was
    /// pending.
    pub fn pump(&self) -> bool {
        self.shared.pump()
    }

    /// Frames waiting across all animations
    pub fn pending_count(&self) -> usize {
        self.shared
            .inner
            .lock()
            .queues
            .values()
            .map(VecDeque::len)
            .sum()
    }

    /// Frames waiting for one animation
    pub fn pending_for(&self, id: AnimationId) -> usize {
        self.shared
            .inner
            .lock()
            .queues
            .get(&id)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    /// Number of registered animations
    pub fn animation_count(&self) -> usize {
        self.shared.inner.lock().animations.len()
    }

    /// Number of animations currently in the rotation
    pub fn active_count(&self) -> usize {
        self.shared.inner.lock().queues.len()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.inner.lock().stats.clone()
    }
}

/// A weak handle to the animation scheduler
///
/// Passed to animations and runner threads. It won't keep the scheduler
/// alive; operations on a dropped scheduler fail with
/// [`AnimationError::SchedulerGone`] or quietly no-op.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Weak<SchedulerShared>,
}

impl SchedulerHandle {
    fn upgrade(&self) -> Result<Arc<SchedulerShared>> {
        self.shared.upgrade().ok_or(AnimationError::SchedulerGone)
    }

    pub fn register(&self, label: impl Into<String>) -> Result<AnimationId> {
        Ok(self.upgrade()?.register(label.into()))
    }

    pub fn unregister(&self, id: AnimationId) {
        if let Some(shared) = self.shared.upgrade() {
            shared.unregister(id);
        }
    }

    pub fn enqueue(&self, id: AnimationId, task: FrameTask) -> Result<()> {
        self.upgrade()?.enqueue(id, task)
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strobe_platform::ManualExecutor;

    fn scheduler() -> (Arc<ManualExecutor>, AnimationScheduler) {
        let executor = Arc::new(ManualExecutor::new());
        let scheduler = AnimationScheduler::new(executor.clone());
        (executor, scheduler)
    }

    fn recording_task(log: &Arc<Mutex<Vec<String>>>, entry: String) -> FrameTask {
        let log = Arc::clone(log);
        Box::new(move || {
            log.lock().push(entry);
            Ok(())
        })
    }

    #[test]
    fn test_enqueue_posts_one_pump_each() {
        let (executor, scheduler) = scheduler();
        let id = scheduler.register("a");
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            scheduler
                .enqueue(id, recording_task(&log, format!("a{}", i)))
                .unwrap();
        }
        assert_eq!(executor.pending(), 3);
        assert_eq!(scheduler.pending_count(), 3);

        assert_eq!(executor.run_until_idle(), 3);
        // Oldest frame is served first
        assert_eq!(*log.lock(), vec!["a0", "a1", "a2"]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_round_robin_interleaves() {
        let (executor, scheduler) = scheduler();
        let a = scheduler.register("a");
        let b = scheduler.register("b");
        let log = Arc::new(Mutex::new(Vec::new()));

        // A floods the queue before B produces anything
        for i in 0..4 {
            scheduler.enqueue(a, recording_task(&log, format!("a{}", i))).unwrap();
        }
        for i in 0..4 {
            scheduler.enqueue(b, recording_task(&log, format!("b{}", i))).unwrap();
        }
        executor.run_until_idle();

        assert_eq!(
            *log.lock(),
            vec!["a0", "b0", "a1", "b1", "a2", "b2", "a3", "b3"]
        );
    }

    #[test]
    fn test_fairness_bound_over_window() {
        let (_executor, scheduler) = scheduler();
        let a = scheduler.register("a");
        let b = scheduler.register("b");
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..20 {
            scheduler.enqueue(a, recording_task(&log, "a".into())).unwrap();
            if i % 2 == 0 {
                scheduler.enqueue(b, recording_task(&log, "b".into())).unwrap();
            }
        }

        // Both busy for the first 20 pumps: each gets N±1 turns of 2N
        for _ in 0..20 {
            assert!(scheduler.pump());
        }
        let log = log.lock();
        let a_turns = log.iter().filter(|e| *e == "a").count();
        assert!((9..=11).contains(&a_turns), "a got {} turns", a_turns);
    }

    #[test]
    fn test_empty_queues_pruned_from_rotation() {
        let (_executor, scheduler) = scheduler();
        let a = scheduler.register("a");
        let b = scheduler.register("b");
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.enqueue(a, recording_task(&log, "a".into())).unwrap();
        scheduler.enqueue(b, recording_task(&log, "b".into())).unwrap();
        scheduler.enqueue(b, recording_task(&log, "b".into())).unwrap();
        assert_eq!(scheduler.active_count(), 2);

        assert!(scheduler.pump());
        assert!(scheduler.pump());
        assert!(scheduler.pump());
        assert_eq!(*log.lock(), vec!["a", "b", "b"]);

        // A was pruned when the rotation met its empty queue
        assert_eq!(scheduler.active_count(), 1);
        assert!(!scheduler.pump());
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.select_next(), None);
    }

    #[test]
    fn test_failing_frame_does_not_stall_others() {
        let (executor, scheduler) = scheduler();
        let bad = scheduler.register("bad");
        let good = scheduler.register("good");
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler
            .enqueue(bad, Box::new(|| Err(anyhow::anyhow!("broken frame"))))
            .unwrap();
        scheduler.enqueue(bad, Box::new(|| panic!("worse frame"))).unwrap();
        scheduler.enqueue(good, recording_task(&log, "g0".into())).unwrap();
        scheduler.enqueue(good, recording_task(&log, "g1".into())).unwrap();

        executor.run_until_idle();

        assert_eq!(*log.lock(), vec!["g0", "g1"]);
        let stats = scheduler.stats();
        assert_eq!(stats.frames_failed, 2);
        assert_eq!(stats.frames_run, 2);
        assert_eq!(stats.pumps, 4);
    }

    #[test]
    fn test_unregister_drops_pending_frames() {
        let (executor, scheduler) = scheduler();
        let id = scheduler.register("gone");
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.enqueue(id, recording_task(&log, "x".into())).unwrap();
        assert_eq!(scheduler.unregister(id), 1);
        assert_eq!(scheduler.animation_count(), 0);

        // The pump still arrives but finds nothing
        executor.run_until_idle();
        assert!(log.lock().is_empty());
        assert_eq!(scheduler.stats().idle_pumps, 1);

        assert!(matches!(
            scheduler.enqueue(id, recording_task(&log, "y".into())),
            Err(AnimationError::Unregistered(_))
        ));
    }

    #[test]
    fn test_handle_weak_reference() {
        let handle = {
            let (_executor, scheduler) = scheduler();
            scheduler.handle()
        };

        assert!(!handle.is_alive());
        assert!(matches!(
            handle.register("late"),
            Err(AnimationError::SchedulerGone)
        ));
    }

    #[test]
    fn test_closed_executor_reports_error() {
        let (executor, scheduler) = scheduler();
        let id = scheduler.register("a");
        executor.close();

        let result = scheduler.enqueue(id, Box::new(|| Ok(())));
        assert!(matches!(result, Err(AnimationError::Platform(_))));

        // The rejected frame must not linger without a pump
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.pending_for(id), 0);
    }

    #[test]
    fn test_rejected_post_keeps_earlier_frames() {
        let (executor, scheduler) = scheduler();
        let id = scheduler.register("a");
        scheduler.enqueue(id, Box::new(|| Ok(()))).unwrap();
        executor.close();

        assert!(scheduler.enqueue(id, Box::new(|| Ok(()))).is_err());
        assert_eq!(scheduler.pending_for(id), 1);
        assert_eq!(scheduler.active_count(), 1);
    }
}
