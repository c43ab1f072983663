//! Animation handle
//!
//! An [`Animation`] binds a frame producer to a render target and drives it
//! through the scheduler. Handles are cheap to clone; all clones refer to the
//! same animation.
//!
//! ```ignore
//! let animation = Animation::builder(&scheduler.handle(), target.clone())
//!     .label("blinker")
//!     .cycle(vec!["on", "off"])
//!     .cycle_count(3)
//!     .frame_delay(Duration::from_millis(250))
//!     .on_frame(move |frame| {
//!         target.append(format!("{} {}", frame.index, frame.cycle_value.as_ref().unwrap()));
//!         Ok(())
//!     })
//!     .build()?;
//!
//! animation.post_add_content()?; // wires disposal and starts
//! ```

use crate::attributes;
use crate::clock::FrameClock;
use crate::config::AnimationConfig;
use crate::error::{AnimationError, Result};
use crate::runner::AnimationRunner;
use crate::scheduler::{AnimationId, SchedulerHandle};
use crate::state::{AnimationLimits, AnimationState, FrameTicket, PlaybackState};
use crate::value::AttrValue;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strobe_platform::{panic_message, RenderTarget};

/// Renders one frame's content; runs on the UI thread inside `with_content`
pub type FrameProducer = Box<dyn Fn(&Frame) -> anyhow::Result<()> + Send + Sync>;

/// What a frame producer is asked to draw
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub index: u64,
    pub cycle_index: u64,
    /// `cycle[index % cycle.len()]` when a cycle is configured
    pub cycle_value: Option<AttrValue>,
    pub generation: u64,
}

pub(crate) struct AnimationInner {
    pub(crate) id: AnimationId,
    pub(crate) label: String,
    pub(crate) state: AnimationState,
    pub(crate) scheduler: SchedulerHandle,
    producer: FrameProducer,
    target: Arc<dyn RenderTarget>,
    attached: AtomicBool,
    autostart: AtomicBool,
    disposed: AtomicBool,
}

impl AnimationInner {
    fn start(self: &Arc<Self>) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            tracing::debug!("Animation '{}': start ignored, target disposed", self.label);
            return Ok(());
        }
        let Some(generation) = self.state.begin_run() else {
            return Ok(());
        };
        tracing::debug!("Animation '{}': start (generation {})", self.label, generation);

        if let Err(err) = AnimationRunner::spawn(Arc::clone(self), generation) {
            self.state.end_run();
            return Err(err);
        }
        Ok(())
    }

    fn stop(&self) -> bool {
        let stopped = self.state.end_run();
        if stopped {
            tracing::debug!(
                "Animation '{}': stop at frame {} (generation {})",
                self.label,
                self.state.frame_index(),
                self.state.generation()
            );
        }
        stopped
    }

    fn restart(self: &Arc<Self>) -> Result<()> {
        self.stop();
        self.state.reset();
        tracing::debug!("Animation '{}': restart", self.label);
        self.start()
    }

    /// Stop the run tagged `generation` if it is still the current one
    pub(crate) fn halt(&self, generation: u64) {
        if self.state.generation() == generation && self.stop() {
            tracing::warn!(
                "Animation '{}': generation {} halted after a failed frame",
                self.label,
                generation
            );
        }
    }

    /// Draw one frame on the UI thread, or discard it if it went stale
    pub(crate) fn render_frame(&self, ticket: &FrameTicket) -> anyhow::Result<()> {
        if !self.state.is_ticket_valid(ticket) {
            if self.state.rollback(ticket) {
                tracing::debug!(
                    "Animation '{}': rolled back to frame {} after stop",
                    self.label,
                    ticket.frame_index()
                );
            } else {
                tracing::trace!(
                    "Animation '{}': discarding stale frame {}",
                    self.label,
                    ticket.frame_index()
                );
            }
            return Ok(());
        }

        let frame = Frame {
            index: ticket.snapshot.frame_index,
            cycle_index: ticket.snapshot.cycle_index,
            cycle_value: ticket.cycle_value.clone(),
            generation: ticket.generation,
        };

        self.target.clear_content();
        let mut outcome: anyhow::Result<()> = Ok(());
        self.target.with_content(&mut || {
            outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.producer)(&frame)))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!(
                        "frame producer panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                });
        });

        match outcome {
            Ok(()) => {
                self.target.redraw();
                tracing::trace!("Animation '{}': drew frame {}", self.label, frame.index);
                Ok(())
            }
            Err(err) => {
                self.halt(ticket.generation);
                // A resumed run retries the frame that failed
                self.state.rollback(ticket);
                Err(err.context(format!("frame {}", frame.index)))
            }
        }
    }
}

impl Drop for AnimationInner {
    fn drop(&mut self) {
        self.scheduler.unregister(self.id);
    }
}

/// A frame animation attached to a render target
#[derive(Clone)]
pub struct Animation {
    inner: Arc<AnimationInner>,
}

impl Animation {
    /// Start building an animation for `target`
    pub fn builder(scheduler: &SchedulerHandle, target: Arc<dyn RenderTarget>) -> AnimationBuilder {
        AnimationBuilder::new(scheduler.clone(), target)
    }

    pub fn id(&self) -> AnimationId {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Finish declaration: stop on target disposal, then start unless paused
    ///
    /// Calling it more than once has no further effect.
    pub fn post_add_content(&self) -> Result<()> {
        if self.inner.attached.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner.target.on_disposed(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.disposed.store(true, Ordering::Release);
                tracing::debug!("Animation '{}': render target disposed", inner.label);
                inner.stop();
            }
        }));

        if self.inner.autostart.load(Ordering::Acquire) {
            self.start()
        } else {
            Ok(())
        }
    }

    /// Start, or resume a stopped animation
    ///
    /// No-op while already started, including a finite animation that ran
    /// to its limit without being stopped.
    pub fn start(&self) -> Result<()> {
        self.inner.start()
    }

    /// Stop producing frames; frames already queued become no-ops
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Begin a fresh run from frame 0, whatever the current state
    pub fn restart(&self) -> Result<()> {
        self.inner.restart()
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.state.phase()
    }

    /// Actively producing frames
    ///
    /// False as soon as a limit is reached, even while frames that run
    /// already queued are still being drawn.
    pub fn is_started(&self) -> bool {
        self.inner.state.is_started()
    }

    /// Not producing frames; queued frames of a finished run still render
    pub fn is_stopped(&self) -> bool {
        !self.is_started()
    }

    pub fn is_finite(&self) -> bool {
        self.inner.state.limits().is_finite()
    }

    pub fn is_infinite(&self) -> bool {
        !self.is_finite()
    }

    pub fn is_indefinite(&self) -> bool {
        self.is_infinite()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.attached.load(Ordering::Acquire)
    }

    pub fn frame_index(&self) -> u64 {
        self.inner.state.frame_index()
    }

    pub fn current_frame_index(&self) -> u64 {
        self.frame_index()
    }

    pub fn cycle_index(&self) -> u64 {
        self.inner.state.cycle_index()
    }

    pub fn generation(&self) -> u64 {
        self.inner.state.generation()
    }

    /// Run time counted against the duration limit
    pub fn elapsed(&self) -> Duration {
        self.inner.state.elapsed()
    }

    pub fn first_started_at(&self) -> Option<Instant> {
        self.inner.state.first_started_at()
    }

    pub fn limits(&self) -> AnimationLimits {
        self.inner.state.limits()
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn cycle(&self) -> Option<Vec<AttrValue>> {
        self.inner.state.limits().cycle
    }

    pub fn set_cycle(&self, cycle: Option<Vec<AttrValue>>) {
        self.inner.state.update_limits(|limits| limits.cycle = cycle);
    }

    pub fn cycle_count(&self) -> Option<u64> {
        self.inner.state.limits().cycle_count
    }

    pub fn set_cycle_count(&self, count: Option<u64>) {
        self.inner.state.update_limits(|limits| limits.cycle_count = count);
    }

    pub fn frame_count(&self) -> Option<u64> {
        self.inner.state.limits().frame_count
    }

    pub fn set_frame_count(&self, count: Option<u64>) {
        self.inner.state.update_limits(|limits| limits.frame_count = count);
    }

    pub fn duration_limit(&self) -> Option<Duration> {
        self.inner.state.limits().duration_limit
    }

    pub fn set_duration_limit(&self, limit: Option<Duration>) {
        self.inner.state.update_limits(|limits| limits.duration_limit = limit);
    }

    pub fn frame_delay(&self) -> Option<Duration> {
        self.inner.state.frame_delay()
    }

    pub fn set_frame_delay(&self, delay: Option<Duration>) {
        self.inner.state.update_limits(|limits| limits.frame_delay = delay);
    }

    /// Whether `post_add_content` will start the animation
    pub fn autostart(&self) -> bool {
        self.inner.autostart.load(Ordering::Acquire)
    }

    /// Before attachment this sets the auto-start flag; afterwards it starts
    /// or stops the animation
    pub fn set_started(&self, started: bool) -> Result<()> {
        if !self.is_attached() {
            self.inner.autostart.store(started, Ordering::Release);
            return Ok(());
        }
        if started {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    /// Read an attribute by name (`frame_count`, `frameCount`, `every`, ...)
    pub fn get_attribute(&self, name: &str) -> Result<AttrValue> {
        let attribute = attributes::lookup(name)
            .ok_or_else(|| AnimationError::UnknownAttribute(name.to_string()))?;
        Ok((attribute.get)(self))
    }

    /// Write an attribute by name; `Nil` clears optional limits
    pub fn set_attribute(&self, name: &str, value: impl Into<AttrValue>) -> Result<()> {
        let attribute = attributes::lookup(name)
            .ok_or_else(|| AnimationError::UnknownAttribute(name.to_string()))?;
        (attribute.set)(self, attribute.name, value.into())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        attributes::lookup(name).is_some()
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("label", &self.inner.label)
            .field("state", &self.state())
            .field("frame_index", &self.frame_index())
            .field("generation", &self.generation())
            .finish()
    }
}

/// Builder for [`Animation`]
pub struct AnimationBuilder {
    scheduler: SchedulerHandle,
    target: Arc<dyn RenderTarget>,
    label: Option<String>,
    limits: AnimationLimits,
    autostart: bool,
    clock: FrameClock,
    producer: Option<FrameProducer>,
    error: Option<AnimationError>,
}

impl AnimationBuilder {
    fn new(scheduler: SchedulerHandle, target: Arc<dyn RenderTarget>) -> Self {
        Self {
            scheduler,
            target,
            label: None,
            limits: AnimationLimits::default(),
            autostart: true,
            clock: FrameClock::system(),
            producer: None,
            error: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Apply a declarative configuration
    pub fn config(mut self, config: AnimationConfig) -> Self {
        match (config.duration_limit(), config.frame_delay()) {
            (Ok(duration_limit), Ok(frame_delay)) => {
                self.limits.duration_limit = duration_limit;
                self.limits.frame_delay = frame_delay;
            }
            (Err(err), _) | (_, Err(err)) => {
                self.error.get_or_insert(err);
            }
        }
        if config.label.is_some() {
            self.label = config.label;
        }
        self.limits.frame_count = config.frame_count;
        self.limits.cycle_count = config.cycle_count;
        self.limits.cycle = config.cycle;
        self.autostart = config.started;
        self
    }

    pub fn frame_count(mut self, count: u64) -> Self {
        self.limits.frame_count = Some(count);
        self
    }

    pub fn cycle<T: Into<AttrValue>>(mut self, values: Vec<T>) -> Self {
        self.limits.cycle = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn cycle_count(mut self, count: u64) -> Self {
        self.limits.cycle_count = Some(count);
        self
    }

    pub fn duration_limit(mut self, limit: Duration) -> Self {
        self.limits.duration_limit = Some(limit);
        self
    }

    pub fn frame_delay(mut self, delay: Duration) -> Self {
        self.limits.frame_delay = Some(delay);
        self
    }

    /// Whether `post_add_content` starts the animation (default true)
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    /// Use a specific clock for duration limits
    pub fn clock(mut self, clock: FrameClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn on_frame<F>(mut self, producer: F) -> Self
    where
        F: Fn(&Frame) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.producer = Some(Box::new(producer));
        self
    }

    /// Register with the scheduler and create the animation (not started)
    pub fn build(self) -> Result<Animation> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let label = self.label.unwrap_or_else(|| "animation".to_string());
        let producer = self
            .producer
            .ok_or_else(|| AnimationError::MissingFrameProducer(label.clone()))?;
        let id = self.scheduler.register(label.clone())?;

        tracing::debug!(
            "Animation '{}': created ({})",
            label,
            if self.limits.is_finite() { "finite" } else { "infinite" }
        );

        Ok(Animation {
            inner: Arc::new(AnimationInner {
                id,
                label,
                state: AnimationState::new(self.limits, self.clock),
                scheduler: self.scheduler,
                producer,
                target: self.target,
                attached: AtomicBool::new(false),
                autostart: AtomicBool::new(self.autostart),
                disposed: AtomicBool::new(false),
            }),
        })
    }
}
