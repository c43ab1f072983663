//! Background frame production
//!
//! Every effective `start()` spawns one runner thread tagged with the new
//! generation. The runner asks the state machine for permission to produce
//! each frame, wraps the frame in a task for the UI thread, hands it to the
//! scheduler and sleeps for the configured frame delay. It never waits on the
//! UI thread.

use crate::animation::AnimationInner;
use crate::error::{AnimationError, Result};
use crate::scheduler::FrameTask;
use crate::state::FrameTicket;
use std::sync::Arc;
use std::thread;

pub(crate) struct AnimationRunner {
    animation: Arc<AnimationInner>,
    generation: u64,
}

impl AnimationRunner {
    /// Spawn the runner thread for `generation`
    pub(crate) fn spawn(animation: Arc<AnimationInner>, generation: u64) -> Result<()> {
        let name = format!("strobe-{}-g{}", animation.label, generation);
        let runner = Self {
            animation,
            generation,
        };

        thread::Builder::new()
            .name(name)
            .spawn(move || runner.run())
            .map_err(|e| AnimationError::RunnerSpawn(e.to_string()))?;
        Ok(())
    }

    fn run(self) {
        let label = &self.animation.label;
        tracing::trace!("Animation '{}': runner {} started", label, self.generation);

        loop {
            let ticket = match self.animation.state.next_frame(self.generation) {
                Ok(ticket) => ticket,
                Err(halt) if halt.is_limit() => {
                    tracing::debug!(
                        "Animation '{}': finished after {} frames ({:?})",
                        label,
                        self.animation.state.frame_index(),
                        halt
                    );
                    break;
                }
                Err(halt) => {
                    tracing::trace!(
                        "Animation '{}': runner {} exiting ({:?})",
                        label,
                        self.generation,
                        halt
                    );
                    break;
                }
            };

            let frame_index = ticket.frame_index();
            let task = self.frame_task(ticket);
            if let Err(err) = self.animation.scheduler.enqueue(self.animation.id, task) {
                tracing::error!(
                    "Animation '{}': could not schedule frame {}: {}",
                    label,
                    frame_index,
                    err
                );
                self.animation.halt(self.generation);
                break;
            }

            if let Some(delay) = self.animation.state.frame_delay() {
                thread::sleep(delay);
            }
        }
    }

    /// Wrap a frame for the UI thread
    ///
    /// Queued tasks hold the animation weakly so a backlog never keeps a
    /// dropped animation alive.
    fn frame_task(&self, ticket: FrameTicket) -> FrameTask {
        let animation = Arc::downgrade(&self.animation);
        Box::new(move || match animation.upgrade() {
            Some(animation) => animation.render_frame(&ticket),
            None => Ok(()),
        })
    }
}
