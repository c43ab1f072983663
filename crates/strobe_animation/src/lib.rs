//! Strobe Animation Scheduler
//!
//! Frame-by-frame animations that each advance on their own background
//! thread while every draw happens serially on a single UI thread.
//!
//! # Features
//!
//! - **Fair multiplexing**: one frame queue per animation, served round robin
//! - **Three limits**: frame count, cycle count, and wall-clock duration
//! - **Safe cancellation**: stale frames are discarded by generation token
//! - **Resumable runs**: duration limits keep counting across stop/start
//! - **Declarative config**: TOML/JSON configs and string-keyed attributes
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strobe_animation::{Animation, AnimationScheduler};
//! use strobe_platform::{ManualExecutor, RecordingTarget};
//!
//! let executor = Arc::new(ManualExecutor::new());
//! let scheduler = AnimationScheduler::new(executor.clone());
//! let target = Arc::new(RecordingTarget::new());
//!
//! let t = Arc::clone(&target);
//! let animation = Animation::builder(&scheduler.handle(), target.clone())
//!     .label("counter")
//!     .frame_count(3)
//!     .on_frame(move |frame| {
//!         t.append(format!("frame {}", frame.index));
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! animation.post_add_content().unwrap();
//! while animation.is_started() {
//!     std::thread::yield_now();
//! }
//! executor.run_until_idle();
//! assert_eq!(target.history(), vec!["frame 0", "frame 1", "frame 2"]);
//! ```

pub mod animation;
mod attributes;
pub mod clock;
pub mod config;
pub mod error;
mod runner;
pub mod scheduler;
pub mod state;
pub mod value;


pub use animation::{Animation, AnimationBuilder, Frame, FrameProducer};
pub use attributes::attribute_names;
pub use clock::FrameClock;
pub use config::AnimationConfig;
pub use error::{AnimationError, Result};
pub use scheduler::{
    is_scheduler_initialized, set_global_scheduler, try_get_scheduler, AnimationId,
    AnimationScheduler, FrameTask, SchedulerHandle, SchedulerStats,
};
pub use state::{AnimationLimits, AnimationState, FrameHalt, FrameProgress, PlaybackState};
pub use value::AttrValue;
