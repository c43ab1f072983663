//! Strobe Platform Layer
//!
//! Contracts for the two UI-side collaborators of the strobe animation
//! scheduler, plus ready-made implementations.
//!
//! # Architecture
//!
//! - [`UiExecutor`] - single-threaded dispatcher that runs posted closures in
//!   submission order on the thread owning the UI
//! - [`RenderTarget`] - surface whose content an animation frame replaces
//!
//! # Implementations
//!
//! - [`ThreadExecutor`] - dedicated UI thread fed by a channel
//! - [`ManualExecutor`] - queue drained by an external loop (or a test)
//! - [`RecordingTarget`] - in-memory target recording every operation
//!
//! # Example
//!
//! ```
//! use strobe_platform::{ManualExecutor, RecordingTarget, RenderTarget, UiExecutor};
//! use std::sync::Arc;
//!
//! let executor = ManualExecutor::new();
//! let target = Arc::new(RecordingTarget::new());
//!
//! let t = Arc::clone(&target);
//! executor
//!     .post(Box::new(move || {
//!         t.clear_content();
//!         t.with_content(&mut || t.append("frame 0"));
//!         t.redraw();
//!     }))
//!     .unwrap();
//!
//! executor.run_until_idle();
//! assert_eq!(target.content(), vec!["frame 0".to_string()]);
//! ```

mod error;
mod executor;
mod render;

pub use error::{PlatformError, Result};
pub use executor::{panic_message, ManualExecutor, ThreadExecutor, UiExecutor, UiTask};
pub use render::{DisposeCallback, RecordingTarget, RenderTarget, TargetEvent};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{PlatformError, Result};
    pub use crate::executor::{ManualExecutor, ThreadExecutor, UiExecutor, UiTask};
    pub use crate::render::{RecordingTarget, RenderTarget, TargetEvent};
}
