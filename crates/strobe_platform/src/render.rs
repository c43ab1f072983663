//! Render target contract
//!
//! A render target is the entity whose visual content an animation frame
//! replaces. Its content may only be touched from the UI thread; the
//! scheduler guarantees that by calling these methods exclusively inside
//! UI executor tasks.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Callback fired once when a render target is destroyed
pub type DisposeCallback = Box<dyn FnOnce() + Send + 'static>;

/// Content surface driven by frame animations
pub trait RenderTarget: Send + Sync {
    /// Remove all previously declared content
    fn clear_content(&self);

    /// Run `declare` while the target is accepting new content
    fn with_content(&self, declare: &mut dyn FnMut());

    /// Schedule a repaint of the target
    fn redraw(&self);

    /// Register a callback for when the target is destroyed
    ///
    /// Targets that are already disposed should invoke the callback
    /// immediately.
    fn on_disposed(&self, callback: DisposeCallback);
}

/// Observable operation performed on a [`RecordingTarget`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TargetEvent {
    Cleared,
    Content(String),
    Redrawn,
}

#[derive(Default)]
struct RecordingState {
    events: Vec<TargetEvent>,
    content: Vec<String>,
    declaring: bool,
}

/// In-memory render target that records every operation
///
/// Content is declared as strings through [`RecordingTarget::append`], which
/// is only legal inside [`RenderTarget::with_content`].
#[derive(Default)]
pub struct RecordingTarget {
    state: Mutex<RecordingState>,
    dispose_callbacks: Mutex<Vec<DisposeCallback>>,
    disposed: AtomicBool,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare one piece of content
    ///
    /// Appends outside of `with_content` are ignored and logged.
    pub fn append(&self, item: impl Into<String>) {
        let item = item.into();
        let mut state = self.state.lock();
        if !state.declaring {
            tracing::warn!("RecordingTarget: append({:?}) outside with_content", item);
            return;
        }
        state.events.push(TargetEvent::Content(item.clone()));
        state.content.push(item);
    }

    /// Content declared since the last clear
    pub fn content(&self) -> Vec<String> {
        self.state.lock().content.clone()
    }

    /// Every operation performed so far, in order
    pub fn events(&self) -> Vec<TargetEvent> {
        self.state.lock().events.clone()
    }

    /// Every piece of content ever declared, in order
    pub fn history(&self) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|event| match event {
                TargetEvent::Content(item) => Some(item.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn redraw_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| **event == TargetEvent::Redrawn)
            .count()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Destroy the target, firing disposal callbacks once
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let callbacks = std::mem::take(&mut *self.dispose_callbacks.lock());
        tracing::debug!("RecordingTarget disposed ({} callbacks)", callbacks.len());
        for callback in callbacks {
            callback();
        }
    }
}

impl RenderTarget for RecordingTarget {
    fn clear_content(&self) {
        let mut state = self.state.lock();
        state.content.clear();
        state.events.push(TargetEvent::Cleared);
    }

    fn with_content(&self, declare: &mut dyn FnMut()) {
        // The lock is not held while declaring so `append` can take it
        self.state.lock().declaring = true;
        declare();
        self.state.lock().declaring = false;
    }

    fn redraw(&self) {
        self.state.lock().events.push(TargetEvent::Redrawn);
    }

    fn on_disposed(&self, callback: DisposeCallback) {
        if self.is_disposed() {
            callback();
            return;
        }
        self.dispose_callbacks.lock().push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_recording_target_events() {
        let target = RecordingTarget::new();

        target.clear_content();
        target.with_content(&mut || {
            target.append("a");
            target.append("b");
        });
        target.redraw();

        assert_eq!(target.content(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(
            target.events(),
            vec![
                TargetEvent::Cleared,
                TargetEvent::Content("a".into()),
                TargetEvent::Content("b".into()),
                TargetEvent::Redrawn,
            ]
        );

        target.clear_content();
        assert!(target.content().is_empty());
        assert_eq!(target.history().len(), 2);
        assert_eq!(target.redraw_count(), 1);
    }

    #[test]
    fn test_append_outside_declaration_ignored() {
        let target = RecordingTarget::new();
        target.append("stray");
        assert!(target.content().is_empty());
        assert!(target.events().is_empty());
    }

    #[test]
    fn test_dispose_fires_callbacks_once() {
        let target = RecordingTarget::new();
        let fired = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&fired);
        target.on_disposed(Box::new(move || *counter.lock() += 1));

        target.dispose();
        target.dispose();
        assert_eq!(*fired.lock(), 1);

        // Late registrations fire immediately
        let counter = Arc::clone(&fired);
        target.on_disposed(Box::new(move || *counter.lock() += 1));
        assert_eq!(*fired.lock(), 2);
    }
}
