//! Marquee Demo
//!
//! Three animations share one UI thread:
//! - a frame-counted progress bar
//! - a blinking cursor cycling through values, configured from TOML
//! - a spinner limited by wall-clock time
//!
//! Each "widget" prints its content to stdout whenever it is redrawn.
//!
//! Run with: RUST_LOG=strobe_animation=debug cargo run -p strobe_animation --example marquee

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strobe_animation::{
    set_global_scheduler, try_get_scheduler, Animation, AnimationConfig, AnimationScheduler,
    PlaybackState,
};
use strobe_platform::{DisposeCallback, RenderTarget, ThreadExecutor, UiExecutor};
use tracing_subscriber::EnvFilter;

const CURSOR_CONFIG: &str = r#"
label = "cursor"
cycle = ["_", " "]
cycle_count = 4
every = 0.15
"#;

/// A single terminal line
struct LineWidget {
    name: &'static str,
    line: Mutex<String>,
    dispose_callbacks: Mutex<Vec<DisposeCallback>>,
}

impl LineWidget {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            line: Mutex::new(String::new()),
            dispose_callbacks: Mutex::new(Vec::new()),
        })
    }

    fn write(&self, text: &str) {
        self.line.lock().push_str(text);
    }

    fn dispose(&self) {
        for callback in self.dispose_callbacks.lock().drain(..) {
            callback();
        }
    }
}

impl RenderTarget for LineWidget {
    fn clear_content(&self) {
        self.line.lock().clear();
    }

    fn with_content(&self, declare: &mut dyn FnMut()) {
        declare();
    }

    fn redraw(&self) {
        println!("{:>8} | {}", self.name, self.line.lock());
    }

    fn on_disposed(&self, callback: DisposeCallback) {
        self.dispose_callbacks.lock().push(callback);
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let executor = Arc::new(ThreadExecutor::spawn("strobe-ui")?);
    let ui: Arc<dyn UiExecutor> = executor.clone();
    let scheduler = AnimationScheduler::new(ui);
    set_global_scheduler(scheduler.handle())?;
    let handle = try_get_scheduler().ok_or_else(|| anyhow::anyhow!("no scheduler installed"))?;

    let progress = LineWidget::new("progress");
    let widget = Arc::clone(&progress);
    let bar = Animation::builder(&handle, progress.clone())
        .label("progress")
        .frame_count(11)
        .frame_delay(Duration::from_millis(100))
        .on_frame(move |frame| {
            let filled = frame.index as usize;
            widget.write(&format!(
                "[{}{}] {:>3}%",
                "#".repeat(filled),
                ".".repeat(10 - filled),
                filled * 10
            ));
            Ok(())
        })
        .build()?;

    let cursor = LineWidget::new("cursor");
    let widget = Arc::clone(&cursor);
    let blink = Animation::builder(&handle, cursor.clone())
        .config(AnimationConfig::from_toml_str(CURSOR_CONFIG)?)
        .on_frame(move |frame| {
            let value = frame.cycle_value.as_ref().and_then(|v| v.as_str()).unwrap_or("?");
            widget.write(&format!("ready{} (cycle {})", value, frame.cycle_index));
            Ok(())
        })
        .build()?;

    let spinner = LineWidget::new("spinner");
    let widget = Arc::clone(&spinner);
    let spin = Animation::builder(&handle, spinner.clone())
        .label("spinner")
        .cycle(vec!["|", "/", "-", "\\"])
        .duration_limit(Duration::from_secs(2))
        .frame_delay(Duration::from_millis(80))
        .on_frame(move |frame| {
            let value = frame.cycle_value.as_ref().and_then(|v| v.as_str()).unwrap_or("?");
            widget.write(&format!("working {}", value));
            Ok(())
        })
        .build()?;

    for animation in [&bar, &blink, &spin] {
        animation.post_add_content()?;
    }

    // Pause and resume the spinner; its duration limit keeps counting only while running
    thread::sleep(Duration::from_millis(500));
    spin.stop();
    tracing::info!("spinner paused at frame {}", spin.frame_index());
    thread::sleep(Duration::from_millis(300));
    spin.start()?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while [&bar, &blink, &spin]
        .iter()
        .any(|a| a.state() == PlaybackState::Running)
        && Instant::now() < deadline
    {
        thread::sleep(Duration::from_millis(20));
    }
    executor.flush()?;

    // Tearing a widget down stops whatever is still animating it
    progress.dispose();
    cursor.dispose();
    spinner.dispose();

    for animation in [&bar, &blink, &spin] {
        tracing::info!(
            "{}: {:?} after {} frames ({:?} counted)",
            animation.label(),
            animation.state(),
            animation.frame_index(),
            animation.elapsed()
        );
    }
    tracing::info!("scheduler: {:?}", scheduler.stats());

    executor.shutdown();
    Ok(())
}
