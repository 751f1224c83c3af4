//! Timed replay of a recorded sequence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument};

use crate::events::{denormalize_coord, InputEvent};
use crate::platform::{InputSink, ScreenMetrics, Sleeper};

/// Shared flag used to stop a playback in progress
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Summary of one playback run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    /// Non-delay entries handed to the sink
    pub injected: usize,
    /// Delay entries waited on
    pub delays: usize,
    pub slept_ms: u64,
    pub cancelled: bool,
}

/// Drives an [`InputSink`] from a recorded sequence at the recorded cadence.
///
/// Runs on the caller's thread. Delays block that thread, and cancellation
/// is checked before every entry and again after every sleep.
pub struct Playback<'a> {
    sink: &'a dyn InputSink,
    metrics: &'a dyn ScreenMetrics,
    sleeper: &'a dyn Sleeper,
    cancel: CancelToken,
}

impl<'a> Playback<'a> {
    pub fn new(
        sink: &'a dyn InputSink,
        metrics: &'a dyn ScreenMetrics,
        sleeper: &'a dyn Sleeper,
        cancel: CancelToken,
    ) -> Self {
        Self {
            sink,
            metrics,
            sleeper,
            cancel,
        }
    }

    /// Replay `events` in order. Never mutates the sequence.
    #[instrument(skip(self, events), fields(len = events.len()))]
    pub fn play(&self, events: &[InputEvent]) -> PlaybackReport {
        let start = Instant::now();
        let mut report = PlaybackReport::default();
        self.cancel.reset();

        for event in events {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match *event {
                InputEvent::Delay(delay) => {
                    if delay.milliseconds == 0 {
                        continue;
                    }
                    self.sleeper
                        .sleep(Duration::from_millis(u64::from(delay.milliseconds)));
                    report.delays += 1;
                    report.slept_ms += u64::from(delay.milliseconds);

                    if self.cancel.is_cancelled() {
                        report.cancelled = true;
                        break;
                    }
                }
                other => {
                    self.inject(&other);
                    report.injected += 1;
                }
            }
        }

        info!(
            duration_ms = start.elapsed().as_millis(),
            injected = report.injected,
            delays = report.delays,
            cancelled = report.cancelled,
            "Playback finished"
        );
        report
    }

    fn inject(&self, event: &InputEvent) {
        debug!(?event, "Injecting");
        match *event {
            InputEvent::Key(key) => self.sink.inject_key(key.scan_code, key.pressed, key.extended),
            InputEvent::MouseMove(mv) if mv.absolute => {
                // Scale against the display as it is now, not as it was when recorded
                let (width, height) = self.metrics.screen_size();
                self.sink.inject_mouse_move(
                    denormalize_coord(mv.x, width),
                    denormalize_coord(mv.y, height),
                    true,
                );
            }
            InputEvent::MouseMove(mv) => self.sink.inject_mouse_move(mv.x, mv.y, false),
            InputEvent::MouseClick(click) => {
                self.sink.inject_mouse_button(click.button.into(), click.pressed)
            }
            InputEvent::MouseXClick(click) => {
                self.sink.inject_mouse_button(click.button.into(), click.pressed)
            }
            InputEvent::MouseScroll(scroll) => self.sink.inject_mouse_scroll(scroll.ticks),
            InputEvent::Delay(_) => {}
        }
    }
}
