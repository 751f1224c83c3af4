use std::time::Duration;

use crate::events::MouseButton;

/// Synthesizes input on the host. Coordinates for absolute moves are display pixels.
pub trait InputSink {
    fn inject_key(&self, scan_code: u16, pressed: bool, extended: bool);

    fn inject_mouse_move(&self, x: i32, y: i32, absolute: bool);

    fn inject_mouse_button(&self, button: MouseButton, pressed: bool);

    fn inject_mouse_scroll(&self, ticks: i16);
}

/// Reports the current display geometry
pub trait ScreenMetrics {
    /// Width and height of the capture surface in pixels
    fn screen_size(&self) -> (i32, i32);

    /// Current cursor position in pixels
    fn cursor_position(&self) -> (i32, i32);
}

/// Suspends the thread of control during playback
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// Blocking sleep on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
