//! Replays a stored record through a sink that only logs what it would inject.
//!
//! Usage: `cargo run --example replay_slot -- [records_dir] [slot]`

use anyhow::{anyhow, Context};
use macro_recorder::{
    CancelToken, FileRecordStorage, MouseButton, Playback, RecordStorage, ScreenMetrics,
    InputSink, ThreadSleeper,
};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

struct LoggingSink;

impl InputSink for LoggingSink {
    fn inject_key(&self, scan_code: u16, pressed: bool, extended: bool) {
        info!(scan_code, pressed, extended, "key");
    }

    fn inject_mouse_move(&self, x: i32, y: i32, absolute: bool) {
        info!(x, y, absolute, "mouse move");
    }

    fn inject_mouse_button(&self, button: MouseButton, pressed: bool) {
        info!(?button, pressed, "mouse button");
    }

    fn inject_mouse_scroll(&self, ticks: i16) {
        info!(ticks, "mouse scroll");
    }
}

struct FixedScreen;

impl ScreenMetrics for FixedScreen {
    fn screen_size(&self) -> (i32, i32) {
        (1920, 1080)
    }

    fn cursor_position(&self) -> (i32, i32) {
        (960, 540)
    }
}

fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut args = std::env::args().skip(1);
    let dir = args.next().unwrap_or_else(|| "Records".to_string());
    let slot: u32 = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("invalid slot `{}`", arg))?,
        None => 0,
    };

    let storage = FileRecordStorage::new(&dir)?;
    let report = storage.load_all_sequences()?;
    for err in &report.skipped {
        warn!(error = %err, "Skipped record");
    }
    let record = report
        .records
        .get(&slot)
        .ok_or_else(|| anyhow!("no record in slot {} under {}", slot, dir))?;
    info!(slot, binding = %record.binding, events = record.events.len(), "Replaying");

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel())?;

    let sink = LoggingSink;
    let screen = FixedScreen;
    let sleeper = ThreadSleeper;
    let outcome = Playback::new(&sink, &screen, &sleeper, cancel).play(&record.events);

    info!(
        injected = outcome.injected,
        slept_ms = outcome.slept_ms,
        cancelled = outcome.cancelled,
        "Done"
    );
    Ok(())
}
