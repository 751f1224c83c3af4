//! Keyboard and mouse macro recorder
//!
//! Captures raw input into timed sequences, binds each sequence to a key
//! combination, persists the sequences as JSON files and replays them through
//! an injection backend supplied by the host.

pub mod combo;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod hotkey;
pub mod ignore;
pub mod keys;
pub mod platform;
pub mod playback;
pub mod raw;
pub mod recorder;
pub mod status;
pub mod storage;

pub use combo::{ComboInput, ComboState, KeyComboRecorder};
pub use config::{HotkeyConfig, Hotkeys, MacroConfig};
pub use controller::{ControlSignal, MacroController};
pub use error::*;
pub use events::*;
pub use hotkey::{Chord, KeyboardState};
pub use ignore::{IgnoreKeys, IgnoreRule, KeyTransition};
pub use platform::{InputSink, ScreenMetrics, Sleeper, ThreadSleeper};
pub use playback::{CancelToken, Playback, PlaybackReport};
pub use raw::{RawKeyboard, RawMouse};
pub use recorder::*;
pub use status::StatusBoard;
pub use storage::{FileRecordStorage, LoadReport, MemoryRecordStorage, RecordStorage};
