use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::hotkey::Chord;
use crate::{MacroRecorderError, Result};

/// Configuration for the macro recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// Directory holding one file per record slot
    pub records_dir: PathBuf,

    /// Hot key chords
    pub hotkeys: HotkeyConfig,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            records_dir: PathBuf::from("Records"),
            hotkeys: HotkeyConfig::default(),
        }
    }
}

impl MacroConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MacroRecorderError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            MacroRecorderError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Hot key chords as written in the config file, e.g. `"Ctrl+Alt+A"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Start or stop capturing into the selected slot
    pub select_or_toggle_record: String,

    /// Replay the selected slot
    pub simulate: String,

    /// Bind the next chord to a slot
    pub add_binding: String,

    /// Delete the slot bound to the next chord
    pub delete_binding: String,

    /// Ask the host to exit
    pub exit: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            select_or_toggle_record: "Ctrl+F1".to_string(),
            simulate: "Ctrl+F2".to_string(),
            add_binding: "Ctrl+Alt+A".to_string(),
            delete_binding: "Ctrl+Alt+D".to_string(),
            exit: "Ctrl+Escape".to_string(),
        }
    }
}

impl HotkeyConfig {
    /// Parse every chord string.
    pub fn resolve(&self) -> Result<Hotkeys> {
        Ok(Hotkeys {
            select_or_toggle_record: self.select_or_toggle_record.parse()?,
            simulate: self.simulate.parse()?,
            add_binding: self.add_binding.parse()?,
            delete_binding: self.delete_binding.parse()?,
            exit: self.exit.parse()?,
        })
    }
}

/// Parsed hot key chords
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkeys {
    pub select_or_toggle_record: Chord,
    pub simulate: Chord,
    pub add_binding: Chord,
    pub delete_binding: Chord,
    pub exit: Chord,
}

impl Hotkeys {
    /// The help line shown while the recorder runs
    pub fn instructions(&self) -> String {
        format!(
            "| SELECT / TOGGLE_REC - {} | SIM - {} | ADD - {} | DEL - {} | EXIT - {} |",
            self.select_or_toggle_record, self.simulate, self.add_binding, self.delete_binding, self.exit
        )
    }
}
