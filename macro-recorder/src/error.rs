use std::path::PathBuf;
use thiserror::Error;

use crate::recorder::Mode;

/// Error types for macro recording and playback
#[derive(Debug, Error)]
pub enum MacroRecorderError {
    /// The requested operation is not valid in the current mode
    #[error("Cannot {operation} while {mode}")]
    InvalidStateTransition {
        operation: &'static str,
        mode: Mode,
    },

    /// No stored binding matches the given key combination
    #[error("No record is bound to the given key combination")]
    NoMatchingBinding,

    /// A binding needs at least one key
    #[error("Key combination is empty")]
    EmptyChord,

    /// Capture was requested before any record slot was selected
    #[error("No record slot is selected")]
    NoCurrentSlot,

    /// Error when saving, loading or deleting a record
    #[error("Failed to persist record: {0}")]
    Persistence(String),

    /// A stored record could not be decoded or failed validation
    #[error("Malformed record {}: {reason}", path.display())]
    MalformedRecord { path: PathBuf, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Error when serializing or deserializing JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MacroRecorderError {
    /// Whether the failure came from storage rather than from the in-memory state machine.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Persistence(_) | Self::Io(_) | Self::Json(_) | Self::MalformedRecord { .. }
        )
    }
}

/// Result type for macro recorder operations
pub type Result<T> = std::result::Result<T, MacroRecorderError>;
