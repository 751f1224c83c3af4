use std::collections::BTreeSet;

use tracing::debug;

use crate::hotkey::Chord;

/// What the combo recorder is currently collecting a chord for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboState {
    Idle,
    RecordingBinding,
    DeletingBinding,
}

/// Outcome of feeding a key transition to the combo recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboInput {
    /// The recorder is idle; the caller handles the key
    Ignored,
    /// The key belongs to the gesture and must not be treated as macro content
    Consumed,
    /// Every pressed key has been released; call [`KeyComboRecorder::stop`]
    Completed,
}

/// Captures the chord used to add or delete a binding.
///
/// The chord is the set of every key pressed during the gesture, and the
/// gesture completes only once all of them are released again.
#[derive(Debug)]
pub struct KeyComboRecorder {
    state: ComboState,
    pressed_keys: Chord,
    held: BTreeSet<u16>,
    has_completed: bool,
}

impl Default for KeyComboRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyComboRecorder {
    pub fn new() -> Self {
        Self {
            state: ComboState::Idle,
            pressed_keys: Chord::default(),
            held: BTreeSet::new(),
            has_completed: false,
        }
    }

    pub fn state(&self) -> ComboState {
        self.state
    }

    pub fn has_completed(&self) -> bool {
        self.has_completed
    }

    pub fn pressed_keys(&self) -> &Chord {
        &self.pressed_keys
    }

    /// Begin collecting a chord to bind. Only valid while idle.
    pub fn start_recording(&mut self) -> bool {
        self.start(ComboState::RecordingBinding)
    }

    /// Begin collecting a chord to unbind. Only valid while idle.
    pub fn start_deleting(&mut self) -> bool {
        self.start(ComboState::DeletingBinding)
    }

    fn start(&mut self, state: ComboState) -> bool {
        if self.state != ComboState::Idle {
            debug!(current = ?self.state, requested = ?state, "Combo recorder already active");
            return false;
        }
        self.state = state;
        self.pressed_keys = Chord::default();
        self.held.clear();
        self.has_completed = false;
        debug!(?state, "Combo recorder started");
        true
    }

    /// Feed a virtual-key transition.
    pub fn on_key(&mut self, vk: u16, pressed: bool) -> ComboInput {
        if self.state == ComboState::Idle {
            return ComboInput::Ignored;
        }
        if self.has_completed {
            return ComboInput::Completed;
        }

        if pressed {
            self.pressed_keys.insert(vk);
            self.held.insert(vk);
            return ComboInput::Consumed;
        }

        // Releases of keys that went down before the gesture started (the
        // trigger hot key) are swallowed without counting.
        self.held.remove(&vk);
        if !self.pressed_keys.is_empty() && self.held.is_empty() {
            self.has_completed = true;
            debug!(keys = %self.pressed_keys, "Combo chord completed");
            return ComboInput::Completed;
        }
        ComboInput::Consumed
    }

    /// Finish a completed gesture, returning its mode and chord and going back to idle.
    pub fn stop(&mut self) -> Option<(ComboState, Chord)> {
        if self.state == ComboState::Idle || !self.has_completed {
            return None;
        }
        let state = self.state;
        self.state = ComboState::Idle;
        self.has_completed = false;
        self.held.clear();
        Some((state, std::mem::take(&mut self.pressed_keys)))
    }

    /// Abandon any gesture in progress.
    pub fn reset(&mut self) {
        self.state = ComboState::Idle;
        self.pressed_keys = Chord::default();
        self.held.clear();
        self.has_completed = false;
    }
}
