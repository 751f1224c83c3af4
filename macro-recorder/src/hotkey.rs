use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::keys::{key_name, virtual_key_from_name};
use crate::{MacroRecorderError, Result};

/// A set of virtual keys held together
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chord {
    keys: BTreeSet<u16>,
}

impl Chord {
    pub fn new(keys: impl IntoIterator<Item = u16>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn keys(&self) -> &BTreeSet<u16> {
        &self.keys
    }

    pub fn contains(&self, vk: u16) -> bool {
        self.keys.contains(&vk)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert a key, returning false if it was already part of the chord.
    pub fn insert(&mut self, vk: u16) -> bool {
        self.keys.insert(vk)
    }

    /// True when `vk` going down completes the chord, i.e. it is a member and
    /// every other member is already held.
    pub fn triggered_by(&self, vk: u16, pressed: bool, state: &KeyboardState) -> bool {
        pressed && self.contains(vk) && self.keys.iter().all(|&k| k == vk || state.is_down(k))
    }
}

impl FromIterator<u16> for Chord {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl FromStr for Chord {
    type Err = MacroRecorderError;

    /// Parse `"Ctrl+Alt+A"` style chords.
    fn from_str(s: &str) -> Result<Self> {
        let mut chord = Chord::default();
        for part in s.split('+') {
            let vk = virtual_key_from_name(part).ok_or_else(|| {
                MacroRecorderError::Config(format!("unknown key `{}` in chord `{}`", part.trim(), s))
            })?;
            chord.insert(vk);
        }
        if chord.is_empty() {
            return Err(MacroRecorderError::Config("empty chord".to_string()));
        }
        Ok(chord)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Modifiers first so chords read the way they are typed
        let mut keys: Vec<u16> = self.keys.iter().copied().collect();
        keys.sort_by_key(|&vk| (!is_modifier(vk), vk));
        let names: Vec<String> = keys.into_iter().map(key_name).collect();
        write!(f, "{}", names.join(" + "))
    }
}

fn is_modifier(vk: u16) -> bool {
    matches!(
        vk,
        crate::keys::VK_CONTROL | crate::keys::VK_MENU | crate::keys::VK_SHIFT | crate::keys::VK_LWIN
    )
}

/// Tracks which virtual keys are currently held down
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    down: BTreeSet<u16>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, vk: u16, pressed: bool) {
        if pressed {
            self.down.insert(vk);
        } else {
            self.down.remove(&vk);
        }
    }

    pub fn is_down(&self, vk: u16) -> bool {
        self.down.contains(&vk)
    }

    /// Snapshot of the held keys as a chord
    pub fn held(&self) -> Chord {
        Chord::new(self.down.iter().copied())
    }
}
