use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use crate::events::InputEvent;
use crate::hotkey::Chord;
use crate::playback::{Playback, PlaybackReport};
use crate::storage::RecordStorage;
use crate::{MacroRecorderError, Result};

/// Identifier of a record slot
pub type SlotId = u32;

/// What the store is doing. Capturing and simulating exclude each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Capturing,
    Simulating,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Idle => "idle",
            Mode::Capturing => "capturing",
            Mode::Simulating => "simulating",
        };
        f.write_str(name)
    }
}

/// A bound slot: the chord that selects it and its recorded sequence
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub binding: Chord,
    pub events: Vec<InputEvent>,
}

/// Owns every recorded sequence and binding, the current selection and the
/// capture/playback mode.
pub struct RecordStore {
    records: BTreeMap<SlotId, Record>,
    current_slot: Option<SlotId>,
    capture_slot: Option<SlotId>,
    mode: Mode,
    storage: Box<dyn RecordStorage>,
}

impl RecordStore {
    /// Create an empty store backed by `storage`. Call [`RecordStore::load_all`] to read existing records.
    pub fn new(storage: Box<dyn RecordStorage>) -> Self {
        Self {
            records: BTreeMap::new(),
            current_slot: None,
            capture_slot: None,
            mode: Mode::Idle,
            storage,
        }
    }

    /// Replace the in-memory records with everything in storage.
    ///
    /// Returns the records that were skipped because they could not be read.
    #[instrument(skip(self))]
    pub fn load_all(&mut self) -> Result<Vec<MacroRecorderError>> {
        self.require_mode(Mode::Idle, "load records")?;
        let start = Instant::now();

        let report = self.storage.load_all_sequences()?;
        self.records = report.records;
        if self
            .current_slot
            .is_some_and(|slot| !self.records.contains_key(&slot))
        {
            self.current_slot = None;
        }

        info!(
            duration_ms = start.elapsed().as_millis(),
            slots = self.records.len(),
            skipped = report.skipped.len(),
            "Records loaded"
        );
        Ok(report.skipped)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_capturing(&self) -> bool {
        self.mode == Mode::Capturing
    }

    pub fn is_simulating(&self) -> bool {
        self.mode == Mode::Simulating
    }

    pub fn current_slot(&self) -> Option<SlotId> {
        self.current_slot
    }

    /// Slot receiving events while capturing
    pub fn capture_slot(&self) -> Option<SlotId> {
        self.capture_slot
    }

    pub fn slots(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.records.keys().copied()
    }

    pub fn record(&self, slot: SlotId) -> Option<&Record> {
        self.records.get(&slot)
    }

    /// Whether the current slot holds a playable sequence
    pub fn has_recorded(&self) -> bool {
        self.current_slot
            .and_then(|slot| self.records.get(&slot))
            .is_some_and(|record| !record.events.is_empty())
    }

    /// Slot bound to exactly `chord`
    pub fn slot_for(&self, chord: &Chord) -> Option<SlotId> {
        self.records
            .iter()
            .find(|(_, record)| record.binding == *chord)
            .map(|(&slot, _)| slot)
    }

    fn require_mode(&self, mode: Mode, operation: &'static str) -> Result<()> {
        if self.mode != mode {
            warn!(operation, mode = %self.mode, "Rejected state transition");
            return Err(MacroRecorderError::InvalidStateTransition {
                operation,
                mode: self.mode,
            });
        }
        Ok(())
    }

    fn capture_events_mut(&mut self, operation: &'static str) -> Result<&mut Vec<InputEvent>> {
        self.require_mode(Mode::Capturing, operation)?;
        let slot = self.capture_slot.ok_or(MacroRecorderError::NoCurrentSlot)?;
        self.records
            .get_mut(&slot)
            .map(|record| &mut record.events)
            .ok_or(MacroRecorderError::NoCurrentSlot)
    }

    /// Start capturing into the current slot, discarding what it held before.
    #[instrument(skip(self))]
    pub fn start_capture(&mut self) -> Result<SlotId> {
        self.require_mode(Mode::Idle, "start capture")?;
        let slot = self.current_slot.ok_or(MacroRecorderError::NoCurrentSlot)?;
        let record = self
            .records
            .get_mut(&slot)
            .ok_or(MacroRecorderError::NoCurrentSlot)?;

        record.events.clear();
        self.capture_slot = Some(slot);
        self.mode = Mode::Capturing;
        info!(slot, "Capture started");
        Ok(slot)
    }

    /// Append `event`, preceded by `elapsed_ms` of idle time.
    ///
    /// Idle time merges into a trailing delay entry if there is one, so two
    /// substantive events are separated by at most one delay. Relative moves
    /// that go nowhere only contribute their idle time.
    pub fn record_event(&mut self, event: InputEvent, elapsed_ms: u32) -> Result<()> {
        let events = self.capture_events_mut("record an event")?;
        coalesce_delay(events, elapsed_ms);

        match event {
            InputEvent::Delay(delay) => coalesce_delay(events, delay.milliseconds),
            InputEvent::MouseMove(mv) if mv.is_null_relative() => {
                debug!("Dropping zero relative mouse move");
            }
            event => events.push(event),
        }
        Ok(())
    }

    /// Account for idle time from input that produced nothing to record.
    pub fn record_idle(&mut self, elapsed_ms: u32) -> Result<()> {
        let events = self.capture_events_mut("record idle time")?;
        coalesce_delay(events, elapsed_ms);
        Ok(())
    }

    /// Drop every key-down of `scan_codes` that has no release after it,
    /// merging the delays around each dropped entry. Used to remove the hot
    /// key that ends or interrupts a capture, whose releases are never recorded.
    pub fn discard_unreleased_keys(&mut self, scan_codes: &[u16]) -> Result<usize> {
        let events = self.capture_events_mut("discard unreleased keys")?;

        let mut released = BTreeSet::new();
        let mut keep = vec![true; events.len()];
        for (i, event) in events.iter().enumerate().rev() {
            if let InputEvent::Key(key) = event {
                if !scan_codes.contains(&key.scan_code) {
                    continue;
                }
                if !key.pressed {
                    released.insert(key.scan_code);
                } else if !released.contains(&key.scan_code) {
                    keep[i] = false;
                }
            }
        }

        let removed = keep.iter().filter(|&&k| !k).count();
        if removed == 0 {
            return Ok(0);
        }
        let mut kept = Vec::with_capacity(events.len() - removed);
        for (event, keep) in events.drain(..).zip(keep) {
            match event {
                _ if !keep => {}
                InputEvent::Delay(delay) => coalesce_delay(&mut kept, delay.milliseconds),
                event => kept.push(event),
            }
        }
        *events = kept;

        debug!(removed, "Discarded unreleased hot key presses");
        Ok(removed)
    }

    /// Finish capturing, trim trailing idle time and persist the slot.
    ///
    /// The store is back to idle even when saving fails; the in-memory sequence
    /// stays intact and [`RecordStore::save_slot`] can retry.
    #[instrument(skip(self))]
    pub fn stop_capture(&mut self) -> Result<SlotId> {
        self.require_mode(Mode::Capturing, "stop capture")?;
        let slot = self
            .capture_slot
            .take()
            .ok_or(MacroRecorderError::NoCurrentSlot)?;
        self.mode = Mode::Idle;

        let record = self
            .records
            .get_mut(&slot)
            .ok_or(MacroRecorderError::NoCurrentSlot)?;
        while record.events.last().is_some_and(InputEvent::is_delay) {
            record.events.pop();
        }
        info!(slot, events = record.events.len(), "Capture stopped");

        self.storage
            .save_sequence(slot, &record.events, &record.binding)?;
        Ok(slot)
    }

    /// Write a slot to storage.
    pub fn save_slot(&self, slot: SlotId) -> Result<()> {
        let record = self
            .records
            .get(&slot)
            .ok_or(MacroRecorderError::NoCurrentSlot)?;
        self.storage
            .save_sequence(slot, &record.events, &record.binding)
    }

    /// Bind `chord` to a slot and select it.
    ///
    /// A chord that is already bound reselects its slot; a new chord gets the
    /// lowest unused slot id. Rejected while capturing another slot or playing.
    #[instrument(skip(self, chord), fields(chord = %chord))]
    pub fn bind_slot(&mut self, chord: &Chord) -> Result<SlotId> {
        if chord.is_empty() {
            return Err(MacroRecorderError::EmptyChord);
        }
        let existing = self.slot_for(chord);

        let allowed = match self.mode {
            Mode::Idle => true,
            Mode::Capturing => existing.is_some() && existing == self.capture_slot,
            Mode::Simulating => false,
        };
        if !allowed {
            warn!(mode = %self.mode, "Cannot bind a slot now");
            return Err(MacroRecorderError::InvalidStateTransition {
                operation: "bind a slot",
                mode: self.mode,
            });
        }

        let slot = match existing {
            Some(slot) => {
                info!(slot, "Chord already bound, reselecting");
                slot
            }
            None => {
                let slot = self.next_free_slot();
                self.records.insert(
                    slot,
                    Record {
                        binding: chord.clone(),
                        events: Vec::new(),
                    },
                );
                info!(slot, "Bound new slot");
                slot
            }
        };
        self.current_slot = Some(slot);
        Ok(slot)
    }

    fn next_free_slot(&self) -> SlotId {
        let mut slot = 0;
        while self.records.contains_key(&slot) {
            slot += 1;
        }
        slot
    }

    /// Remove the slot bound to exactly `chord`, in memory and in storage.
    #[instrument(skip(self, chord), fields(chord = %chord))]
    pub fn unbind_slot(&mut self, chord: &Chord) -> Result<SlotId> {
        let slot = self
            .slot_for(chord)
            .ok_or(MacroRecorderError::NoMatchingBinding)?;

        if self.mode == Mode::Simulating || self.capture_slot == Some(slot) {
            warn!(slot, mode = %self.mode, "Cannot delete a slot in use");
            return Err(MacroRecorderError::InvalidStateTransition {
                operation: "delete a slot",
                mode: self.mode,
            });
        }

        // A failed delete leaves the slot bound in memory and on disk
        self.storage.delete_sequence(slot)?;

        self.records.remove(&slot);
        if self.current_slot == Some(slot) {
            self.current_slot = None;
        }
        info!(slot, "Unbound slot");
        Ok(slot)
    }

    /// Select the slot bound to exactly `chord`. Leaves the selection alone on a miss.
    ///
    /// Selection only changes while idle so a capture keeps its target.
    pub fn select_slot(&mut self, chord: &Chord) -> Option<SlotId> {
        if self.mode != Mode::Idle {
            return None;
        }
        let slot = self.slot_for(chord)?;
        if self.current_slot != Some(slot) {
            info!(slot, "Selected slot");
        }
        self.current_slot = Some(slot);
        Some(slot)
    }

    /// Replay the current slot. An empty or missing sequence is a no-op.
    #[instrument(skip(self, playback))]
    pub fn simulate(&mut self, playback: &Playback<'_>) -> Result<PlaybackReport> {
        self.require_mode(Mode::Idle, "play")?;
        let Some(record) = self.current_slot.and_then(|slot| self.records.get(&slot)) else {
            debug!("No current slot to play");
            return Ok(PlaybackReport::default());
        };
        if record.events.is_empty() {
            debug!("Current slot is empty");
            return Ok(PlaybackReport::default());
        }

        self.mode = Mode::Simulating;
        info!(slot = ?self.current_slot, events = record.events.len(), "Simulating record");
        let report = playback.play(&record.events);
        self.mode = Mode::Idle;

        Ok(report)
    }
}

/// Fold `ms` of idle time into the tail of `events`.
///
/// Idle time before the first entry is dropped; it precedes nothing.
fn coalesce_delay(events: &mut Vec<InputEvent>, ms: u32) {
    if ms == 0 {
        return;
    }
    match events.last_mut() {
        Some(InputEvent::Delay(delay)) => delay.add_delay(ms),
        Some(_) => events.push(InputEvent::delay(ms)),
        None => {}
    }
}
