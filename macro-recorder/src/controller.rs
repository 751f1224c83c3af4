use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, instrument, warn};

use crate::combo::{ComboInput, ComboState, KeyComboRecorder};
use crate::config::{Hotkeys, MacroConfig};
use crate::events::{normalize_coord, InputEvent};
use crate::hotkey::{Chord, KeyboardState};
use crate::ignore::{IgnoreKeys, IgnoreRule, KeyTransition};
use crate::keys::virtual_key_to_scan_code;
use crate::platform::{InputSink, ScreenMetrics, Sleeper, ThreadSleeper};
use crate::playback::{CancelToken, Playback, PlaybackReport};
use crate::raw::{RawKeyboard, RawMouse};
use crate::recorder::{RecordStore, SlotId};
use crate::status::{
    current_record_line, StatusBoard, ADDING_RECORD, DELETING_RECORD, RECORDING, SIMULATING_RECORD,
};
use crate::storage::RecordStorage;
use crate::{MacroRecorderError, Result};

/// What the host loop should do after an input was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Continue,
    Exit,
}

/// Top-level owner of the recorder state.
///
/// The host feeds every raw key and mouse report, in arrival order, to
/// [`MacroController::on_key_input`] and [`MacroController::on_mouse_input`]
/// together with the milliseconds elapsed since the previous report.
pub struct MacroController {
    store: RecordStore,
    combo: KeyComboRecorder,
    ignore: IgnoreKeys,
    keyboard: KeyboardState,
    hotkeys: Hotkeys,
    status: Arc<StatusBoard>,
    sink: Box<dyn InputSink>,
    metrics: Box<dyn ScreenMetrics>,
    sleeper: Box<dyn Sleeper>,
    cancel: CancelToken,
    skipped: Vec<MacroRecorderError>,
    last_playback: Option<PlaybackReport>,
}

impl MacroController {
    /// Resolve the hot keys, load every stored record and publish the instruction line.
    #[instrument(skip_all)]
    pub fn new(
        config: &MacroConfig,
        storage: Box<dyn RecordStorage>,
        sink: Box<dyn InputSink>,
        metrics: Box<dyn ScreenMetrics>,
    ) -> Result<Self> {
        let start = Instant::now();
        let hotkeys = config.hotkeys.resolve()?;

        let mut store = RecordStore::new(storage);
        let skipped = store.load_all()?;
        for err in &skipped {
            warn!(error = %err, "Skipped stored record");
        }

        let status = Arc::new(StatusBoard::new());
        status.add_line(hotkeys.instructions());

        info!(
            duration_ms = start.elapsed().as_millis(),
            slots = store.slots().count(),
            "Macro controller ready"
        );

        Ok(Self {
            store,
            combo: KeyComboRecorder::new(),
            ignore: IgnoreKeys::new(),
            keyboard: KeyboardState::new(),
            hotkeys,
            status,
            sink,
            metrics,
            sleeper: Box::new(ThreadSleeper),
            cancel: CancelToken::new(),
            skipped,
            last_playback: None,
        })
    }

    /// Replace the sleeper used between replayed events.
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn hotkeys(&self) -> &Hotkeys {
        &self.hotkeys
    }

    /// Status lines for a renderer
    pub fn status(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    /// Token that stops a playback in progress when tripped
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn combo_state(&self) -> ComboState {
        self.combo.state()
    }

    /// Records that could not be loaded at startup
    pub fn skipped_records(&self) -> &[MacroRecorderError] {
        &self.skipped
    }

    pub fn last_playback(&self) -> Option<&PlaybackReport> {
        self.last_playback.as_ref()
    }

    /// Retry persisting the current slot after a failed save.
    pub fn save_current(&self) -> Result<()> {
        let slot = self
            .store
            .current_slot()
            .ok_or(MacroRecorderError::NoCurrentSlot)?;
        self.store.save_slot(slot)
    }

    /// Handle one keyboard report.
    ///
    /// Storage failures are returned after the in-memory state has been
    /// updated; rejected transitions are logged and ignored.
    #[instrument(level = "debug", skip(self))]
    pub fn on_key_input(&mut self, raw: &RawKeyboard, elapsed_ms: u32) -> Result<ControlSignal> {
        let Some(vk) = raw.virtual_key() else {
            debug!("Key report without a virtual key");
            self.keep_idle(elapsed_ms)?;
            return Ok(ControlSignal::Continue);
        };
        let pressed = raw.is_pressed();
        let repeat = pressed && self.keyboard.is_down(vk);
        self.keyboard.update(vk, pressed);

        // Autorepeat of a held key never adds to a gesture's chord
        if repeat && self.combo.state() != ComboState::Idle {
            self.keep_idle(elapsed_ms)?;
            return Ok(ControlSignal::Continue);
        }

        match self.combo.on_key(vk, pressed) {
            ComboInput::Ignored => {}
            ComboInput::Consumed => {
                self.keep_idle(elapsed_ms)?;
                return Ok(ControlSignal::Continue);
            }
            ComboInput::Completed => {
                self.keep_idle(elapsed_ms)?;
                self.finish_combo()?;
                return Ok(ControlSignal::Continue);
            }
        }

        if !repeat {
            if self.fires(&self.hotkeys.select_or_toggle_record, vk, pressed) {
                self.toggle_capture()?;
                return Ok(ControlSignal::Continue);
            }

            if self.fires(&self.hotkeys.simulate, vk, pressed) {
                if !self.store.is_capturing() && self.store.has_recorded() {
                    self.simulate()?;
                }
                return Ok(ControlSignal::Continue);
            }

            if self.fires(&self.hotkeys.exit, vk, pressed) {
                if self.store.is_capturing() || self.store.is_simulating() {
                    debug!(mode = %self.store.mode(), "Exit ignored");
                    return Ok(ControlSignal::Continue);
                }
                info!("Exit requested");
                return Ok(ControlSignal::Exit);
            }

            if self.fires(&self.hotkeys.add_binding, vk, pressed) {
                let chord = self.hotkeys.add_binding.clone();
                self.start_combo(&chord, ComboState::RecordingBinding)?;
                return Ok(ControlSignal::Continue);
            }

            if self.fires(&self.hotkeys.delete_binding, vk, pressed) {
                let chord = self.hotkeys.delete_binding.clone();
                self.start_combo(&chord, ComboState::DeletingBinding)?;
                return Ok(ControlSignal::Continue);
            }
        }

        if pressed {
            let previous = self.store.current_slot();
            if self.store.select_slot(&self.keyboard.held()).is_some() {
                self.show_current_slot(previous);
            }
        }

        if self.store.is_capturing() {
            if self.ignore.should_ignore(vk, pressed) {
                self.store.record_idle(elapsed_ms)?;
            } else {
                match raw.to_event() {
                    Some(event) => self.store.record_event(event, elapsed_ms)?,
                    None => self.store.record_idle(elapsed_ms)?,
                }
            }
        }

        Ok(ControlSignal::Continue)
    }

    /// Handle one mouse report. Only the first event it yields carries `elapsed_ms`.
    pub fn on_mouse_input(&mut self, raw: &RawMouse, elapsed_ms: u32) -> Result<()> {
        if !self.store.is_capturing() {
            return Ok(());
        }

        let events = raw.to_events();
        if events.is_empty() {
            return self.store.record_idle(elapsed_ms);
        }
        let mut elapsed = elapsed_ms;
        for event in events {
            self.store.record_event(event, elapsed)?;
            elapsed = 0;
        }
        Ok(())
    }

    fn fires(&self, chord: &Chord, vk: u16, pressed: bool) -> bool {
        chord.triggered_by(vk, pressed, &self.keyboard)
    }

    /// Keep the idle time of a report that records nothing.
    fn keep_idle(&mut self, elapsed_ms: u32) -> Result<()> {
        if self.store.is_capturing() {
            self.store.record_idle(elapsed_ms)?;
        }
        Ok(())
    }

    /// Drop the already recorded key-downs of a hot key from the capture.
    fn strip_hotkey(&mut self, chord: &Chord) -> Result<()> {
        if !self.store.is_capturing() {
            return Ok(());
        }
        let scan_codes: Vec<u16> = chord
            .keys()
            .iter()
            .filter_map(|&vk| virtual_key_to_scan_code(vk))
            .collect();
        self.store.discard_unreleased_keys(&scan_codes)?;
        Ok(())
    }

    fn toggle_capture(&mut self) -> Result<()> {
        let chord = self.hotkeys.select_or_toggle_record.clone();

        if self.store.is_capturing() {
            self.strip_hotkey(&chord)?;
            self.ignore.clear();
            self.status.remove_line(RECORDING);
            if let Err(e) = self.store.stop_capture() {
                error!(error = %e, "Failed to save record");
                return Err(e);
            }
            return Ok(());
        }

        if self.store.current_slot().is_none() {
            debug!("No slot selected, nothing to capture");
            return Ok(());
        }

        // The hot key's own releases arrive after capture starts
        self.ignore.arm(
            chord
                .keys()
                .iter()
                .map(|&vk| IgnoreRule::once(vk, KeyTransition::Up)),
        );

        match self.store.start_capture() {
            Ok(slot) => {
                self.status.add_line(RECORDING);
                self.seed_cursor(slot)?;
            }
            Err(e) => {
                warn!(error = %e, "Capture not started");
                self.ignore.clear();
            }
        }
        Ok(())
    }

    /// Start the capture with an absolute move to where the cursor is now.
    fn seed_cursor(&mut self, slot: SlotId) -> Result<()> {
        let (width, height) = self.metrics.screen_size();
        let (x, y) = self.metrics.cursor_position();
        let event = InputEvent::mouse_move(
            normalize_coord(x, width),
            normalize_coord(y, height),
            true,
        );
        debug!(slot, x, y, "Seeding capture with cursor position");
        self.store.record_event(event, 0)
    }

    fn simulate(&mut self) -> Result<()> {
        self.status.add_line(SIMULATING_RECORD);
        let playback = Playback::new(
            self.sink.as_ref(),
            self.metrics.as_ref(),
            self.sleeper.as_ref(),
            self.cancel.clone(),
        );
        let outcome = self.store.simulate(&playback);
        self.status.remove_line(SIMULATING_RECORD);

        let report = outcome?;
        if report.cancelled {
            info!(injected = report.injected, "Playback cancelled");
        }
        self.last_playback = Some(report);
        Ok(())
    }

    fn start_combo(&mut self, chord: &Chord, state: ComboState) -> Result<()> {
        self.strip_hotkey(chord)?;

        let (started, line) = match state {
            ComboState::RecordingBinding => (self.combo.start_recording(), ADDING_RECORD),
            ComboState::DeletingBinding => (self.combo.start_deleting(), DELETING_RECORD),
            ComboState::Idle => return Ok(()),
        };
        if started {
            self.status.add_line(line);
        }
        Ok(())
    }

    fn finish_combo(&mut self) -> Result<()> {
        let Some((state, chord)) = self.combo.stop() else {
            return Ok(());
        };
        let previous = self.store.current_slot();

        let (line, outcome) = match state {
            ComboState::RecordingBinding => (ADDING_RECORD, self.store.bind_slot(&chord)),
            ComboState::DeletingBinding => (DELETING_RECORD, self.store.unbind_slot(&chord)),
            ComboState::Idle => return Ok(()),
        };
        self.status.remove_line(line);
        self.show_current_slot(previous);

        match outcome {
            Ok(slot) => {
                debug!(slot, ?state, "Binding gesture finished");
                Ok(())
            }
            Err(e) if e.is_persistence() => Err(e),
            Err(e) => {
                warn!(error = %e, chord = %chord, "Binding gesture rejected");
                Ok(())
            }
        }
    }

    fn show_current_slot(&self, previous: Option<SlotId>) {
        let current = self.store.current_slot();
        if previous == current {
            return;
        }
        let mut lines = self.status.lock();
        match (previous, current) {
            (Some(old), Some(new)) => lines.replace(&current_record_line(old), current_record_line(new)),
            (Some(old), None) => {
                lines.remove(&current_record_line(old));
            }
            (None, Some(new)) => lines.add(current_record_line(new)),
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{VK_CONTROL, VK_ESCAPE, VK_F1, VK_MENU};
    use crate::storage::MemoryRecordStorage;

    struct NullSink;

    impl InputSink for NullSink {
        fn inject_key(&self, _: u16, _: bool, _: bool) {}
        fn inject_mouse_move(&self, _: i32, _: i32, _: bool) {}
        fn inject_mouse_button(&self, _: crate::events::MouseButton, _: bool) {}
        fn inject_mouse_scroll(&self, _: i16) {}
    }

    struct Screen;

    impl ScreenMetrics for Screen {
        fn screen_size(&self) -> (i32, i32) {
            (1000, 500)
        }
        fn cursor_position(&self) -> (i32, i32) {
            (500, 250)
        }
    }

    fn controller() -> MacroController {
        MacroController::new(
            &MacroConfig::default(),
            Box::new(MemoryRecordStorage::new()),
            Box::new(NullSink),
            Box::new(Screen),
        )
        .unwrap()
    }

    fn key(c: &mut MacroController, vk: u16, pressed: bool) -> ControlSignal {
        c.on_key_input(&RawKeyboard::from_virtual_key(vk, pressed), 1)
            .unwrap()
    }

    fn tap(c: &mut MacroController, keys: &[u16]) {
        for &vk in keys {
            key(c, vk, true);
        }
        for &vk in keys.iter().rev() {
            key(c, vk, false);
        }
    }

    #[test]
    fn test_instruction_line_published() {
        let c = controller();
        let lines = c.status().snapshot();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("EXIT - Ctrl + Escape"));
    }

    #[test]
    fn test_autorepeat_does_not_toggle_twice() {
        let mut c = controller();
        tap(&mut c, &[VK_CONTROL, VK_MENU, 0x41]);
        tap(&mut c, &[VK_CONTROL, 0x31]);
        assert_eq!(c.store().current_slot(), Some(0));

        key(&mut c, VK_CONTROL, true);
        key(&mut c, VK_F1, true);
        assert!(c.store().is_capturing());
        // Held F1 autorepeats
        key(&mut c, VK_F1, true);
        key(&mut c, VK_F1, true);
        assert!(c.store().is_capturing());
    }

    #[test]
    fn test_held_trigger_key_does_not_join_binding() {
        let mut c = controller();
        key(&mut c, VK_CONTROL, true);
        key(&mut c, VK_MENU, true);
        key(&mut c, 0x41, true);
        assert_eq!(c.combo_state(), ComboState::RecordingBinding);

        // Held A autorepeats, then the whole trigger chord is released
        key(&mut c, 0x41, true);
        key(&mut c, 0x41, false);
        key(&mut c, VK_MENU, false);
        key(&mut c, VK_CONTROL, false);
        assert_eq!(c.combo_state(), ComboState::RecordingBinding);
        assert_eq!(c.store().slots().count(), 0);

        tap(&mut c, &[VK_CONTROL, 0x31]);
        assert_eq!(c.combo_state(), ComboState::Idle);
        assert_eq!(
            c.store().record(0).unwrap().binding,
            Chord::new([VK_CONTROL, 0x31])
        );
    }

    #[test]
    fn test_stop_drops_hotkey_press_held_across_other_input() {
        let mut c = controller();
        tap(&mut c, &[VK_CONTROL, VK_MENU, 0x41]);
        tap(&mut c, &[VK_CONTROL, 0x31]);
        tap(&mut c, &[VK_CONTROL, VK_F1]);
        assert!(c.store().is_capturing());

        c.on_key_input(&RawKeyboard::from_virtual_key(VK_CONTROL, true), 3)
            .unwrap();
        c.on_mouse_input(&RawMouse::relative(2, 0), 5).unwrap();
        c.on_key_input(&RawKeyboard::from_virtual_key(VK_F1, true), 4)
            .unwrap();
        assert!(!c.store().is_capturing());
        key(&mut c, VK_F1, false);
        key(&mut c, VK_CONTROL, false);

        let events = &c.store().record(0).unwrap().events;
        assert_eq!(
            *events,
            vec![
                InputEvent::mouse_move(32767, 32767, true),
                InputEvent::delay(10),
                InputEvent::mouse_move(2, 0, false),
            ]
        );
    }

    #[test]
    fn test_exit_only_when_idle() {
        let mut c = controller();
        tap(&mut c, &[VK_CONTROL, VK_MENU, 0x41]);
        tap(&mut c, &[VK_CONTROL, 0x31]);
        tap(&mut c, &[VK_CONTROL, VK_F1]);
        assert!(c.store().is_capturing());

        key(&mut c, VK_CONTROL, true);
        assert_eq!(key(&mut c, VK_ESCAPE, true), ControlSignal::Continue);
        key(&mut c, VK_ESCAPE, false);
        key(&mut c, VK_CONTROL, false);

        tap(&mut c, &[VK_CONTROL, VK_F1]);
        assert!(!c.store().is_capturing());

        key(&mut c, VK_CONTROL, true);
        assert_eq!(key(&mut c, VK_ESCAPE, true), ControlSignal::Exit);
    }

    #[test]
    fn test_capture_without_slot_is_noop() {
        let mut c = controller();
        tap(&mut c, &[VK_CONTROL, VK_F1]);
        assert!(!c.store().is_capturing());
        assert!(!c.status().snapshot().iter().any(|l| l == RECORDING));
    }

    #[test]
    fn test_mouse_ignored_when_not_capturing() {
        let mut c = controller();
        c.on_mouse_input(&RawMouse::relative(3, 3), 10).unwrap();
        assert_eq!(c.store().slots().count(), 0);
    }
}
