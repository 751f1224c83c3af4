//! Record persistence - one JSON document per slot

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::events::InputEvent;
use crate::hotkey::Chord;
use crate::recorder::{Record, SlotId};
use crate::{MacroRecorderError, Result};

const FORMAT_VERSION: u32 = 1;
const FILE_PREFIX: &str = "record_";
const FILE_EXTENSION: &str = "json";

/// Result of loading every stored record
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: BTreeMap<SlotId, Record>,
    /// Records that could not be read; their slots are left empty
    pub skipped: Vec<MacroRecorderError>,
}

/// Backing store for recorded macros
pub trait RecordStorage {
    /// Persist a slot's sequence together with its binding, replacing any previous copy.
    fn save_sequence(&self, slot: SlotId, events: &[InputEvent], binding: &Chord) -> Result<()>;

    /// Load every stored slot. Corrupt entries are reported, not fatal.
    fn load_all_sequences(&self) -> Result<LoadReport>;

    /// Remove a slot. Removing a slot that was never saved is not an error.
    fn delete_sequence(&self, slot: SlotId) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct RecordFile {
    version: u32,
    slot: SlotId,
    saved_at: DateTime<Utc>,
    binding: Chord,
    events: Vec<InputEvent>,
}

/// Stores records as `record_<slot>.json` files in a directory
#[derive(Debug, Clone)]
pub struct FileRecordStorage {
    dir: PathBuf,
}

impl FileRecordStorage {
    /// Open (creating if needed) a record directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!("Using record directory {:?}", dir);
        Ok(Self { dir })
    }

    pub fn record_path(&self, slot: SlotId) -> PathBuf {
        self.dir.join(format!("{FILE_PREFIX}{slot}.{FILE_EXTENSION}"))
    }

    fn read_record(&self, path: &Path, slot: SlotId) -> std::result::Result<Record, String> {
        let bytes = fs::read(path).map_err(|e| e.to_string())?;
        let file: RecordFile = serde_json::from_slice(&bytes).map_err(|e| e.to_string())?;

        if file.version != FORMAT_VERSION {
            return Err(format!("unsupported format version {}", file.version));
        }
        if file.slot != slot {
            return Err(format!("file name says slot {} but contents say {}", slot, file.slot));
        }
        if file.binding.is_empty() {
            return Err("empty key binding".to_string());
        }
        if file.events.windows(2).any(|pair| pair[0].is_delay() && pair[1].is_delay()) {
            return Err("adjacent delay entries".to_string());
        }

        Ok(Record {
            binding: file.binding,
            events: file.events,
        })
    }
}

/// Slot id encoded in a record file name, if it is one.
fn slot_from_file_name(name: &str) -> Option<SlotId> {
    let stem = name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_EXTENSION)?
        .strip_suffix('.')?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Leading zeros would give one slot two file names
    if stem.len() > 1 && stem.starts_with('0') {
        return None;
    }
    stem.parse().ok()
}

impl RecordStorage for FileRecordStorage {
    fn save_sequence(&self, slot: SlotId, events: &[InputEvent], binding: &Chord) -> Result<()> {
        let path = self.record_path(slot);
        let file = RecordFile {
            version: FORMAT_VERSION,
            slot,
            saved_at: Utc::now(),
            binding: binding.clone(),
            events: events.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&file)?;

        // Write then rename so a crash never leaves a truncated record behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| {
            MacroRecorderError::Persistence(format!("writing {}: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            MacroRecorderError::Persistence(format!("replacing {}: {}", path.display(), e))
        })?;

        info!(slot, events = events.len(), "Saved record to {:?}", path);
        Ok(())
    }

    fn load_all_sequences(&self) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(slot) = name.to_str().and_then(slot_from_file_name) else {
                continue;
            };
            let path = entry.path();

            match self.read_record(&path, slot) {
                Ok(record) => {
                    debug!(slot, events = record.events.len(), "Loaded record");
                    report.records.insert(slot, record);
                }
                Err(reason) => {
                    warn!("Skipping malformed record {:?}: {}", path, reason);
                    report
                        .skipped
                        .push(MacroRecorderError::MalformedRecord { path, reason });
                }
            }
        }

        info!(
            loaded = report.records.len(),
            skipped = report.skipped.len(),
            "Loaded records from {:?}",
            self.dir
        );
        Ok(report)
    }

    fn delete_sequence(&self, slot: SlotId) -> Result<()> {
        let path = self.record_path(slot);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(slot, "Deleted record {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MacroRecorderError::Persistence(format!(
                "deleting {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Keeps records in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStorage {
    records: Arc<Mutex<BTreeMap<SlotId, Record>>>,
}

impl MemoryRecordStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = (SlotId, Record)>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records.into_iter().collect())),
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<Record> {
        self.lock().ok()?.get(&slot).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|records| records.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<SlotId, Record>>> {
        self.records
            .lock()
            .map_err(|e| MacroRecorderError::Persistence(format!("Failed to lock records: {}", e)))
    }
}

impl RecordStorage for MemoryRecordStorage {
    fn save_sequence(&self, slot: SlotId, events: &[InputEvent], binding: &Chord) -> Result<()> {
        self.lock()?.insert(
            slot,
            Record {
                binding: binding.clone(),
                events: events.to_vec(),
            },
        );
        Ok(())
    }

    fn load_all_sequences(&self) -> Result<LoadReport> {
        Ok(LoadReport {
            records: self.lock()?.clone(),
            skipped: Vec::new(),
        })
    }

    fn delete_sequence(&self, slot: SlotId) -> Result<()> {
        self.lock()?.remove(&slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ClickButton, XButton};
    use tempfile::tempdir;

    fn sample_events() -> Vec<InputEvent> {
        vec![
            InputEvent::mouse_move(32767, 16000, true),
            InputEvent::delay(15),
            InputEvent::key(0x1E, true, false),
            InputEvent::delay(40),
            InputEvent::key(0x1E, false, false),
            InputEvent::key(0x48, true, true),
            InputEvent::mouse_move(-7, 3, false),
            InputEvent::mouse_click(ClickButton::Left, true),
            InputEvent::mouse_click(ClickButton::Left, false),
            InputEvent::mouse_x_click(XButton::X2, true),
            InputEvent::mouse_scroll(-3),
        ]
    }

    #[test]
    fn test_slot_from_file_name() {
        assert_eq!(slot_from_file_name("record_0.json"), Some(0));
        assert_eq!(slot_from_file_name("record_12.json"), Some(12));
        assert_eq!(slot_from_file_name("record_.json"), None);
        assert_eq!(slot_from_file_name("record_1.json.tmp"), None);
        assert_eq!(slot_from_file_name("record_+1.json"), None);
        assert_eq!(slot_from_file_name("notes.txt"), None);
        assert_eq!(slot_from_file_name("record_01.json"), None);
        assert_eq!(slot_from_file_name("record_00.json"), None);
    }

    #[test]
    fn test_zero_padded_copy_is_not_loaded() {
        let dir = tempdir().unwrap();
        let storage = FileRecordStorage::new(dir.path()).unwrap();
        let binding = Chord::new([0x11, 0x31]);
        storage.save_sequence(1, &sample_events(), &binding).unwrap();
        fs::copy(storage.record_path(1), dir.path().join("record_01.json")).unwrap();

        let report = storage.load_all_sequences().unwrap();
        assert!(report.skipped.is_empty());
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[&1].binding, binding);
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempdir().expect("Failed to create temp dir");
        let storage = FileRecordStorage::new(dir.path()).unwrap();
        let binding = Chord::new([0x11, 0x31]);

        storage.save_sequence(3, &sample_events(), &binding).unwrap();
        assert!(storage.record_path(3).exists());

        let report = storage.load_all_sequences().unwrap();
        assert!(report.skipped.is_empty());
        let record = &report.records[&3];
        assert_eq!(record.binding, binding);
        assert_eq!(record.events, sample_events());
    }

    #[test]
    fn test_save_replaces_previous_copy() {
        let dir = tempdir().unwrap();
        let storage = FileRecordStorage::new(dir.path()).unwrap();
        let binding = Chord::new([0x11, 0x31]);

        storage.save_sequence(0, &sample_events(), &binding).unwrap();
        storage
            .save_sequence(0, &[InputEvent::mouse_scroll(1)], &binding)
            .unwrap();

        let report = storage.load_all_sequences().unwrap();
        assert_eq!(report.records[&0].events, vec![InputEvent::mouse_scroll(1)]);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let dir = tempdir().unwrap();
        let storage = FileRecordStorage::new(dir.path()).unwrap();
        storage
            .save_sequence(1, &sample_events(), &Chord::new([0x11, 0x31]))
            .unwrap();

        fs::write(storage.record_path(2), b"{\"version\":1,\"slot\":2,\"bind").unwrap();
        fs::write(storage.record_path(4), b"not json at all").unwrap();
        // Valid JSON, but stored under the wrong name
        let misplaced = fs::read(storage.record_path(1)).unwrap();
        fs::write(storage.record_path(5), misplaced).unwrap();
        fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();

        let report = storage.load_all_sequences().unwrap();
        assert_eq!(report.records.keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(report.skipped.len(), 3);
        assert!(report
            .skipped
            .iter()
            .all(|e| matches!(e, MacroRecorderError::MalformedRecord { .. })));
    }

    #[test]
    fn test_adjacent_delays_rejected() {
        let dir = tempdir().unwrap();
        let storage = FileRecordStorage::new(dir.path()).unwrap();
        storage
            .save_sequence(
                0,
                &[InputEvent::delay(1), InputEvent::delay(2)],
                &Chord::new([0x11]),
            )
            .unwrap();

        let report = storage.load_all_sequences().unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_delete_missing_record_is_ok() {
        let dir = tempdir().unwrap();
        let storage = FileRecordStorage::new(dir.path()).unwrap();
        storage.delete_sequence(9).unwrap();

        storage
            .save_sequence(9, &sample_events(), &Chord::new([0x11]))
            .unwrap();
        storage.delete_sequence(9).unwrap();
        assert!(!storage.record_path(9).exists());
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let records = dir.path().join("records");
        let storage = FileRecordStorage::new(&records).unwrap();
        fs::remove_dir(&records).unwrap();

        let err = storage
            .save_sequence(0, &sample_events(), &Chord::new([0x11]))
            .unwrap_err();
        assert!(matches!(err, MacroRecorderError::Persistence(_)));
        assert!(err.is_persistence());
    }
}
