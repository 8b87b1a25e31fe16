//! Durable storage of the hydration state.
//!
//! The whole [`PersistedState`] lives in one JSON file. Every save replaces
//! it atomically (temp file, fsync, rename). A second file holds a backup
//! copy, refreshed once the per-day save counter reaches the configured
//! threshold. Loading falls back from the primary file to the backup and
//! finally to defaults; it never fails.

use crate::config::{defaults, Config};
use crate::{Error, PersistedState, Result};
use chrono::NaiveDate;
use fs2::FileExt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PRIMARY_FILE: &str = "water_data.json";
const BACKUP_FILE: &str = "water_data_backup.json";

/// Where a loaded state came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateSource {
    Primary,
    Backup,
    Defaults,
}

/// Result of a successful save
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaveReport {
    pub backup_refreshed: bool,
}

/// Owner of the primary and backup state files
#[derive(Clone, Debug)]
pub struct PersistentStore {
    dir: PathBuf,
    backup_threshold: u32,
}

impl PersistentStore {
    /// Create a store rooted at `dir` with the default backup threshold
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            backup_threshold: defaults::BACKUP_THRESHOLD,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.data.data_dir).with_backup_threshold(config.backup.threshold)
    }

    pub fn with_backup_threshold(mut self, threshold: u32) -> Self {
        self.backup_threshold = threshold.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn primary_path(&self) -> PathBuf {
        self.dir.join(PRIMARY_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(BACKUP_FILE)
    }

    /// Load the state, falling back to the backup and then to defaults
    pub fn load(&self) -> PersistedState {
        self.load_with_source().0
    }

    /// Like [`load`](Self::load), also reporting which file was used
    pub fn load_with_source(&self) -> (PersistedState, StateSource) {
        let primary = self.primary_path();
        match read_state(&primary) {
            Ok(Some(state)) => {
                tracing::debug!("Loaded state from {:?}", primary);
                return (state, StateSource::Primary);
            }
            Ok(None) => tracing::info!("No state file at {:?}", primary),
            Err(e) => tracing::warn!(
                "Failed to load state file {:?}: {}. Trying backup.",
                primary,
                e
            ),
        }

        let backup = self.backup_path();
        match read_state(&backup) {
            Ok(Some(state)) => {
                tracing::warn!("Recovered state from backup {:?}", backup);
                return (state, StateSource::Backup);
            }
            Ok(None) => tracing::debug!("No backup file at {:?}", backup),
            Err(e) => tracing::warn!("Failed to load backup file {:?}: {}", backup, e),
        }

        tracing::info!("Using default state");
        (PersistedState::default(), StateSource::Defaults)
    }

    /// Save the state, logging instead of propagating failures
    ///
    /// Returns whether the primary file now matches `state`.
    pub fn save(&self, state: &mut PersistedState, today: NaiveDate) -> bool {
        match self.try_save(state, today) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to save state to {:?}: {}", self.primary_path(), e);
                false
            }
        }
    }

    /// Save the state, bumping today's backup counter
    ///
    /// When the counter reaches the threshold it is reset before the state
    /// is serialized, and the same bytes are written to the backup file.
    /// If the primary write fails the counter is restored to its previous
    /// value. A failed backup write is logged and reported through
    /// [`SaveReport::backup_refreshed`]; memory and the primary still agree.
    pub fn try_save(&self, state: &mut PersistedState, today: NaiveDate) -> Result<SaveReport> {
        let previous = state.backup_info.get(&today).copied();

        let counter = state.backup_info.entry(today).or_insert(0);
        *counter += 1;
        let backup_due = *counter >= self.backup_threshold;
        if backup_due {
            *counter = 0;
        }

        let contents = match self.write_primary(state) {
            Ok(contents) => contents,
            Err(e) => {
                match previous {
                    Some(count) => state.backup_info.insert(today, count),
                    None => state.backup_info.remove(&today),
                };
                return Err(e);
            }
        };

        let backup_refreshed = backup_due && self.write_backup(&contents);
        Ok(SaveReport { backup_refreshed })
    }

    /// Write the primary file, returning the bytes written
    fn write_primary(&self, state: &PersistedState) -> Result<Vec<u8>> {
        std::fs::create_dir_all(&self.dir)?;

        let contents = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.primary_path(), &contents)?;
        tracing::debug!("Saved state to {:?}", self.primary_path());
        Ok(contents)
    }

    fn write_backup(&self, contents: &[u8]) -> bool {
        let backup = self.backup_path();
        match write_atomic(&backup, contents) {
            Ok(()) => {
                tracing::info!("Refreshed backup {:?}", backup);
                true
            }
            Err(e) => {
                tracing::error!("Failed to refresh backup {:?}: {}", backup, e);
                false
            }
        }
    }
}

/// Read and validate a state file; `Ok(None)` if it does not exist
fn read_state(path: &Path) -> Result<Option<PersistedState>> {
    if !path.exists() {
        return Ok(None);
    }

    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
    file.unlock()?;
    read?;

    let state: PersistedState = serde_json::from_str(&contents)?;
    state.validate()?;
    Ok(Some(state))
}

/// Replace `path` with `contents` via a synced temp file in the same directory
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| Error::State(format!("{:?} has no parent directory", path)))?;
    let temp = NamedTempFile::new_in(parent)?;

    temp.as_file().lock_exclusive()?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        writer.write_all(contents)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{logging, Gender, WaterRecord};
    use chrono::NaiveTime;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn sample_state() -> PersistedState {
        let mut state = PersistedState::default();
        state.profile.weight = 72;
        state.profile.gender = Gender::Female;
        state.daily_goal = 2100;
        state.records.insert(
            day(18),
            vec![
                WaterRecord {
                    time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                    amount: 250,
                },
                WaterRecord {
                    time: NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
                    amount: 400,
                },
            ],
        );
        state
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path());

        let mut state = sample_state();
        assert!(store.save(&mut state, day(18)));

        let (loaded, source) = store.load_with_source();
        assert_eq!(source, StateSource::Primary);
        assert_eq!(loaded, state);
        assert_eq!(loaded.total_on(day(18)), 650);
    }

    #[test]
    fn test_load_missing_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path().join("never-created"));

        let (state, source) = store.load_with_source();
        assert_eq!(source, StateSource::Defaults);
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_corrupt_primary_falls_back_to_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path()).with_backup_threshold(1);

        let mut state = sample_state();
        let report = store.try_save(&mut state, day(18)).unwrap();
        assert!(report.backup_refreshed);

        std::fs::write(store.primary_path(), "{ invalid json }").unwrap();

        let (loaded, source) = store.load_with_source();
        assert_eq!(source, StateSource::Backup);
        assert_eq!(loaded.daily_goal, 2100);
        assert_eq!(loaded.total_on(day(18)), 650);
    }

    #[test]
    fn test_both_corrupt_returns_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path());

        std::fs::write(store.primary_path(), "not json").unwrap();
        std::fs::write(store.backup_path(), "{\"daily_goal\": 0}").unwrap();

        let (state, source) = store.load_with_source();
        assert_eq!(source, StateSource::Defaults);
        assert_eq!(state, PersistedState::default());
    }

    #[test]
    fn test_missing_primary_uses_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path()).with_backup_threshold(1);

        let mut state = sample_state();
        store.try_save(&mut state, day(18)).unwrap();
        std::fs::remove_file(store.primary_path()).unwrap();

        let (_, source) = store.load_with_source();
        assert_eq!(source, StateSource::Backup);
    }

    #[test]
    fn test_backup_every_threshold_saves() {
        logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path());
        let mut state = PersistedState::default();

        let mut refreshes = 0;
        for i in 1..=10 {
            let report = store.try_save(&mut state, day(19)).unwrap();
            if report.backup_refreshed {
                refreshes += 1;
            }
            if i < 10 {
                assert_eq!(state.backup_info[&day(19)], i);
                assert!(!store.backup_path().exists());
            }
        }

        assert_eq!(refreshes, 1);
        assert_eq!(state.backup_info[&day(19)], 0);
        assert!(store.backup_path().exists());

        // Memory, primary and backup agree after the refresh
        let primary: PersistedState =
            serde_json::from_str(&std::fs::read_to_string(store.primary_path()).unwrap())
                .unwrap();
        let backup: PersistedState =
            serde_json::from_str(&std::fs::read_to_string(store.backup_path()).unwrap())
                .unwrap();
        assert_eq!(primary, state);
        assert_eq!(backup, state);
    }

    #[test]
    fn test_counter_is_per_day() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path());
        let mut state = PersistedState::default();

        for _ in 0..6 {
            store.try_save(&mut state, day(18)).unwrap();
        }
        for _ in 0..6 {
            store.try_save(&mut state, day(19)).unwrap();
        }

        assert_eq!(state.backup_info[&day(18)], 6);
        assert_eq!(state.backup_info[&day(19)], 6);
        assert!(!store.backup_path().exists());
    }

    #[test]
    fn test_failed_save_keeps_memory_and_counter() {
        let temp_dir = tempfile::tempdir().unwrap();
        // A regular file where the data directory should be
        let blocker = temp_dir.path().join("blocked");
        std::fs::write(&blocker, "").unwrap();
        let store = PersistentStore::new(&blocker);

        let mut state = sample_state();
        assert!(!store.save(&mut state, day(18)));
        assert!(store.try_save(&mut state, day(18)).is_err());

        assert!(!state.backup_info.contains_key(&day(18)));
        assert_eq!(state.total_on(day(18)), 650);
    }

    #[test]
    fn test_failed_backup_write_keeps_primary_and_counter_in_step() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path()).with_backup_threshold(2);
        // A directory cannot be replaced by the backup file
        std::fs::create_dir(store.backup_path()).unwrap();

        let mut state = sample_state();
        store.try_save(&mut state, day(18)).unwrap();
        let report = store.try_save(&mut state, day(18)).unwrap();

        assert!(!report.backup_refreshed);
        assert_eq!(state.backup_info[&day(18)], 0);
        assert!(store.save(&mut state, day(18)));

        let primary: PersistedState =
            serde_json::from_str(&std::fs::read_to_string(store.primary_path()).unwrap())
                .unwrap();
        assert_eq!(primary, state);
        assert_eq!(primary.backup_info[&day(18)], 1);
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path());

        let mut state = PersistedState::default();
        store.save(&mut state, day(18));

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != PRIMARY_FILE)
            .collect();
        assert!(
            extras.is_empty(),
            "Expected only {}, found extras: {:?}",
            PRIMARY_FILE,
            extras
        );
    }

    #[test]
    fn test_file_uses_documented_field_names() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = PersistentStore::new(temp_dir.path());

        let mut state = sample_state();
        store.save(&mut state, day(18));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.primary_path()).unwrap())
                .unwrap();
        assert_eq!(raw["user_info"]["gender"], "female");
        assert_eq!(raw["user_info"]["activity_level"], 0);
        assert_eq!(raw["daily_goal"], 2100);
        assert_eq!(raw["records"]["2026-10-18"][1]["time"], "12:30");
        assert_eq!(raw["records"]["2026-10-18"][1]["amount"], 400);
        assert_eq!(raw["backup_info"]["2026-10-18"], 1);
    }
}
