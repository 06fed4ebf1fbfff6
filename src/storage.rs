//! Persistence of the run history.
//!
//! The history is a single JSON array of [`TestResult`] objects, newest first,
//! capped at [`MAX_HISTORY`] entries and always written as a whole.

use crate::model::TestResult;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    entries: Vec<TestResult>,
}

impl HistoryLog {
    pub fn from_entries(mut entries: Vec<TestResult>) -> Self {
        entries.truncate(MAX_HISTORY);
        Self { entries }
    }

    /// Prepend `result`, evicting the oldest entries beyond the cap.
    pub fn append(&mut self, result: TestResult) {
        self.entries.insert(0, result);
        self.entries.truncate(MAX_HISTORY);
    }

    pub fn entries(&self) -> &[TestResult] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Storage port for the history log.
pub trait HistoryStore: Send {
    /// Read the persisted log. A store that was never written yields an empty log.
    fn load(&self) -> Result<HistoryLog>;
    /// Replace the persisted log with `log`.
    fn save(&self, log: &HistoryLog) -> Result<()>;
}

impl<S: HistoryStore + ?Sized> HistoryStore for Box<S> {
    fn load(&self) -> Result<HistoryLog> {
        (**self).load()
    }

    fn save(&self, log: &HistoryLog) -> Result<()> {
        (**self).save(log)
    }
}

fn base_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("speedtest-sim")
}

pub fn default_history_path() -> PathBuf {
    base_dir().join("history.json")
}

pub fn default_log_path() -> PathBuf {
    base_dir().join("speedtest-sim.log")
}

fn decode(data: &str) -> Result<HistoryLog> {
    let entries: Vec<TestResult> = serde_json::from_str(data).context("parse history JSON")?;
    Ok(HistoryLog::from_entries(entries))
}

/// History kept in a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl HistoryStore for FileStore {
    fn load(&self) -> Result<HistoryLog> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HistoryLog::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("read {}", self.path.display()));
            }
        };
        decode(&data).with_context(|| format!("load {}", self.path.display()))
    }

    fn save(&self, log: &HistoryLog) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).context("create history directory")?;
            }
        }
        let data = serde_json::to_vec(log)?;
        // Write beside the target and rename so readers never see a partial log.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        log::debug!("saved {} run(s) to {}", log.len(), self.path.display());
        Ok(())
    }
}

/// History held in memory as serialized JSON. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already serialized log.
    #[cfg(test)]
    pub fn with_json(json: impl Into<String>) -> Self {
        Self {
            data: Arc::new(Mutex::new(Some(json.into()))),
        }
    }

    #[cfg(test)]
    pub fn raw(&self) -> Option<String> {
        self.data.lock().ok().and_then(|d| d.clone())
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> Result<HistoryLog> {
        let guard = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("history store lock poisoned"))?;
        match guard.as_deref() {
            Some(data) => decode(data),
            None => Ok(HistoryLog::default()),
        }
    }

    fn save(&self, log: &HistoryLog) -> Result<()> {
        let data = serde_json::to_string(log)?;
        let mut guard = self
            .data
            .lock()
            .map_err(|_| anyhow::anyhow!("history store lock poisoned"))?;
        *guard = Some(data);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_result(n: u32) -> TestResult {
    TestResult {
        ping: 10 + n,
        download: 20 + n,
        upload: 10 + n,
        timestamp: format!("2024-05-01T12:{:02}:00.000Z", n % 60),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_keeps_newest_first_and_caps_length() {
        let mut log = HistoryLog::default();
        for n in 1..=11 {
            log.append(sample_result(n));
        }
        assert_eq!(log.len(), MAX_HISTORY);
        assert_eq!(log.entries().first(), Some(&sample_result(11)));
        assert_eq!(log.entries().last(), Some(&sample_result(2)));
    }

    #[test]
    fn oversized_persisted_log_is_truncated_on_load() {
        let entries: Vec<_> = (0..14).map(sample_result).collect();
        let store = MemoryStore::with_json(serde_json::to_string(&entries).unwrap());
        let log = store.load().unwrap();
        assert_eq!(log.len(), MAX_HISTORY);
        assert_eq!(log.entries().first(), Some(&sample_result(0)));
    }

    #[test]
    fn memory_store_keeps_json_array_shape() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_empty());

        let log = HistoryLog::from_entries(vec![sample_result(1)]);
        store.save(&log).unwrap();
        let raw = store.raw().unwrap();
        assert_eq!(
            raw,
            r#"[{"ping":11,"download":21,"upload":11,"timestamp":"2024-05-01T12:01:00.000Z"}]"#
        );
        assert_eq!(store.load().unwrap(), log);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("history.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn file_store_round_trips_and_creates_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let store = FileStore::new(&path);

        let log = HistoryLog::from_entries((1..=3).map(sample_result).collect());
        store.save(&log).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(store.load().unwrap(), log);
    }

    #[test]
    fn file_store_reports_corrupt_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = FileStore::new(&path).load().unwrap_err();
        assert!(format!("{err:#}").contains("parse history JSON"));
    }
}
