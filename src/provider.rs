//! Index provider interface and an in-memory implementation.
//!
//! The provider owns the task records and their indexes. The engine only
//! consumes lookups and change notifications through [`IndexProvider`].

use crate::query::dates::{date_key, local_today, parse_task_date};
use crate::types::TaskRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Capacity of the change notification channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Change notifications emitted by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    Added(String),
    Updated(String),
    Deleted(String),
    Renamed { from: String, to: String },
    Reindexed,
}

/// Source of task records and their indexes.
///
/// Lookups may suspend. Errors are I/O failures and are passed through the
/// engine to its caller unchanged.
#[async_trait]
pub trait IndexProvider: Send + Sync {
    async fn get_all_paths(&self) -> Result<Vec<String>>;

    /// Paths whose status equals `status` exactly.
    async fn get_paths_by_status(&self, status: &str) -> Result<Vec<String>>;

    /// Paths with a due or scheduled date on the calendar day `date_key`
    /// (`YYYY-MM-DD`). May over-approximate, never under-approximate.
    async fn get_paths_by_date(&self, date_key: &str) -> Result<Vec<String>>;

    /// Paths dated before today. May include completed records.
    async fn get_overdue_paths(&self) -> Result<Vec<String>>;

    async fn get_record(&self, path: &str) -> Result<Option<TaskRecord>>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<IndexEvent>;
}

#[derive(Debug, Default)]
struct IndexState {
    records: BTreeMap<String, TaskRecord>,
    by_status: HashMap<String, BTreeSet<String>>,
    by_date: HashMap<String, BTreeSet<String>>,
}

impl IndexState {
    fn insert(&mut self, record: TaskRecord) {
        let path = record.path.clone();
        self.by_status
            .entry(record.status.clone())
            .or_default()
            .insert(path.clone());
        for key in record_date_keys(&record) {
            self.by_date.entry(key).or_default().insert(path.clone());
        }
        self.records.insert(path, record);
    }

    fn remove(&mut self, path: &str) -> Option<TaskRecord> {
        let record = self.records.remove(path)?;
        if let Some(paths) = self.by_status.get_mut(&record.status) {
            paths.remove(path);
        }
        for key in record_date_keys(&record) {
            if let Some(paths) = self.by_date.get_mut(&key) {
                paths.remove(path);
            }
        }
        Some(record)
    }
}

fn record_date_keys(record: &TaskRecord) -> BTreeSet<String> {
    [&record.due, &record.scheduled]
        .into_iter()
        .flatten()
        .filter_map(|raw| date_key(raw))
        .collect()
}

/// In-process index over a set of task records.
pub struct MemoryIndex {
    state: RwLock<IndexState>,
    events: broadcast::Sender<IndexEvent>,
    today: fn() -> NaiveDate,
}

impl MemoryIndex {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(IndexState::default()),
            events,
            today: local_today,
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = TaskRecord>) -> Self {
        let index = Self::new();
        {
            let mut state = index.state.write().unwrap_or_else(PoisonError::into_inner);
            for record in records {
                state.insert(record);
            }
        }
        index
    }

    /// Override the clock used for overdue lookups.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Load a JSON array of task records.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading tasks from {}", path.display()))?;
        let records: Vec<TaskRecord> = serde_json::from_str(&content)
            .with_context(|| format!("parsing tasks in {}", path.display()))?;
        Ok(Self::from_records(records))
    }

    /// Load a YAML list of task records.
    pub fn load_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading tasks from {}", path.display()))?;
        let records: Vec<TaskRecord> = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing tasks in {}", path.display()))?;
        Ok(Self::from_records(records))
    }

    /// Load tasks, picking the format from the file extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::load_yaml(path),
            _ => Self::load_json(path),
        }
    }

    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace a record.
    pub fn upsert(&self, record: TaskRecord) {
        let path = record.path.clone();
        let existed = {
            let mut state = self.write();
            let existed = state.remove(&path).is_some();
            state.insert(record);
            existed
        };
        self.emit(if existed {
            IndexEvent::Updated(path)
        } else {
            IndexEvent::Added(path)
        });
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, path: &str) -> bool {
        let removed = self.write().remove(path).is_some();
        if removed {
            self.emit(IndexEvent::Deleted(path.to_string()));
        }
        removed
    }

    /// Move a record to a new path. Returns whether it existed.
    pub fn rename(&self, from: &str, to: &str) -> bool {
        let moved = {
            let mut state = self.write();
            match state.remove(from) {
                Some(mut record) => {
                    record.path = to.to_string();
                    state.insert(record);
                    true
                }
                None => false,
            }
        };
        if moved {
            self.emit(IndexEvent::Renamed {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        moved
    }

    /// Replace the whole corpus.
    pub fn reindex(&self, records: impl IntoIterator<Item = TaskRecord>) {
        {
            let mut state = self.write();
            *state = IndexState::default();
            for record in records {
                state.insert(record);
            }
        }
        self.emit(IndexEvent::Reindexed);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: IndexEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IndexProvider for MemoryIndex {
    async fn get_all_paths(&self) -> Result<Vec<String>> {
        Ok(self.read().records.keys().cloned().collect())
    }

    async fn get_paths_by_status(&self, status: &str) -> Result<Vec<String>> {
        Ok(self
            .read()
            .by_status
            .get(status)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_paths_by_date(&self, date_key: &str) -> Result<Vec<String>> {
        Ok(self
            .read()
            .by_date
            .get(date_key)
            .map(|paths| paths.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_overdue_paths(&self) -> Result<Vec<String>> {
        let today = (self.today)();
        Ok(self
            .read()
            .records
            .values()
            .filter(|record| {
                [&record.due, &record.scheduled]
                    .into_iter()
                    .flatten()
                    .filter_map(|raw| parse_task_date(raw))
                    .any(|d| d.day < today)
            })
            .map(|record| record.path.clone())
            .collect())
    }

    async fn get_record(&self, path: &str) -> Result<Option<TaskRecord>> {
        Ok(self.read().records.get(path).cloned())
    }

    fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }
}
