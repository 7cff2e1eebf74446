use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Result, RolemapError};
use crate::types::AnalysisCriteria;

/// Owner used when a caller does not partition criteria.
pub const DEFAULT_OWNER: &str = "default";

/// Owner-keyed storage for saved criteria.
pub trait CriteriaStore: Send + Sync {
    /// All criteria saved by `owner`, in insertion order.
    fn list(&self, owner: &str) -> Result<Vec<AnalysisCriteria>>;

    fn get(&self, owner: &str, id: &str) -> Result<Option<AnalysisCriteria>>;

    /// Insert, or replace the entry with the same id.
    fn put(&self, owner: &str, criteria: AnalysisCriteria) -> Result<()>;

    /// Returns whether an entry was removed.
    fn remove(&self, owner: &str, id: &str) -> Result<bool>;
}

type Entries = BTreeMap<String, Vec<AnalysisCriteria>>;

fn poisoned<T>(_: T) -> RolemapError {
    RolemapError::Store("criteria store lock poisoned".to_string())
}

fn upsert(entries: &mut Entries, owner: &str, criteria: AnalysisCriteria) {
    let list = entries.entry(owner.to_string()).or_default();
    match list.iter_mut().find(|c| c.id == criteria.id) {
        Some(existing) => *existing = criteria,
        None => list.push(criteria),
    }
}

fn delete(entries: &mut Entries, owner: &str, id: &str) -> bool {
    let Some(list) = entries.get_mut(owner) else {
        return false;
    };
    let before = list.len();
    list.retain(|c| c.id != id);
    let removed = list.len() != before;
    if list.is_empty() {
        entries.remove(owner);
    }
    removed
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryCriteriaStore {
    entries: RwLock<Entries>,
}

impl InMemoryCriteriaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CriteriaStore for InMemoryCriteriaStore {
    fn list(&self, owner: &str) -> Result<Vec<AnalysisCriteria>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(owner).cloned().unwrap_or_default())
    }

    fn get(&self, owner: &str, id: &str) -> Result<Option<AnalysisCriteria>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .get(owner)
            .and_then(|list| list.iter().find(|c| c.id == id).cloned()))
    }

    fn put(&self, owner: &str, criteria: AnalysisCriteria) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        upsert(&mut entries, owner, criteria);
        Ok(())
    }

    fn remove(&self, owner: &str, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        Ok(delete(&mut entries, owner, id))
    }
}

/// Store persisted as a pretty-printed JSON document, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileCriteriaStore {
    path: PathBuf,
    entries: RwLock<Entries>,
}

impl JsonFileCriteriaStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            if content.trim().is_empty() {
                Entries::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    RolemapError::Store(format!("failed to parse '{}': {e}", path.display()))
                })?
            }
        } else {
            Entries::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| RolemapError::Store(format!("failed to serialize criteria: {e}")))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl CriteriaStore for JsonFileCriteriaStore {
    fn list(&self, owner: &str) -> Result<Vec<AnalysisCriteria>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(owner).cloned().unwrap_or_default())
    }

    fn get(&self, owner: &str, id: &str) -> Result<Option<AnalysisCriteria>> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries
            .get(owner)
            .and_then(|list| list.iter().find(|c| c.id == id).cloned()))
    }

    fn put(&self, owner: &str, criteria: AnalysisCriteria) -> Result<()> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        upsert(&mut entries, owner, criteria);
        self.save(&entries)
    }

    fn remove(&self, owner: &str, id: &str) -> Result<bool> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        let removed = delete(&mut entries, owner, id);
        if removed {
            self.save(&entries)?;
        }
        Ok(removed)
    }
}
