//! Key-value configuration store with change notification.
//!
//! The naming rule set and other user-editable settings live in a
//! `section`/`key` → string store. Components interested in edits subscribe
//! to the store's observer list; the returned [`Subscription`] unregisters
//! itself when dropped.
//!
//! Observers are invoked synchronously, outside of any store lock, so an
//! observer may read or write the store from inside its callback. Writes only
//! broadcast when the persisted value actually changes, which is what keeps a
//! notify → save → notify chain from looping.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::core::errors::{AhcError, Result};

/// Callback invoked after the store content changed.
pub type Observer = Arc<dyn Fn() + Send + Sync>;

/// Abstract key-value configuration store.
pub trait ConfigStore: Send + Sync {
    /// Read a value, falling back to `default` when the key is absent.
    fn get_string(&self, section: &str, key: &str, default: &str) -> String;

    /// Write a value. Observers are notified only if the value changed.
    fn set_string(&self, section: &str, key: &str, value: &str) -> Result<()>;

    /// Register a change observer for as long as the returned guard lives.
    fn subscribe(&self, observer: Observer) -> Subscription;

    /// Broadcast a change that happened outside of `set_string`.
    fn notify_changed(&self);
}

/// Ordered list of change observers.
#[derive(Default)]
pub struct ObserverList {
    next_id: AtomicU64,
    observers: Mutex<Vec<(u64, Observer)>>,
}

impl ObserverList {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Append an observer; it is called after every earlier subscriber.
    pub fn subscribe(self: &Arc<Self>, observer: Observer) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.lock().push((id, observer));
        Subscription {
            list: Arc::downgrade(self),
            id,
        }
    }

    /// Invoke every observer in subscription order.
    pub fn broadcast(&self) {
        let snapshot: Vec<Observer> = self
            .observers
            .lock()
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in snapshot {
            observer();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.observers.lock().retain(|(existing, _)| *existing != id);
    }
}

/// RAII guard for an observer registration.
#[must_use = "dropping the subscription unregisters the observer"]
pub struct Subscription {
    list: Weak<ObserverList>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(list) = self.list.upgrade() {
            list.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

type Sections = BTreeMap<String, BTreeMap<String, String>>;

fn lookup(sections: &Sections, section: &str, key: &str) -> Option<String> {
    sections.get(section).and_then(|s| s.get(key)).cloned()
}

/// Apply a write; returns true when the stored value changed.
fn apply(sections: &mut Sections, section: &str, key: &str, value: &str) -> bool {
    let slot = sections.entry(section.to_string()).or_default();
    if slot.get(key).is_some_and(|existing| existing == value) {
        return false;
    }
    slot.insert(key.to_string(), value.to_string());
    true
}

// ──────────────────── in-memory store ────────────────────

/// Volatile store, used by tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryConfigStore {
    sections: RwLock<Sections>,
    observers: Arc<ObserverList>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        lookup(&self.sections.read(), section, key).unwrap_or_else(|| default.to_string())
    }

    fn set_string(&self, section: &str, key: &str, value: &str) -> Result<()> {
        let changed = apply(&mut self.sections.write(), section, key, value);
        if changed {
            self.observers.broadcast();
        }
        Ok(())
    }

    fn subscribe(&self, observer: Observer) -> Subscription {
        self.observers.subscribe(observer)
    }

    fn notify_changed(&self) {
        self.observers.broadcast();
    }
}

// ──────────────────── file-backed store ────────────────────

/// Store persisted as a TOML document of `[section] key = "value"` tables.
///
/// Every change is flushed immediately via temp file + rename.
pub struct FileConfigStore {
    path: PathBuf,
    sections: RwLock<Sections>,
    observers: Arc<ObserverList>,
}

impl FileConfigStore {
    /// Open the store, treating a missing file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sections = read_sections(&path)?;
        Ok(Self {
            path,
            sections: RwLock::new(sections),
            observers: ObserverList::new(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file after an external edit; broadcasts if content changed.
    pub fn reload(&self) -> Result<bool> {
        let fresh = read_sections(&self.path)?;
        let changed = {
            let mut current = self.sections.write();
            if *current == fresh {
                false
            } else {
                *current = fresh;
                true
            }
        };
        if changed {
            self.observers.broadcast();
        }
        Ok(changed)
    }

    fn flush(&self, sections: &Sections) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| AhcError::io(parent, source))?;
        }
        let rendered = toml::to_string_pretty(sections)?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, rendered).map_err(|source| AhcError::io(&tmp, source))?;
        fs::rename(&tmp, &self.path).map_err(|source| AhcError::io(&self.path, source))
    }
}

impl ConfigStore for FileConfigStore {
    fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        lookup(&self.sections.read(), section, key).unwrap_or_else(|| default.to_string())
    }

    fn set_string(&self, section: &str, key: &str, value: &str) -> Result<()> {
        let changed = {
            let mut sections = self.sections.write();
            let mut next = sections.clone();
            let changed = apply(&mut next, section, key, value);
            if changed {
                // Memory only follows once the file has the new value.
                self.flush(&next)?;
                *sections = next;
            }
            changed
        };
        if changed {
            self.observers.broadcast();
        }
        Ok(())
    }

    fn subscribe(&self, observer: Observer) -> Subscription {
        self.observers.subscribe(observer)
    }

    fn notify_changed(&self) {
        self.observers.broadcast();
    }
}

fn read_sections(path: &Path) -> Result<Sections> {
    if !path.exists() {
        return Ok(Sections::new());
    }
    let raw = fs::read_to_string(path).map_err(|source| AhcError::io(path, source))?;
    Ok(toml::from_str(&raw)?)
}
