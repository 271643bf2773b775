//! Persistence adapter: keeps a key-value store eventually consistent with
//! the tool list without blocking the render path.
//!
//! Writes flow through two stages:
//!
//! 1. **Debounce** — `on_change` arms a `Debouncer` with the serialized
//!    list; further changes inside the window replace the payload.
//! 2. **Idle** — when the host's timer fires, `tick` moves the payload to
//!    an `IdleQueue`; the host's idle callback calls `run_idle` to write.
//!
//! No stage reads a clock: the host passes `now_ms` in and schedules the
//! timer/idle callbacks itself. `flush` bypasses both stages for tests
//! and page unload. Storage failures are logged and swallowed: the
//! session keeps working in memory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tc_core::model::ToolInstance;
use tc_core::snapshot::{decode_snapshot, encode_snapshot};

// ─── Storage backend ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,
    #[error("storage quota exceeded")]
    QuotaExceeded,
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A string key-value store (browser `localStorage` or an in-memory map).
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage for native hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
    /// When set, every operation fails with this error.
    pub fail_with: Option<StorageError>,
    /// Number of successful `set` calls.
    pub writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut storage = Self::default();
        storage.entries.insert(key.to_string(), value.to_string());
        storage
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn check(&self) -> Result<(), StorageError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.entries.remove(key);
        Ok(())
    }
}

// ─── Configuration ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistConfig {
    pub storage_key: String,
    /// Quiet period after the last change before a write is queued.
    pub debounce_ms: f64,
    /// Upper bound the host should pass to `requestIdleCallback` for writes.
    pub idle_timeout_ms: f64,
    /// Upper bound for the initial load's idle callback.
    pub load_idle_timeout_ms: f64,
    /// Delay used for the initial load when idle callbacks are unsupported.
    pub load_fallback_ms: f64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            storage_key: "tool-canvas-state".to_string(),
            debounce_ms: 500.0,
            idle_timeout_ms: 2000.0,
            load_idle_timeout_ms: 1000.0,
            load_fallback_ms: 100.0,
        }
    }
}

// ─── Pipeline stages ─────────────────────────────────────────────────────

/// Trailing-edge debounce: holds the latest payload until `delay_ms` has
/// passed without a new `arm`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay_ms: f64,
    pending: Option<(f64, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay_ms: f64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    /// Replace any pending payload and restart the window. Returns the new deadline.
    pub fn arm(&mut self, payload: T, now_ms: f64) -> f64 {
        let deadline = now_ms + self.delay_ms;
        self.pending = Some((deadline, payload));
        deadline
    }

    /// Take the payload once its deadline has passed.
    pub fn poll(&mut self, now_ms: f64) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if *deadline <= now_ms => self.pending.take().map(|(_, p)| p),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<f64> {
        self.pending.as_ref().map(|(d, _)| *d)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

/// Single-slot queue drained by an idle callback. Newer payloads replace
/// older ones.
#[derive(Debug)]
pub struct IdleQueue<T> {
    slot: Option<T>,
}

impl<T> Default for IdleQueue<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> IdleQueue<T> {
    /// Queue a payload. Returns `true` if the queue was empty, i.e. the
    /// host must request an idle callback.
    pub fn push(&mut self, payload: T) -> bool {
        self.slot.replace(payload).is_none()
    }

    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

// ─── Adapter ─────────────────────────────────────────────────────────────

/// What the host must schedule after a change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Schedule {
    Nothing,
    /// Call `tick` at (or after) this time.
    Timer { at_ms: f64 },
}

pub struct PersistenceAdapter {
    config: PersistConfig,
    hydrated: bool,
    /// Serialization of the last successful write; `None` when the key is absent.
    last_saved: Option<String>,
    debounce: Debouncer<String>,
    idle: IdleQueue<String>,
}

impl PersistenceAdapter {
    pub fn new(config: PersistConfig) -> Self {
        let debounce = Debouncer::new(config.debounce_ms);
        Self {
            config,
            hydrated: false,
            last_saved: None,
            debounce,
            idle: IdleQueue::default(),
        }
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    pub fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    pub fn last_saved(&self) -> Option<&str> {
        self.last_saved.as_deref()
    }

    /// Read the stored list. Missing, malformed, non-array and empty
    /// values all load as an empty canvas. Marks the adapter hydrated, so
    /// later changes are saved.
    pub fn load<S: Storage + ?Sized>(&mut self, storage: &S) -> Vec<ToolInstance> {
        self.hydrated = true;
        self.last_saved = None;

        let raw = match storage.get(&self.config.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("persist: load failed, starting empty: {e}");
                return Vec::new();
            }
        };

        match decode_snapshot(&raw) {
            Ok(tools) if !tools.is_empty() => {
                log::debug!("persist: restored {} tools", tools.len());
                self.last_saved = Self::marker(&tools);
                tools
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                log::warn!("persist: ignoring stored value: {e}");
                Vec::new()
            }
        }
    }

    /// React to a tool-list change.
    pub fn on_change<S: Storage + ?Sized>(
        &mut self,
        storage: &mut S,
        tools: &[ToolInstance],
        now_ms: f64,
    ) -> Schedule {
        if !self.hydrated {
            return Schedule::Nothing;
        }

        let Some(text) = Self::marker(tools) else {
            // Empty list: drop the key instead of storing "[]".
            self.cancel();
            if self.last_saved.is_some() {
                self.remove_key(storage);
            }
            return Schedule::Nothing;
        };

        if self.last_saved.as_deref() == Some(text.as_str()) {
            // Back to the persisted state; anything pending is stale.
            self.cancel();
            return Schedule::Nothing;
        }

        let at_ms = self.debounce.arm(text, now_ms);
        Schedule::Timer { at_ms }
    }

    /// Debounce timer fired. Returns `true` if the host must request an
    /// idle callback that calls `run_idle`.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        match self.debounce.poll(now_ms) {
            Some(text) => self.idle.push(text),
            None => false,
        }
    }

    /// Idle callback: perform the queued write. Returns `true` if a write
    /// happened and succeeded.
    pub fn run_idle<S: Storage + ?Sized>(&mut self, storage: &mut S) -> bool {
        match self.idle.take() {
            Some(text) => self.write(storage, text),
            None => false,
        }
    }

    /// Synchronously persist `tools`, discarding any pending work.
    pub fn flush<S: Storage + ?Sized>(&mut self, storage: &mut S, tools: &[ToolInstance]) -> bool {
        self.cancel();
        match Self::marker(tools) {
            None => {
                if self.last_saved.is_some() {
                    self.remove_key(storage);
                }
                true
            }
            Some(text) if self.last_saved.as_deref() == Some(text.as_str()) => true,
            Some(text) => self.write(storage, text),
        }
    }

    /// Whether `tools` differs from what was last persisted.
    pub fn is_dirty(&self, tools: &[ToolInstance]) -> bool {
        Self::marker(tools) != self.last_saved
    }

    /// Whether a write is waiting in either stage.
    pub fn has_pending(&self) -> bool {
        self.debounce.deadline().is_some() || self.idle.is_pending()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.debounce.deadline()
    }

    /// Remove the stored key and forget the last-saved marker.
    pub fn clear<S: Storage + ?Sized>(&mut self, storage: &mut S) {
        self.cancel();
        self.remove_key(storage);
    }

    /// Drop pending work (unmount).
    pub fn cancel(&mut self) {
        self.debounce.cancel();
        self.idle.clear();
    }

    fn marker(tools: &[ToolInstance]) -> Option<String> {
        if tools.is_empty() {
            return None;
        }
        match encode_snapshot(tools) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("persist: could not serialize tools: {e}");
                None
            }
        }
    }

    fn write<S: Storage + ?Sized>(&mut self, storage: &mut S, text: String) -> bool {
        match storage.set(&self.config.storage_key, &text) {
            Ok(()) => {
                log::debug!("persist: saved {} bytes", text.len());
                self.last_saved = Some(text);
                true
            }
            Err(e) => {
                log::warn!("persist: save failed, continuing in memory: {e}");
                false
            }
        }
    }

    fn remove_key<S: Storage + ?Sized>(&mut self, storage: &mut S) {
        match storage.remove(&self.config.storage_key) {
            Ok(()) => log::debug!("persist: cleared stored tools"),
            Err(e) => log::warn!("persist: clear failed: {e}"),
        }
        self.last_saved = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn debouncer_fires_once_after_quiet_period() {
        let mut d = Debouncer::new(500.0);
        d.arm("a", 0.0);
        d.arm("b", 300.0);
        assert_eq!(d.poll(700.0), None);
        assert_eq!(d.poll(800.0), Some("b"));
        assert_eq!(d.poll(900.0), None);
    }

    #[test]
    fn idle_queue_requests_once() {
        let mut q = IdleQueue::default();
        assert!(q.push(1));
        assert!(!q.push(2));
        assert_eq!(q.take(), Some(2));
        assert_eq!(q.take(), None);
    }

    #[test]
    fn changes_before_hydration_are_ignored() {
        let mut storage = MemoryStorage::new();
        let mut p = PersistenceAdapter::new(PersistConfig::default());
        let tools = vec![ToolInstance {
            id: tc_core::ToolId::intern("early"),
            name: "calculate".into(),
            params: Default::default(),
            position: Default::default(),
        }];
        assert_eq!(p.on_change(&mut storage, &tools, 0.0), Schedule::Nothing);
        assert!(!p.has_pending());
    }

    #[test]
    fn load_treats_garbage_as_empty() {
        for raw in ["not json", "{\"a\":1}", "[]", "7"] {
            let storage = MemoryStorage::with_entry("tool-canvas-state", raw);
            let mut p = PersistenceAdapter::new(PersistConfig::default());
            assert!(p.load(&storage).is_empty(), "raw {raw:?}");
            assert!(p.is_hydrated());
            assert_eq!(p.last_saved(), None);
        }
    }

    #[test]
    fn load_survives_unavailable_storage() {
        let storage = MemoryStorage {
            fail_with: Some(StorageError::Unavailable),
            ..MemoryStorage::default()
        };
        let mut p = PersistenceAdapter::new(PersistConfig::default());
        assert!(p.load(&storage).is_empty());
    }
}
