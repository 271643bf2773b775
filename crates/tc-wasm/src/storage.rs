//! `localStorage` as a `tc_editor::Storage` backend.

use tc_editor::{Storage, StorageError};
use wasm_bindgen::{JsCast, JsValue};

/// Browser `localStorage`. Private browsing modes may deny access; every
/// call then fails with `StorageError::Unavailable` and the canvas keeps
/// working in memory.
pub struct LocalStorage {
    inner: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let inner = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if inner.is_none() {
            log::warn!("localStorage unavailable, canvas will not persist");
        }
        Self { inner }
    }

    fn storage(&self) -> Result<&web_sys::Storage, StorageError> {
        self.inner.as_ref().ok_or(StorageError::Unavailable)
    }
}

impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage()?.get_item(key).map_err(classify)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage()?.set_item(key, value).map_err(classify)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.storage()?.remove_item(key).map_err(classify)
    }
}

fn classify(err: JsValue) -> StorageError {
    match err.dyn_into::<web_sys::DomException>() {
        Ok(e) if e.name() == "QuotaExceededError" => StorageError::QuotaExceeded,
        Ok(e) if e.name() == "SecurityError" => StorageError::Unavailable,
        Ok(e) => StorageError::Backend(format!("{}: {}", e.name(), e.message())),
        Err(other) => StorageError::Backend(format!("{other:?}")),
    }
}
