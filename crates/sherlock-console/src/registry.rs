//! Key/value bag for handing selected entities from one view to the next
//! (for example the data source picked on a list page to its edit page).

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sherlock_common::Result;
use tracing::warn;

#[derive(Debug, Default)]
pub struct Registry {
    values: Mutex<HashMap<String, Value>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register<T: Serialize>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.lock().insert(key.into(), value);
        Ok(())
    }

    /// Stored value decoded as `T`. A value of another shape reads as `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().get(key).cloned()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("Registry entry '{}' has unexpected shape: {}", key, e);
                None
            }
        }
    }

    /// Remove and return the value.
    pub fn take<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.lock().remove(key)?;
        serde_json::from_value(value).ok()
    }

    pub fn remove(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}
