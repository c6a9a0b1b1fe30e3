use crate::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

pub const LEADS_KEY: &str = "mini-seller-console-leads";
pub const OPPORTUNITIES_KEY: &str = "mini-seller-console-opportunities";
pub const FILTERS_KEY: &str = "mini-seller-console-filters";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> AppResult<()>;

    fn remove(&self, key: &str) -> AppResult<()>;

    /// Writes every entry or none of them.
    ///
    /// On a failed write the keys already written are restored to their previous values. If
    /// that restoration fails too the store is left mixed and `Inconsistent` is returned.
    fn put_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        let mut previous = Vec::with_capacity(entries.len());
        for (key, _) in entries {
            previous.push(self.get(key)?);
        }

        for (index, (key, value)) in entries.iter().enumerate() {
            let Err(error) = self.put(key, value) else {
                continue;
            };

            for ((written_key, _), prior) in entries[..index].iter().zip(previous.iter()) {
                let restored = match prior {
                    Some(prior) => self.put(written_key, prior),
                    None => self.remove(written_key),
                };
                if let Err(restore_error) = restored {
                    tracing::error!(
                        key = %written_key,
                        error = %restore_error,
                        "failed to restore key after partial multi-key write"
                    );
                    return Err(AppError::Inconsistent(format!(
                        "write of '{}' failed ({}) and '{}' could not be restored ({})",
                        key, error, written_key, restore_error
                    )));
                }
            }
            return Err(error);
        }
        Ok(())
    }

    /// Removes every key or none of them, with the same restoration rules as `put_many`.
    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        let mut previous = Vec::with_capacity(keys.len());
        for key in keys {
            previous.push(self.get(key)?);
        }

        for (index, key) in keys.iter().enumerate() {
            let Err(error) = self.remove(key) else {
                continue;
            };

            for (removed_key, prior) in keys[..index].iter().zip(previous.iter()) {
                let Some(prior) = prior else {
                    continue;
                };
                if let Err(restore_error) = self.put(removed_key, prior) {
                    tracing::error!(
                        key = %removed_key,
                        error = %restore_error,
                        "failed to restore key after partial multi-key removal"
                    );
                    return Err(AppError::Inconsistent(format!(
                        "removal of '{}' failed ({}) and '{}' could not be restored ({})",
                        key, error, removed_key, restore_error
                    )));
                }
            }
            return Err(error);
        }
        Ok(())
    }
}

/// Loads and decodes a stored value. Unparseable content is treated as absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> AppResult<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str::<T>(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(error) => {
            tracing::warn!(key = %key, error = %error, "discarding unparseable stored value");
            Ok(None)
        }
    }
}

pub fn encode_json<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> AppResult<()> {
    store.put(key, &encode_json(value)?)
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AppError::Internal("memory store mutex poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> AppResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn put_many(&self, entries: &[(&str, String)]) -> AppResult<()> {
        let mut map = self.lock()?;
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> AppResult<()> {
        let mut map = self.lock()?;
        for key in keys {
            map.remove(*key);
        }
        Ok(())
    }
}
