//! Durable key-value storage used to persist flow bodies and the flow catalog.
//!
//! Keys and values are strings; values are JSON. Flow bodies are stored under the flow's id.
//! Corrupt entries are removed on read so they cannot fail repeatedly.

use crate::constants::FLOW_ID_PREFIX;
use crate::error::StorageError;
use crate::types::FlowState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// String-keyed durable storage.
pub trait KeyValueStore {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage backed by an ordered map.
///
/// The UI shell seeds one of these from eframe's persisted app state at startup and writes the
/// whole map back when eframe asks it to save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a map previously produced by [`MemoryStorage::to_json`].
    ///
    /// Unreadable input yields an empty storage.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(entries) => Self { entries },
            Err(err) => {
                log::error!("Discarding unreadable persisted storage: {err}");
                Self::default()
            }
        }
    }

    /// Serializes every entry into a single JSON object.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.entries)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Returns true for ids of flows that are backed by storage (as opposed to the placeholder).
pub fn is_persistable_flow_id(id: &str) -> bool {
    id.starts_with(FLOW_ID_PREFIX) && id.len() > FLOW_ID_PREFIX.len()
}

/// Reads and parses the JSON value under `key`.
///
/// A value that fails to parse is logged and removed from storage, and reads as absent.
pub fn read_json<T: DeserializeOwned>(storage: &mut dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            log::error!("Corrupt data under storage key '{key}', removing it: {err}");
            if let Err(remove_err) = storage.remove(key) {
                log::error!("Failed to remove corrupt key '{key}': {remove_err}");
            }
            None
        }
    }
}

/// Serializes `value` as JSON and stores it under `key`.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, json)
}

/// Loads the persisted body of flow `flow_id`.
pub fn load_flow(storage: &mut dyn KeyValueStore, flow_id: &str) -> Option<FlowState> {
    read_json(storage, flow_id)
}

/// Writes a flow body under its id. Placeholder flows are skipped.
///
/// # Returns
///
/// `Ok(true)` if the flow was written, `Ok(false)` if it is not persistable.
pub fn save_flow(storage: &mut dyn KeyValueStore, flow: &FlowState) -> Result<bool, StorageError> {
    if !is_persistable_flow_id(&flow.id) {
        return Ok(false);
    }
    write_json(storage, &flow.id, flow)?;
    log::debug!("Persisted flow '{}' ({} nodes, {} edges)", flow.id, flow.nodes.len(), flow.edges.len());
    Ok(true)
}

/// Removes a persisted flow body.
pub fn delete_flow(storage: &mut dyn KeyValueStore, flow_id: &str) -> Result<(), StorageError> {
    storage.remove(flow_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistable_ids() {
        assert!(is_persistable_flow_id("flow_123"));
        assert!(!is_persistable_flow_id("flow_"));
        assert!(!is_persistable_flow_id("placeholder"));
        assert!(!is_persistable_flow_id(""));
    }

    #[test]
    fn test_save_and_load_flow() {
        let mut storage = MemoryStorage::new();
        let flow = FlowState::empty("flow_a", "A", "first", "pf.AsyncFlow");

        assert!(save_flow(&mut storage, &flow).unwrap());
        assert_eq!(load_flow(&mut storage, "flow_a"), Some(flow));
    }

    #[test]
    fn test_placeholder_is_not_saved() {
        let mut storage = MemoryStorage::new();
        let flow = FlowState::placeholder();

        assert!(!save_flow(&mut storage, &flow).unwrap());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_corrupt_entry_is_removed_on_read() {
        let mut storage = MemoryStorage::new();
        storage.set("flow_bad", "{not json".to_string()).unwrap();

        assert!(load_flow(&mut storage, "flow_bad").is_none());
        assert!(!storage.contains_key("flow_bad"));
    }

    #[test]
    fn test_memory_storage_json_roundtrip() {
        let mut storage = MemoryStorage::new();
        storage.set("k1", "v1".to_string()).unwrap();
        storage.set("k2", "[1,2]".to_string()).unwrap();

        let restored = MemoryStorage::from_json(&storage.to_json().unwrap());
        assert_eq!(restored, storage);
        assert!(MemoryStorage::from_json("garbage").is_empty());
    }
}
