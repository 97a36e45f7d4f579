//! JSONL-based store implementation with in-memory caching.
//!
//! Each collection is one append-only `.jsonl` file of `{key, value}` lines.
//! Upserts append a new line for the same key; on load the last line for a
//! key wins. Insert-if-absent holds the write lock across the presence check
//! and the file append, which makes it atomic within the process, and the
//! last-wins load rule makes a crash between check and append harmless.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::traits::{InsertOutcome, Store};
use crate::domain::EventRecord;
use crate::error::{ReplyrError, Result};
use crate::id::generate_event_id;

/// Collection name for the append-only event log.
pub const EVENTS_COLLECTION: &str = "events";

#[derive(Serialize, Deserialize)]
struct Line {
    key: String,
    value: Value,
}

#[derive(Default)]
struct Collection {
    /// Latest value per key
    index: HashMap<String, Value>,
    /// Keys in first-insertion order
    order: Vec<String>,
}

impl Collection {
    fn upsert(&mut self, key: &str, value: Value) {
        if self.index.insert(key.to_string(), value).is_none() {
            self.order.push(key.to_string());
        }
    }
}

/// JSONL-backed store with an in-memory cache per collection.
pub struct JsonlStore {
    base_path: PathBuf,
    cache: RwLock<HashMap<String, Collection>>,
}

impl JsonlStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn open(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
        })
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.base_path.join(format!("{}.jsonl", collection))
    }

    /// Load a collection into cache if not already loaded.
    fn ensure_loaded(&self, collection: &str) -> Result<()> {
        {
            let cache = self.cache.read().map_err(|e| ReplyrError::Storage(e.to_string()))?;
            if cache.contains_key(collection) {
                return Ok(());
            }
        }

        let mut cache = self.cache.write().map_err(|e| ReplyrError::Storage(e.to_string()))?;
        if cache.contains_key(collection) {
            return Ok(());
        }

        let mut loaded = Collection::default();
        let path = self.collection_path(collection);
        if path.exists() {
            let file = File::open(&path)?;
            let reader = BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let parsed: Line = serde_json::from_str(&line)?;
                loaded.upsert(&parsed.key, parsed.value);
            }
        }

        cache.insert(collection.to_string(), loaded);
        Ok(())
    }

    /// Append one `{key, value}` line to the collection file.
    fn append_to_file(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        let path = self.collection_path(collection);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let line = Line {
            key: key.to_string(),
            value: value.clone(),
        };
        writeln!(file, "{}", serde_json::to_string(&line)?)?;
        Ok(())
    }
}

impl Store for JsonlStore {
    fn insert_if_absent(&self, collection: &str, key: &str, value: &Value) -> Result<InsertOutcome> {
        self.ensure_loaded(collection)?;

        // Lock held across check and append: one winner per key.
        let mut cache = self.cache.write().map_err(|e| ReplyrError::Storage(e.to_string()))?;
        let coll = cache
            .get_mut(collection)
            .ok_or_else(|| ReplyrError::Storage(format!("Collection not loaded: {}", collection)))?;

        if coll.index.contains_key(key) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        self.append_to_file(collection, key, value)?;
        coll.upsert(key, value.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn get(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(|e| ReplyrError::Storage(e.to_string()))?;
        let coll = cache
            .get(collection)
            .ok_or_else(|| ReplyrError::Storage(format!("Collection not loaded: {}", collection)))?;
        Ok(coll.index.get(key).cloned())
    }

    fn put(&self, collection: &str, key: &str, value: &Value) -> Result<()> {
        self.ensure_loaded(collection)?;

        let mut cache = self.cache.write().map_err(|e| ReplyrError::Storage(e.to_string()))?;
        let coll = cache
            .get_mut(collection)
            .ok_or_else(|| ReplyrError::Storage(format!("Collection not loaded: {}", collection)))?;

        // Append first (source of truth), then update cache
        self.append_to_file(collection, key, value)?;
        coll.upsert(key, value.clone());
        Ok(())
    }

    fn append_event(&self, event: &EventRecord) -> Result<()> {
        let value = serde_json::to_value(event)?;
        self.put(EVENTS_COLLECTION, &generate_event_id(), &value)
    }

    fn list(&self, collection: &str) -> Result<Vec<Value>> {
        self.ensure_loaded(collection)?;

        let cache = self.cache.read().map_err(|e| ReplyrError::Storage(e.to_string()))?;
        let coll = cache
            .get(collection)
            .ok_or_else(|| ReplyrError::Storage(format!("Collection not loaded: {}", collection)))?;
        Ok(coll
            .order
            .iter()
            .filter_map(|k| coll.index.get(k).cloned())
            .collect())
    }
}
