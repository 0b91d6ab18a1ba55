//! In-memory `CacheStore` used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::db::CacheStore;
use crate::error::CacheError;

/// Every write that reached the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Set(String, String),
    Mset(Vec<(String, String)>),
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<Write>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, key: &str, value: &str) -> Self {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn mset_sizes(&self) -> Vec<usize> {
        self.writes()
            .iter()
            .filter_map(|w| match w {
                Write::Mset(batch) => Some(batch.len()),
                Write::Set(..) => None,
            })
            .collect()
    }

    /// `set` calls targeting `key`, oldest first.
    pub fn sets_of(&self, key: &str) -> Vec<String> {
        self.writes()
            .iter()
            .filter_map(|w| match w {
                Write::Set(k, v) if k == key => Some(v.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CacheError::Backend("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.check_writable()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        self.writes
            .lock()
            .unwrap()
            .push(Write::Set(key.to_string(), value.to_string()));
        Ok(())
    }

    async fn mset(&self, entries: &[(String, String)]) -> Result<(), CacheError> {
        self.check_writable()?;
        let mut map = self.entries.lock().unwrap();
        for (k, v) in entries {
            map.insert(k.clone(), v.clone());
        }
        self.writes
            .lock()
            .unwrap()
            .push(Write::Mset(entries.to_vec()));
        Ok(())
    }
}
