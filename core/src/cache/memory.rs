//! In-process store backend
//!
//! Suitable for single-process hosts and tests. Expiry uses tokio's clock, so
//! tests running with paused time can advance past a TTL deterministically.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::errors::CacheError;

use super::KeyValueStore;

#[derive(Debug)]
enum Slot {
    Text(String),
    List(VecDeque<String>),
}

#[derive(Debug)]
struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// Mutex-guarded map with per-key expiry
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    unavailable: AtomicBool,
    operations: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with [`CacheError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of store operations attempted so far
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.lock()
            .map(|entries| entries.get(key).map(|e| !e.is_expired(now)).unwrap_or(false))
            .unwrap_or(false)
    }

    fn begin(&self) -> Result<(), CacheError> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable {
                message: "memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.entries.lock().map_err(|_| CacheError::Backend {
            message: "memory store lock poisoned".to_string(),
        })
    }

    /// Lock the map with expired entries already evicted from `key`
    fn live(&self, key: &str) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, CacheError> {
        self.begin()?;
        let mut entries = self.lock()?;
        let now = Instant::now();
        if entries.get(key).map(|e| e.is_expired(now)).unwrap_or(false) {
            entries.remove(key);
        }
        Ok(entries)
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::Backend {
        message: format!("wrong value type at key {}", key),
    }
}

/// Resolve an inclusive, possibly negative, index pair against `len`
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.live(key)?;
        let expires_at = (!ttl.is_zero()).then(|| Instant::now() + ttl);
        entries.insert(
            key.to_string(),
            Entry {
                slot: Slot::Text(value.to_string()),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.live(key)?;
        match entries.get(key) {
            None => Ok(None),
            Some(Entry { slot: Slot::Text(value), .. }) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut entries = self.live(key)?;
        Ok(entries.remove(key).is_some())
    }

    async fn incr_with_expiry(&self, key: &str, window: Duration) -> Result<i64, CacheError> {
        let mut entries = self.live(key)?;
        match entries.get_mut(key) {
            None => {
                entries.insert(
                    key.to_string(),
                    Entry {
                        slot: Slot::Text("1".to_string()),
                        expires_at: Some(Instant::now() + window),
                    },
                );
                Ok(1)
            }
            Some(Entry { slot: Slot::Text(value), .. }) => {
                let count = value.parse::<i64>().map_err(|_| CacheError::Backend {
                    message: format!("value at {} is not an integer", key),
                })? + 1;
                *value = count.to_string();
                Ok(count)
            }
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.live(key)?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            slot: Slot::List(VecDeque::new()),
            expires_at: None,
        });
        match &mut entry.slot {
            Slot::List(items) => {
                items.push_front(value.to_string());
                Ok(())
            }
            Slot::Text(_) => Err(wrong_type(key)),
        }
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, CacheError> {
        let entries = self.live(key)?;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry { slot: Slot::List(items), .. }) => Ok(resolve_range(items.len(), start, stop)
                .map(|(from, to)| items.range(from..=to).cloned().collect())
                .unwrap_or_default()),
            Some(_) => Err(wrong_type(key)),
        }
    }
}
