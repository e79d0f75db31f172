//! In-process TTL cache, partitioned into independent named pools.
//!
//! Each pool carries its own default time-to-live and its own flush scope,
//! so dropping every event-list entry cannot evict booking or profile
//! entries. Values are stored as JSON strings and decoded on read, which
//! keeps the pools generic over whatever the read paths cache.

use crate::config::CacheConfig;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::{interval, Duration, Instant};
use tracing::{debug, info};

pub mod bookings;
pub mod events;
pub mod profiles;

struct Entry {
    data: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
}

impl PoolStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// One isolated cache namespace.
#[derive(Clone)]
pub struct CachePool {
    name: &'static str,
    default_ttl: Duration,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CachePool {
    pub fn new(name: &'static str, default_ttl: Duration) -> Self {
        CachePool {
            name,
            default_ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Look up a key. An entry past its expiry is never returned; the
    /// read removes it.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                let value = serde_json::from_str(&entry.data).ok();
                if value.is_some() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                }
                value
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(_) => return, // unserializable value is simply not cached
        };
        let entry = Entry {
            data,
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().unwrap().insert(key.to_string(), entry);
    }

    /// Explicit invalidation.
    pub fn delete(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
    }

    /// Drop every entry in the pool. Used when a relationship changes
    /// that would otherwise require enumerating many keys.
    pub fn flush(&self) {
        let mut entries = self.entries.lock().unwrap();
        let dropped = entries.len();
        entries.clear();
        debug!("flushed {} entries from {} pool", dropped, self.name);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove expired entries to bound memory. Returns how many were
    /// dropped. Expiry itself is enforced on read; the sweep only cleans
    /// up behind unread keys.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            keys: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// The three pools the core works with: event data, booking data and
/// user profiles.
#[derive(Clone)]
pub struct CacheService {
    pub events: CachePool,
    pub bookings: CachePool,
    pub profiles: CachePool,
    sweep_intervals: [Duration; 3],
}

impl CacheService {
    pub fn new(config: &CacheConfig) -> Self {
        CacheService {
            events: CachePool::new("events", Duration::from_secs(config.event_ttl_secs)),
            bookings: CachePool::new("bookings", Duration::from_secs(config.booking_ttl_secs)),
            profiles: CachePool::new("profiles", Duration::from_secs(config.profile_ttl_secs)),
            sweep_intervals: [
                Duration::from_secs(config.event_sweep_secs),
                Duration::from_secs(config.booking_sweep_secs),
                Duration::from_secs(config.profile_sweep_secs),
            ],
        }
    }

    /// Start one background sweep task per pool. Sweep intervals are
    /// independent of (and coarser than) entry TTLs.
    pub fn spawn_sweepers(&self) {
        let pools = [
            (self.events.clone(), self.sweep_intervals[0]),
            (self.bookings.clone(), self.sweep_intervals[1]),
            (self.profiles.clone(), self.sweep_intervals[2]),
        ];
        for (pool, every) in pools {
            tokio::spawn(async move {
                let mut ticker = interval(every);
                ticker.tick().await; // first tick fires immediately
                loop {
                    ticker.tick().await;
                    let dropped = pool.sweep();
                    if dropped > 0 {
                        debug!("sweep dropped {} expired entries from {} pool", dropped, pool.name);
                    }
                }
            });
        }
        info!("cache sweepers started");
    }

    /// Clear all caches (useful for testing or maintenance).
    pub fn clear_all(&self) {
        self.events.flush();
        self.bookings.flush();
        self.profiles.flush();
    }

    pub fn stats(&self) -> (PoolStats, PoolStats, PoolStats) {
        (
            self.events.stats(),
            self.bookings.stats(),
            self.profiles.stats(),
        )
    }
}
