//! Session-scoped TTL cache for provider responses.
//!
//! Entries expire lazily: a read past the TTL removes the entry and reports a
//! miss. Nothing sweeps in the background.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Validity of current-conditions and forecast entries
pub const WEATHER_TTL: Duration = Duration::from_secs(60);
/// Validity of geocoding entries
pub const GEOCODE_TTL: Duration = Duration::from_secs(60);

/// Identifies a cached provider response. Keys carry no unit; the
/// whole cache is cleared whenever the unit system changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    CurrentByName(String),
    CurrentById(u64),
    ForecastByName(String),
    ForecastById(u64),
    Geocode { query: String, limit: u32 },
}

impl CacheKey {
    pub fn is_geocode(&self) -> bool {
        matches!(self, Self::Geocode { .. })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CurrentByName(name) => write!(f, "current-{}", name),
            Self::CurrentById(id) => write!(f, "current-id-{}", id),
            Self::ForecastByName(name) => write!(f, "forecast-{}", name),
            Self::ForecastById(id) => write!(f, "forecast-id-{}", id),
            Self::Geocode { query, limit } => write!(f, "geo-{}-{}", query, limit),
        }
    }
}

#[derive(Debug)]
struct CacheEntry<V> {
    payload: V,
    fetched_at: Instant,
}

#[derive(Debug)]
struct Inner<V> {
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Bumped on every clear
    epoch: u64,
}

/// In-memory cache with per-kind time-to-live.
#[derive(Debug)]
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    weather_ttl: Duration,
    geocode_ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::with_ttls(WEATHER_TTL, GEOCODE_TTL)
    }

    pub fn with_ttls(weather_ttl: Duration, geocode_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                epoch: 0,
            }),
            weather_ttl,
            geocode_ttl,
        }
    }

    fn ttl_for(&self, key: &CacheKey) -> Duration {
        if key.is_geocode() {
            self.geocode_ttl
        } else {
            self.weather_ttl
        }
    }

    /// Returns the payload if present and younger than its TTL.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let ttl = self.ttl_for(key);
        let mut inner = self.inner.lock();

        let fresh = inner
            .entries
            .get(key)
            .map(|entry| entry.fetched_at.elapsed() < ttl)?;

        if fresh {
            inner.entries.get(key).map(|entry| entry.payload.clone())
        } else {
            inner.entries.remove(key);
            tracing::debug!("Cache entry expired: {}", key);
            None
        }
    }

    /// Stores `payload` stamped with the current time, replacing any entry.
    pub fn put(&self, key: CacheKey, payload: V) {
        let mut inner = self.inner.lock();
        inner.entries.insert(
            key,
            CacheEntry {
                payload,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Stores `payload` only if the cache has not been cleared since `epoch`
    /// was read. Returns whether the entry was stored.
    pub fn put_if_epoch(&self, key: CacheKey, payload: V, epoch: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            tracing::debug!("Dropping response for {} fetched before a cache clear", key);
            return false;
        }
        inner.entries.insert(
            key,
            CacheEntry {
                payload,
                fetched_at: Instant::now(),
            },
        );
        true
    }

    /// Removes every entry and advances the clear epoch.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.epoch += 1;
    }

    /// Current clear epoch, for use with [`TtlCache::put_if_epoch`].
    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Number of stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
