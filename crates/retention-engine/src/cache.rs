//! Dataset cache keyed by content hash.
//!
//! A session that lets users upload data keeps the parsed dataset here instead
//! of in ambient global state. Entries are keyed by the SHA-256 digest of the
//! raw uploaded bytes, so re-uploading identical bytes is a hit and any change
//! to the bytes is a miss. Replacing a dataset is an explicit
//! [`DatasetCache::invalidate`].
//!
//! The cache is owned by one session and is not shared; it takes `&mut self`
//! and does no locking.

use std::{collections::HashMap, fmt, sync::Arc};

use sha2::{Digest as _, Sha256};

const DEFAULT_CAPACITY: usize = 8;

/// SHA-256 digest of a dataset's raw bytes, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetKey(String);

impl DatasetKey {
    /// # Examples
    ///
    /// ```
    /// use retention_engine::cache::DatasetKey;
    ///
    /// let key = DatasetKey::from_bytes(b"");
    /// assert_eq!(
    ///     key.as_str(),
    ///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    /// );
    /// ```
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex digits, for display.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug)]
struct Entry<T> {
    value: Arc<T>,
    last_used: u64,
}

/// Bounded cache of parsed datasets with least-recently-used eviction.
#[derive(Debug)]
pub struct DatasetCache<T> {
    entries: HashMap<DatasetKey, Entry<T>>,
    capacity: usize,
    clock: u64,
    hits: u64,
    misses: u64,
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<T> DatasetCache<T> {
    /// Creates a cache holding at most `capacity` datasets (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Looks up a dataset, counting a hit or a miss.
    pub fn get(&mut self, key: &DatasetKey) -> Option<Arc<T>> {
        let now = self.tick();
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_used = now;
            self.hits += 1;
            Some(Arc::clone(&entry.value))
        } else {
            self.misses += 1;
            None
        }
    }

    /// Stores a dataset, evicting the least recently used one when full.
    pub fn insert(&mut self, key: DatasetKey, value: T) -> Arc<T> {
        let now = self.tick();
        if !self.entries.contains_key(&key)
            && self.entries.len() >= self.capacity
            && let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest);
            tracing::debug!(evicted = oldest.short(), "dataset cache eviction");
        }

        let value = Arc::new(value);
        self.entries.insert(
            key,
            Entry {
                value: Arc::clone(&value),
                last_used: now,
            },
        );
        value
    }

    /// Returns the cached dataset for `key`, or builds, stores, and returns it.
    ///
    /// A failing `build` leaves the cache unchanged.
    pub fn get_or_try_insert_with<E, F>(&mut self, key: &DatasetKey, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(key) {
            tracing::debug!(key = key.short(), "dataset cache hit");
            return Ok(value);
        }
        let value = build()?;
        tracing::debug!(key = key.short(), "dataset cache miss, stored");
        Ok(self.insert(key.clone(), value))
    }

    /// Drops the dataset for `key`. Returns whether it was cached.
    pub fn invalidate(&mut self, key: &DatasetKey) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &DatasetKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }
}
