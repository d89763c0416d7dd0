// ── Parameterized result cache ──
//
// Process-wide storage for paginated list results. Entries are immutable
// `Arc<CacheEntry>` snapshots; a write for an existing key replaces the
// whole entry. Non-forced misses for the same key are coalesced so
// concurrent callers share a single network request.

mod key;

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use adminkit_api::{ListEnvelope, Record};

use crate::config::CachePolicy;

pub use key::{CacheKey, compute_key};

/// One cached page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub items: Vec<Record>,
    pub total_count: u64,
    /// The full server envelope the entry was built from.
    pub raw: Value,
}

impl CacheEntry {
    /// The result a failed fetch degrades to. Never stored.
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            raw: Value::Null,
        }
    }
}

impl From<ListEnvelope> for CacheEntry {
    fn from(envelope: ListEnvelope) -> Self {
        Self {
            items: envelope.items,
            total_count: envelope.total,
            raw: envelope.raw,
        }
    }
}

/// Hit/miss counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub entries: usize,
}

/// Keyed store of list results with optional LRU bound.
///
/// Reads and writes take a short `std::sync::Mutex`; no lock is held
/// across an await point. Per-key request coalescing uses a `DashMap` of
/// async mutexes that lives only while a load is in flight.
pub struct ResultCache {
    entries: Mutex<IndexMap<CacheKey, Arc<CacheEntry>>>,
    capacity: Option<NonZeroUsize>,
    in_flight: DashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

static SHARED: OnceLock<Arc<ResultCache>> = OnceLock::new();

impl ResultCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: Mutex::new(IndexMap::new()),
            capacity: policy.capacity,
            in_flight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// The process-wide cache (unbounded), created on first use.
    pub fn shared() -> Arc<Self> {
        Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new(CachePolicy::unbounded()))))
    }

    /// Install the process-wide cache with a specific policy.
    ///
    /// Returns `false` if the shared cache already exists.
    pub fn init_shared(policy: CachePolicy) -> bool {
        SHARED.set(Arc::new(Self::new(policy))).is_ok()
    }

    // ── Read / write ─────────────────────────────────────────────────

    /// Look up a key. A hit returns the stored entry itself.
    pub fn read(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let hit = self.lookup(key);
        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(?key, "cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(?key, "cache miss");
        }
        hit
    }

    /// Store an entry, replacing any previous one for the key.
    pub fn write(&self, key: CacheKey, entry: CacheEntry) -> Arc<CacheEntry> {
        let entry = Arc::new(entry);
        let mut entries = self.lock_entries();
        // Re-inserting moves the key to the most-recently-used end.
        entries.shift_remove(&key);
        entries.insert(key, Arc::clone(&entry));

        if let Some(cap) = self.capacity {
            while entries.len() > cap.get() {
                if let Some((evicted, _)) = entries.shift_remove_index(0) {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                    debug!(key = ?evicted, "evicted least recently used entry");
                }
            }
        }
        entry
    }

    /// Return the cached entry for `key`, or run `fetch` and store its
    /// result.
    ///
    /// With `force`, `fetch` always runs. Without it, concurrent callers
    /// for the same uncached key wait for the first one and reuse its
    /// result. Errors are returned as-is and never cached.
    pub async fn load<F, Fut, E>(
        &self,
        key: CacheKey,
        force: bool,
        fetch: F,
    ) -> Result<Arc<CacheEntry>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry, E>>,
    {
        if force {
            let entry = fetch().await?;
            return Ok(self.write(key, entry));
        }

        if let Some(hit) = self.read(&key) {
            return Ok(hit);
        }
        self.fill(key, fetch).await
    }

    /// Fetch and store `key` after the caller's own `read` missed.
    ///
    /// Concurrent fills for the same key are coalesced. Does not touch the
    /// hit/miss counters, so a miss already counted by `read` is not
    /// counted again.
    pub async fn fill<F, Fut, E>(&self, key: CacheKey, fetch: F) -> Result<Arc<CacheEntry>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry, E>>,
    {
        let gate = Arc::clone(self.in_flight.entry(key.clone()).or_default().value());
        let result = {
            let _guard = gate.lock().await;
            // A concurrent load may have filled the key while we waited.
            if let Some(hit) = self.lookup(&key) {
                debug!(?key, "coalesced with in-flight request");
                Ok(hit)
            } else {
                fetch().await.map(|entry| self.write(key.clone(), entry))
            }
        };
        drop(gate);
        self.in_flight
            .remove_if(&key, |_, gate| Arc::strong_count(gate) == 1);
        result
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Drop every entry for `resource`. Returns how many were removed.
    pub fn invalidate_resource(&self, resource: &str) -> usize {
        let mut entries = self.lock_entries();
        let before = entries.len();
        entries.retain(|key, _| key.resource() != resource);
        let removed = before - entries.len();
        debug!(resource, removed, "invalidated cached pages");
        removed
    }

    pub fn clear(&self) {
        self.lock_entries().clear();
    }

    // ── Introspection ────────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn lookup(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        let mut entries = self.lock_entries();
        let index = entries.get_index_of(key)?;
        if self.capacity.is_some() {
            let last = entries.len() - 1;
            entries.move_index(index, last);
            return entries.get_index(last).map(|(_, v)| Arc::clone(v));
        }
        entries.get_index(index).map(|(_, v)| Arc::clone(v))
    }

    fn lock_entries(&self) -> MutexGuard<'_, IndexMap<CacheKey, Arc<CacheEntry>>> {
        // Entries are replaced whole, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(CachePolicy::default())
    }
}
