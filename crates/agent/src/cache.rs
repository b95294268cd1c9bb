//! Response cache
//!
//! Normalized question -> answer text with a fixed time-to-live. Every key
//! passes through [`normalize`] on the way in, so callers may hand over raw
//! text. Expired entries are dropped lazily on read and by a periodic sweep.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::text::{normalize, tokenize};

/// Keyword families used by the fuzzy lookup, in priority order
const KEYWORD_CATEGORIES: &[(&str, &[&str])] = &[
    ("штраф", &["штраф", "штрафы", "штрафов"]),
    ("машин", &["машин", "машины", "автомобил"]),
    ("оплат", &["оплат", "платеж", "плат"]),
];

/// Words shorter than this never produce a partial match
const PARTIAL_MATCH_MIN_CHARS: usize = 4;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
    /// Insertion order, kept across overwrites
    seq: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub count: usize,
    pub hits: u64,
    pub misses: u64,
    pub key_size_bytes: usize,
    pub value_size_bytes: usize,
}

/// Expiring question -> answer store
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            next_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store `value` under the normalized `key`, replacing any previous value
    pub fn set(&self, key: &str, value: impl Into<String>) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// Store with an explicit lifetime
    pub fn set_with_ttl(&self, key: &str, value: impl Into<String>, ttl: Duration) {
        let key = normalize(key);
        let value = value.into();
        let expires_at = Instant::now() + ttl;

        tracing::debug!(key = %key, "Cache set");

        self.entries
            .entry(key)
            .and_modify(|entry| {
                entry.value = value.clone();
                entry.expires_at = expires_at;
            })
            .or_insert_with(|| CacheEntry {
                value,
                expires_at,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            });
    }

    /// Live value for the normalized `key`
    pub fn get(&self, key: &str) -> Option<String> {
        let key = normalize(key);
        let now = Instant::now();

        // The shard guard must be released before any removal
        let lookup = self
            .entries
            .get(&key)
            .map(|entry| (!entry.is_expired(now)).then(|| entry.value.clone()));

        let found = match lookup {
            Some(Some(value)) => Some(value),
            Some(None) => {
                // May have been refreshed since the read
                self.entries.remove_if(&key, |_, e| e.is_expired(now));
                None
            }
            None => None,
        };

        match found {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "Cache miss");
                None
            }
        }
    }

    /// Remove the entry for the normalized `key`
    pub fn delete(&self, key: &str) -> bool {
        let key = normalize(key);
        let removed = self.entries.remove(&key).is_some();
        tracing::debug!(key = %key, removed, "Cache delete");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
        tracing::info!("Cache cleared");
    }

    /// Live keys in insertion order
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<(u64, String)> = self
            .entries
            .iter()
            .filter(|e| !e.value().is_expired(now))
            .map(|e| (e.value().seq, e.key().clone()))
            .collect();
        keys.sort_unstable_by_key(|(seq, _)| *seq);
        keys.into_iter().map(|(_, key)| key).collect()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };
        for entry in self.entries.iter().filter(|e| !e.value().is_expired(now)) {
            stats.count += 1;
            stats.key_size_bytes += entry.key().len();
            stats.value_size_bytes += entry.value().value.len();
        }
        stats
    }

    /// Drop expired entries, returning their keys
    pub fn evict_expired(&self) -> Vec<String> {
        let now = Instant::now();
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.value().is_expired(now))
            .map(|e| e.key().clone())
            .collect();

        let mut evicted = Vec::with_capacity(expired.len());
        for key in expired {
            if self.entries.remove_if(&key, |_, e| e.is_expired(now)).is_some() {
                tracing::info!(key = %key, "Cache entry expired");
                evicted.push(key);
            }
        }
        evicted
    }

    /// Run [`ResponseCache::evict_expired`] every `interval`
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let evicted = cache.evict_expired();
                if !evicted.is_empty() {
                    tracing::debug!(evicted = evicted.len(), "Cache sweep finished");
                }
            }
        })
    }

    /// Fuzzy lookup of a cached question for the normalized `query`
    pub fn find_similar(&self, query: &str) -> Option<String> {
        find_similar_key(query, &self.keys())
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60))
    }
}

/// Pick the cached key that best answers `query`
///
/// Checks, first match wins:
/// 1. a key whose normalized form equals the query
/// 2. a keyword family present in the query and in a key
/// 3. a query word of at least four characters among a key's words
pub fn find_similar_key(query: &str, keys: &[String]) -> Option<String> {
    if let Some(key) = keys.iter().find(|k| normalize(k) == query) {
        tracing::debug!(query, matched = %key, "Found exact match");
        return Some(key.clone());
    }

    for (category, keywords) in KEYWORD_CATEGORIES {
        if !keywords.iter().any(|kw| query.contains(kw)) {
            continue;
        }
        if let Some(key) = keys
            .iter()
            .find(|k| keywords.iter().any(|kw| k.to_lowercase().contains(kw)))
        {
            tracing::debug!(query, category, matched = %key, "Found keyword match");
            return Some(key.clone());
        }
    }

    let words: Vec<&str> = tokenize(query)
        .into_iter()
        .filter(|w| w.chars().count() >= PARTIAL_MATCH_MIN_CHARS)
        .collect();
    if !words.is_empty() {
        for key in keys {
            let normalized = normalize(key);
            let key_words: HashSet<&str> = tokenize(&normalized).into_iter().collect();
            if words.iter().any(|w| key_words.contains(w)) {
                tracing::debug!(query, matched = %key, "Found partial match");
                return Some(key.clone());
            }
        }
    }

    tracing::debug!(query, "No similar questions found");
    None
}
