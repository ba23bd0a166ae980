//! Bounded in-memory cache of successful completions.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use lru::LruCache;
use tokio::time::Instant;

use crate::traits::ResponseFormat;

struct Entry {
    value: String,
    stored_at: Instant,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
}

/// LRU cache keyed by [`ResponseCache::key`]. A capacity of zero disables it.
pub struct ResponseCache {
    inner: Option<Mutex<LruCache<String, Entry>>>,
    ttl: Option<Duration>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A cache that stores nothing.
    pub fn disabled() -> Self {
        Self::new(0, None)
    }

    /// Build a deterministic key. Prompt whitespace is normalized so that
    /// trivially different prompts share an entry.
    pub fn key(
        model: &str,
        system_prompt: Option<&str>,
        prompt: &str,
        format: ResponseFormat,
    ) -> String {
        let normalized = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
        let format = match format {
            ResponseFormat::Text => "text",
            ResponseFormat::Json => "json",
        };
        let system = system_prompt
            .map(|s| {
                let mut hasher = DefaultHasher::new();
                s.hash(&mut hasher);
                format!("{:016x}", hasher.finish())
            })
            .unwrap_or_default();
        format!("{model}\u{1f}{format}\u{1f}{system}\u{1f}{normalized}")
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let Some(inner) = &self.inner else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };
        let mut cache = inner.lock().unwrap_or_else(|e| e.into_inner());

        let expired = match cache.get(key) {
            Some(entry) => self
                .ttl
                .is_some_and(|ttl| entry.stored_at.elapsed() >= ttl),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        if expired {
            cache.pop(key);
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        cache.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: String, value: String) {
        let Some(inner) = &self.inner else {
            return;
        };
        let mut cache = inner.lock().unwrap_or_else(|e| e.into_inner());
        cache.put(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner
            .as_ref()
            .map(|inner| inner.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(inner) = &self.inner {
            inner.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_normalizes_whitespace() {
        let a = ResponseCache::key("m", None, "  what is   gravity? ", ResponseFormat::Json);
        let b = ResponseCache::key("m", None, "what is gravity?", ResponseFormat::Json);
        assert_eq!(a, b);

        let text = ResponseCache::key("m", None, "what is gravity?", ResponseFormat::Text);
        assert_ne!(a, text);
        let other_model = ResponseCache::key("n", None, "what is gravity?", ResponseFormat::Json);
        assert_ne!(a, other_model);
    }

    #[test]
    fn key_covers_the_whole_system_prompt() {
        let tutor = "You are a patient science tutor. Answer in short paragraphs.";
        let poet = "You are a patient science tutor. Answer in rhyming couplets.";
        assert_eq!(tutor.len(), poet.len());

        let a = ResponseCache::key("m", Some(tutor), "tides", ResponseFormat::Text);
        let b = ResponseCache::key("m", Some(poet), "tides", ResponseFormat::Text);
        let c = ResponseCache::key("m", Some(tutor), "tides", ResponseFormat::Text);
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, ResponseCache::key("m", None, "tides", ResponseFormat::Text));
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = ResponseCache::new(2, None);
        cache.insert("a".into(), "1".into());
        cache.insert("b".into(), "2".into());
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        cache.insert("c".into(), "3".into());

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.get("c").as_deref(), Some("3"));
    }

    #[test]
    fn zero_capacity_is_disabled() {
        let cache = ResponseCache::disabled();
        cache.insert("a".into(), "1".into());
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().misses, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire() {
        let cache = ResponseCache::new(4, Some(Duration::from_secs(60)));
        cache.insert("a".into(), "1".into());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(cache.get("a").as_deref(), Some("1"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
    }

    #[test]
    fn clear_empties() {
        let cache = ResponseCache::new(4, None);
        cache.insert("a".into(), "1".into());
        cache.clear();
        assert!(cache.is_empty());
    }
}
