//! Caller-owned extraction cache keyed by content hash.

use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use xref_extractor::{Extraction, Language};

pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    language: Language,
    content_hash: String,
}

/// Hit/miss counters and current size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded LRU of extraction results.
///
/// Entries depend only on language and content, so identical files under
/// different paths share one entry. A cache belongs to one extractor
/// configuration; `clear` it when the privacy prefixes change.
#[derive(Debug)]
pub struct ExtractionCache {
    entries: Mutex<LruCache<CacheKey, Extraction>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ExtractionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl ExtractionCache {
    /// Cache holding at most `capacity` extractions (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Extraction>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, language: Language, content_hash: &str) -> Option<Extraction> {
        let key = CacheKey {
            language,
            content_hash: content_hash.to_string(),
        };
        let found = self.lock().get(&key).cloned();
        let counter = if found.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    pub fn insert(&self, extraction: Extraction) {
        let key = CacheKey {
            language: extraction.language,
            content_hash: extraction.content_hash.clone(),
        };
        self.lock().put(key, extraction);
    }

    /// Drop every entry for `content_hash`. Returns how many were removed.
    pub fn invalidate(&self, content_hash: &str) -> usize {
        let mut entries = self.lock();
        let stale: Vec<CacheKey> = entries
            .iter()
            .filter(|(key, _)| key.content_hash == content_hash)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use xref_extractor::{ExtractorConfig, SymbolExtractor};

    fn extraction(path: &str, src: &str) -> Extraction {
        SymbolExtractor::new(ExtractorConfig::default())
            .unwrap()
            .extract(path, src.as_bytes())
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let cache = ExtractionCache::new(8);
        let first = extraction("a.py", "def f():\n    pass\n");
        let hash = first.content_hash.clone();

        assert!(cache.get(Language::Python, &hash).is_none());
        cache.insert(first.clone());
        assert_eq!(cache.get(Language::Python, &hash), Some(first));
        assert!(cache.get(Language::JavaScript, &hash).is_none());

        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                entries: 1
            }
        );
    }

    #[test]
    fn test_invalidate_and_clear() {
        let cache = ExtractionCache::new(8);
        let a = extraction("a.py", "x = 1\n");
        let b = extraction("b.py", "y = 2\n");
        let a_hash = a.content_hash.clone();
        cache.insert(a);
        cache.insert(b);

        assert_eq!(cache.invalidate(&a_hash), 1);
        assert_eq!(cache.invalidate(&a_hash), 0);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache = ExtractionCache::new(1);
        let a = extraction("a.py", "x = 1\n");
        let b = extraction("b.py", "y = 2\n");
        let a_hash = a.content_hash.clone();
        cache.insert(a);
        cache.insert(b);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(Language::Python, &a_hash).is_none());
    }
}
