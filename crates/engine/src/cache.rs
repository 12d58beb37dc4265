use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory cache of classifier results keyed by content fingerprint.
///
/// Unlike the raw-body fetch cache in the sources crate, entries here are
/// serialized JSON values so both the relevance and extraction
/// classifiers can share one cache type. All access goes through a
/// single mutex, which incidentally serializes writes to the same key —
/// two concurrent fan-out workers racing on an identical fingerprint
/// will not both pay for an oracle call.
pub struct ClassifierCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

struct CacheEntry {
    value: serde_json::Value,
    inserted_at: Instant,
}

impl ClassifierCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<serde_json::Value> {
        let entries = self.entries.lock().expect("cache mutex poisoned");
        let entry = entries.get(fingerprint)?;
        if entry.inserted_at.elapsed() < self.ttl {
            metrics::counter!("classifier.cache.hit").increment(1);
            Some(entry.value.clone())
        } else {
            metrics::counter!("classifier.cache.miss").increment(1);
            None
        }
    }

    pub fn insert(&self, fingerprint: String, value: serde_json::Value) {
        let mut entries = self.entries.lock().expect("cache mutex poisoned");
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        entries.insert(
            fingerprint,
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_after_insert_miss_before() {
        let cache = ClassifierCache::new(Duration::from_secs(3600));
        assert!(cache.get("fp1").is_none());

        cache.insert("fp1".into(), serde_json::json!({"score": 0.8}));
        let hit = cache.get("fp1").unwrap();
        assert_eq!(hit["score"], 0.8);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ClassifierCache::new(Duration::from_millis(1));
        cache.insert("fp1".into(), serde_json::json!({"score": 0.1}));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.get("fp1").is_none());
    }
}
