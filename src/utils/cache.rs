// In-process TTL cache for repeated symptom analyses
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

struct CachedEntry {
    value: String,
    stored_at: Instant,
}

lazy_static::lazy_static! {
    static ref CACHE: RwLock<HashMap<String, CachedEntry>> = RwLock::new(HashMap::new());
}

/// Returns the cached value when it is younger than `ttl_secs`.
pub fn get_cached(key: &str, ttl_secs: u64) -> Option<String> {
    let cache = CACHE.read().ok()?;
    let entry = cache.get(key)?;
    if entry.stored_at.elapsed().as_secs() < ttl_secs {
        Some(entry.value.clone())
    } else {
        None
    }
}

pub fn set_cache(key: String, value: String) {
    if let Ok(mut cache) = CACHE.write() {
        cache.insert(key, CachedEntry { value, stored_at: Instant::now() });
    }
}

/// Drops entries older than `ttl_secs`. Called by the hourly cleanup job.
pub fn purge_expired(ttl_secs: u64) -> usize {
    match CACHE.write() {
        Ok(mut cache) => {
            let before = cache.len();
            cache.retain(|_, entry| entry.stored_at.elapsed().as_secs() < ttl_secs);
            before - cache.len()
        }
        Err(_) => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because the cache is a process-wide global and
    // purge_expired(0) would race sibling tests.
    #[test]
    fn test_cache_roundtrip_expiry_and_purge() {
        set_cache("tp:key1".to_string(), "value1".to_string());
        assert_eq!(get_cached("tp:key1", 60), Some("value1".to_string()));
        assert_eq!(get_cached("tp:missing", 60), None);

        // ttl of zero means everything is already stale
        assert_eq!(get_cached("tp:key1", 0), None);

        let purged = purge_expired(0);
        assert!(purged >= 1);
        assert_eq!(get_cached("tp:key1", 3600), None);
    }
}
