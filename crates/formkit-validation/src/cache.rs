//! Bounded TTL cache for validation results

use crate::result::{FormValidationResult, ValidationResult};
use crate::ValidationConfig;
use moka::sync::Cache;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Validation result cache with per-kind lifetimes.
///
/// Entries expire by TTL and the oldest are evicted at capacity. Rule changes
/// do not invalidate entries; a stale result lives at most one TTL.
pub struct ValidationCache {
    fields: Cache<String, ValidationResult>,
    forms: Cache<String, FormValidationResult>,
}

impl ValidationCache {
    /// Caches holding at most `capacity` entries each
    pub fn new(capacity: u64, field_ttl: Duration, form_ttl: Duration) -> Self {
        Self {
            fields: Cache::builder().max_capacity(capacity).time_to_live(field_ttl).build(),
            forms: Cache::builder().max_capacity(capacity).time_to_live(form_ttl).build(),
        }
    }

    /// Caches sized and timed from `config`
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(
            config.cache_capacity,
            Duration::from_millis(config.field_cache_ttl_ms),
            Duration::from_millis(config.form_cache_ttl_ms),
        )
    }

    /// Deterministic digest of (kind, id, value, context).
    ///
    /// Object keys are hashed in sorted order, so equal inputs give equal keys.
    pub fn key(kind: &str, id: &str, value: &Value, context: &Value) -> String {
        let mut hasher = Sha256::new();
        for part in [kind, id] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hash_canonical(&mut hasher, value);
        hasher.update([0u8]);
        hash_canonical(&mut hasher, context);
        hex::encode(hasher.finalize())
    }

    /// Cached field result, if still fresh
    #[inline]
    pub fn get_field(&self, key: &str) -> Option<ValidationResult> {
        self.fields.get(key)
    }

    /// Store a field result
    #[inline]
    pub fn insert_field(&self, key: String, result: ValidationResult) {
        self.fields.insert(key, result);
    }

    /// Cached form result, if still fresh
    #[inline]
    pub fn get_form(&self, key: &str) -> Option<FormValidationResult> {
        self.forms.get(key)
    }

    /// Store a form result
    #[inline]
    pub fn insert_form(&self, key: String, result: FormValidationResult) {
        self.forms.insert(key, result);
    }

    /// Drop every cached result
    pub fn clear(&self) {
        self.fields.invalidate_all();
        self.forms.invalidate_all();
    }

    /// Approximate number of cached entries
    pub fn len(&self) -> u64 {
        self.fields.entry_count() + self.forms.entry_count()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn hash_canonical(hasher: &mut Sha256, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            hasher.update(b"{");
            for key in keys {
                hasher.update(Value::String(key.clone()).to_string().as_bytes());
                hasher.update(b":");
                hash_canonical(hasher, &map[key.as_str()]);
                hasher.update(b",");
            }
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for item in items {
                hash_canonical(hasher, item);
                hasher.update(b",");
            }
            hasher.update(b"]");
        }
        scalar => hasher.update(scalar.to_string().as_bytes()),
    }
}

impl Default for ValidationCache {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ValidationIssue;
    use serde_json::json;

    #[test]
    fn test_key_is_deterministic() {
        let a = ValidationCache::key("field", "name", &json!("Ada"), &json!({"x": 1, "y": 2}));
        let b = ValidationCache::key("field", "name", &json!("Ada"), &json!({"y": 2, "x": 1}));
        let c = ValidationCache::key("field", "name", &json!("Bob"), &json!({"x": 1, "y": 2}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_field_entries_expire() {
        let cache = ValidationCache::new(100, Duration::from_millis(50), Duration::from_millis(50));
        let result = ValidationResult::invalid(ValidationIssue::error("required", "Name is required"));
        cache.insert_field("k".into(), result.clone());
        assert_eq!(cache.get_field("k"), Some(result));

        std::thread::sleep(Duration::from_millis(120));
        assert!(cache.get_field("k").is_none());
    }
}
