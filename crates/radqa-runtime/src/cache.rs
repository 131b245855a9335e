//! Completion caching.
//!
//! Caches raw completions keyed by stage, report text, and temperature, so
//! re-running detection over an unchanged report does not re-invoke the
//! generation backend.

use moka::future::Cache;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use radqa_core::StageId;

/// Cache key for one stage invocation.
#[derive(Clone, Debug)]
pub struct CompletionKey {
    stage: StageId,
    report_hash: u64,
    temperature_bits: u32,
}

impl CompletionKey {
    fn new(stage: StageId, report_text: &str, temperature: f32) -> Self {
        Self {
            stage,
            report_hash: hash_text(report_text),
            temperature_bits: temperature.to_bits(),
        }
    }
}

impl Hash for CompletionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.stage.hash(state);
        self.report_hash.hash(state);
        self.temperature_bits.hash(state);
    }
}

impl PartialEq for CompletionKey {
    fn eq(&self, other: &Self) -> bool {
        self.stage == other.stage
            && self.report_hash == other.report_hash
            && self.temperature_bits == other.temperature_bits
    }
}

impl Eq for CompletionKey {}

/// Completion cache using moka.
#[derive(Clone)]
pub struct CompletionCache {
    cache: Cache<CompletionKey, String>,
}

impl CompletionCache {
    /// Create a new cache with the given configuration.
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    /// Get a cached completion.
    pub async fn get(
        &self,
        stage: StageId,
        report_text: &str,
        temperature: f32,
    ) -> Option<String> {
        self.cache
            .get(&CompletionKey::new(stage, report_text, temperature))
            .await
    }

    /// Store a completion.
    pub async fn insert(
        &self,
        stage: StageId,
        report_text: &str,
        temperature: f32,
        completion: String,
    ) {
        self.cache
            .insert(CompletionKey::new(stage, report_text, temperature), completion)
            .await;
    }

    /// Clear the cache.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Number of cached completions.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for CompletionCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

fn hash_text(text: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = CompletionCache::default();
        let report = "FINDINGS: Unremarkable.";

        // Cache miss
        assert!(cache
            .get(StageId::AnatomicalValidation, report, 0.7)
            .await
            .is_none());

        cache
            .insert(
                StageId::AnatomicalValidation,
                report,
                0.7,
                "No errors.".to_string(),
            )
            .await;

        // Cache hit
        let hit = cache.get(StageId::AnatomicalValidation, report, 0.7).await;
        assert_eq!(hit.as_deref(), Some("No errors."));
    }

    #[tokio::test]
    async fn test_key_discriminates_stage_and_temperature() {
        let cache = CompletionCache::default();
        let report = "FINDINGS: Unremarkable.";

        cache
            .insert(StageId::AnatomicalValidation, report, 0.7, "a".to_string())
            .await;

        assert!(cache
            .get(StageId::MeasurementConsistency, report, 0.7)
            .await
            .is_none());
        assert!(cache
            .get(StageId::AnatomicalValidation, report, 0.0)
            .await
            .is_none());
    }
}
