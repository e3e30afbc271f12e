//! Candidate retrieval through provider indexes.

use super::cache::TtlCache;
use super::safety::{IndexableCondition, PruneStrategy};
use super::tree::{FilterOperator, FilterProperty};
use crate::provider::IndexProvider;
use anyhow::Result;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::debug;

pub type PathSet = BTreeSet<String>;

/// Resolves a [`PruneStrategy`] to a set of candidate paths, caching each
/// index lookup under `property:operator:value`.
pub struct CandidateRetriever {
    cache: TtlCache<String, PathSet>,
}

impl CandidateRetriever {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: TtlCache::new(ttl),
        }
    }

    /// Candidate paths for a strategy. Always a superset of the matches.
    pub async fn candidates(
        &self,
        provider: &dyn IndexProvider,
        strategy: &PruneStrategy,
        today: NaiveDate,
    ) -> Result<PathSet> {
        match strategy {
            PruneStrategy::FullScan => all_paths(provider).await,
            PruneStrategy::Single(condition) => self.lookup(provider, condition, today).await,
            PruneStrategy::Intersect(conditions) => {
                let mut result: Option<PathSet> = None;
                for condition in conditions {
                    let paths = self.lookup(provider, condition, today).await?;
                    let narrowed = match result {
                        Some(current) => current.intersection(&paths).cloned().collect(),
                        None => paths,
                    };
                    if narrowed.is_empty() {
                        return Ok(narrowed);
                    }
                    result = Some(narrowed);
                }
                Ok(result.unwrap_or_default())
            }
        }
    }

    /// Paths for one indexable condition, from cache when fresh.
    pub async fn lookup(
        &self,
        provider: &dyn IndexProvider,
        condition: &IndexableCondition,
        today: NaiveDate,
    ) -> Result<PathSet> {
        let key = condition.cache_key(today);
        if let Some(paths) = self.cache.get(&key) {
            debug!("index cache hit: {}", key);
            return Ok(paths);
        }
        debug!("index cache miss: {}", key);

        let value = condition.lookup_value(today);
        let paths: PathSet = match (condition.property, condition.operator) {
            (FilterProperty::Status, _) => {
                provider.get_paths_by_status(&value).await?.into_iter().collect()
            }
            (FilterProperty::Due | FilterProperty::Scheduled, FilterOperator::Is) => {
                provider.get_paths_by_date(&value).await?.into_iter().collect()
            }
            // Range lookups are not indexed; fall back to everything.
            _ => all_paths(provider).await?,
        };

        self.cache.insert(key, paths.clone());
        Ok(paths)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_lookups(&self) -> usize {
        self.cache.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.cache.pending_timers()
    }
}

async fn all_paths(provider: &dyn IndexProvider) -> Result<PathSet> {
    Ok(provider.get_all_paths().await?.into_iter().collect())
}
