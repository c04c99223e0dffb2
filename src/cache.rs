//! Explicit report memoization. The engines themselves are stateless; this
//! cache is the one place re-invocation is suppressed, keyed by a content
//! hash of the full generation input. The caller states the staleness
//! policy instead of inheriting framework defaults.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::fallback::Generated;
use crate::types::{OutfitReport, StyleForm};
use crate::utils::hash_content;

/// Staleness policy, stated explicitly by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Entries live for the process lifetime (subject to LRU eviction)
    Session,
    Ttl(Duration),
}

struct Entry {
    report: Generated<OutfitReport>,
    stored_at: Instant,
}

pub struct ReportCache {
    entries: Mutex<LruCache<String, Entry>>,
    policy: CachePolicy,
}

impl ReportCache {
    pub fn new(max_entries: usize, policy: CachePolicy) -> Self {
        let cap = NonZeroUsize::new(max_entries.max(1)).expect("max(1) is non-zero");
        Self {
            entries: Mutex::new(LruCache::new(cap)),
            policy,
        }
    }

    /// Content hash of the full generation input. Serializing through
    /// serde_json::Value sorts object keys, so logically equal inputs hash
    /// identically regardless of map iteration order.
    pub fn key(form: &StyleForm) -> String {
        let canonical = serde_json::to_value(form)
            .map(|v| v.to_string())
            .unwrap_or_default();
        hash_content(&canonical)
    }

    pub async fn get(&self, form: &StyleForm) -> Option<Generated<OutfitReport>> {
        let key = Self::key(form);
        let mut entries = self.entries.lock().await;
        let stale = match entries.get(&key) {
            None => return None,
            Some(entry) => match self.policy {
                CachePolicy::Session => false,
                CachePolicy::Ttl(ttl) => entry.stored_at.elapsed() > ttl,
            },
        };
        if stale {
            entries.pop(&key);
            return None;
        }
        entries.get(&key).map(|e| e.report.clone())
    }

    /// Insert or overwrite; "regenerate" flows end here after bypassing get
    pub async fn put(&self, form: &StyleForm, report: Generated<OutfitReport>) {
        let key = Self::key(form);
        let mut entries = self.entries.lock().await;
        entries.put(
            key,
            Entry {
                report,
                stored_at: Instant::now(),
            },
        );
    }
}
