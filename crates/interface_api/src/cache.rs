//! Snapshot read cache
//!
//! Aggregate reports are recomputed on read; a short-TTL cache keyed by
//! organization and subject absorbs report-page traffic. Every billing
//! write invalidates the whole organization, so the staleness window only
//! ever covers read-only reporting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

use domain_billing::FinancialSnapshot;

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: Instant,
    snapshot: FinancialSnapshot,
}

/// Per-organization snapshot cache with a fixed TTL
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<(Uuid, Uuid), CacheEntry>>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// A fresh entry for the subject, if one exists
    pub async fn get(&self, organization_id: Uuid, subject_id: Uuid) -> Option<FinancialSnapshot> {
        let entries = self.entries.read().await;
        entries
            .get(&(organization_id, subject_id))
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.snapshot.clone())
    }

    /// Stores a freshly computed snapshot
    pub async fn put(&self, organization_id: Uuid, subject_id: Uuid, snapshot: FinancialSnapshot) {
        let mut entries = self.entries.write().await;
        entries.insert(
            (organization_id, subject_id),
            CacheEntry {
                stored_at: Instant::now(),
                snapshot,
            },
        );
    }

    /// Drops every cached snapshot of an organization
    ///
    /// Called on each billing write for the organization.
    pub async fn invalidate_organization(&self, organization_id: Uuid) {
        let mut entries = self.entries.write().await;
        entries.retain(|(org, _), _| *org != organization_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{Currency, Money};
    use domain_billing::PaymentStanding;

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot {
            expected: Money::zero(Currency::USD),
            collected_tuition: Money::zero(Currency::USD),
            collected_additional: Money::zero(Currency::USD),
            total_due: Money::zero(Currency::USD),
            status: PaymentStanding::NotPaid,
            next_due_date: None,
            overdue_count: 0,
        }
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = SnapshotCache::new(Duration::from_secs(300));
        let org = Uuid::new_v4();
        let subject = Uuid::new_v4();

        cache.put(org, subject, snapshot()).await;
        assert!(cache.get(org, subject).await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_misses() {
        let cache = SnapshotCache::new(Duration::ZERO);
        let org = Uuid::new_v4();
        let subject = Uuid::new_v4();

        cache.put(org, subject, snapshot()).await;
        assert!(cache.get(org, subject).await.is_none());
    }

    #[tokio::test]
    async fn test_write_invalidates_whole_organization() {
        let cache = SnapshotCache::new(Duration::from_secs(300));
        let org = Uuid::new_v4();
        let other_org = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        cache.put(org, a, snapshot()).await;
        cache.put(org, b, snapshot()).await;
        cache.put(other_org, a, snapshot()).await;

        cache.invalidate_organization(org).await;

        assert!(cache.get(org, a).await.is_none());
        assert!(cache.get(org, b).await.is_none());
        assert!(cache.get(other_org, a).await.is_some());
    }
}
