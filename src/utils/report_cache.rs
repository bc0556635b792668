use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

use crate::report::assemble::AttendanceReport;

/// Process-wide report cache, injected into handlers as
/// `web::Data<dyn ReportCache>`.
#[async_trait]
pub trait ReportCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<Arc<AttendanceReport>>;
    async fn set(&self, key: String, report: Arc<AttendanceReport>);
    /// Drops every cached report, e.g. after attendance changed.
    async fn invalidate_all(&self);
}

pub struct MokaReportCache {
    cache: Cache<String, Arc<AttendanceReport>>,
}

impl MokaReportCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }
}

#[async_trait]
impl ReportCache for MokaReportCache {
    async fn get(&self, key: &str) -> Option<Arc<AttendanceReport>> {
        self.cache.get(key).await
    }

    async fn set(&self, key: String, report: Arc<AttendanceReport>) {
        self.cache.insert(key, report).await;
    }

    async fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

/// Never stores anything.
pub struct NoopReportCache;

#[async_trait]
impl ReportCache for NoopReportCache {
    async fn get(&self, _key: &str) -> Option<Arc<AttendanceReport>> {
        None
    }

    async fn set(&self, _key: String, _report: Arc<AttendanceReport>) {}

    async fn invalidate_all(&self) {}
}

/// Caching is opt-in: a cached report can trail the store by up to the TTL.
pub const DEFAULT_REPORT_CACHE_TTL_SECS: u64 = 0;

/// Picks the implementation from config; a zero TTL disables caching.
pub fn build_report_cache(capacity: u64, ttl_secs: u64) -> Arc<dyn ReportCache> {
    if ttl_secs == 0 || capacity == 0 {
        tracing::info!("Report cache disabled");
        Arc::new(NoopReportCache)
    } else {
        tracing::info!(capacity, ttl_secs, "Report cache enabled");
        Arc::new(MokaReportCache::new(capacity, Duration::from_secs(ttl_secs)))
    }
}
