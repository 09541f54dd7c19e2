//! Prometheus-style counters for the HTTP decision API
//!
//! Lives at the boundary so the decision path itself stays free of shared
//! mutable state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::engine::Decision;

/// Boundary metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct BoundaryMetrics {
    /// Total number of authorization requests
    pub total_requests: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Denials answered with 401
    pub unauthenticated_denials: u64,

    /// Denials answered with 403
    pub forbidden_denials: u64,

    /// Latency percentiles
    pub latency_p50_ms: f64,
    pub latency_p99_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,
}

impl BoundaryMetrics {
    pub fn denied_decisions(&self) -> u64 {
        self.unauthenticated_denials + self.forbidden_denials
    }
}

/// Metrics collector shared by the request handlers
///
/// Recording only bumps counters and appends a sample; percentiles are
/// computed when a snapshot is taken.
pub struct MetricsCollector {
    /// Decision counters; latency fields are filled in by `get_metrics`
    metrics: Arc<RwLock<BoundaryMetrics>>,

    /// Latency samples for percentile calculation
    latency_samples: Arc<RwLock<Vec<f64>>>,

    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(BoundaryMetrics::default())),
            latency_samples: Arc::new(RwLock::new(Vec::with_capacity(10_000))),
            max_samples: 10_000,
        }
    }

    /// Record an authorization decision
    pub async fn record_decision(&self, decision: &Decision) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;

        match decision.deny_reason() {
            None => metrics.allowed_decisions += 1,
            Some(reason) if reason.is_unauthenticated() => metrics.unauthenticated_denials += 1,
            Some(_) => metrics.forbidden_denials += 1,
        }
    }

    /// Record request latency
    pub async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            samples.drain(0..1_000);
        }
    }

    /// Get current metrics snapshot
    pub async fn get_metrics(&self) -> BoundaryMetrics {
        let mut snapshot = self.metrics.read().await.clone();

        let mut sorted = self.latency_samples.read().await.clone();
        if sorted.is_empty() {
            return snapshot;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        snapshot.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        snapshot.latency_p50_ms = Self::percentile(&sorted, 0.50);
        snapshot.latency_p99_ms = Self::percentile(&sorted, 0.99);
        snapshot
    }

    /// Export metrics in Prometheus format
    pub async fn export_prometheus(&self, uptime_seconds: u64) -> String {
        let metrics = self.get_metrics().await;

        format!(
            r#"# HELP fitcoach_authz_uptime_seconds Server uptime in seconds
# TYPE fitcoach_authz_uptime_seconds gauge
fitcoach_authz_uptime_seconds {}

# HELP fitcoach_authz_requests_total Total number of authorization requests
# TYPE fitcoach_authz_requests_total counter
fitcoach_authz_requests_total {}

# HELP fitcoach_authz_allowed_total Number of allowed decisions
# TYPE fitcoach_authz_allowed_total counter
fitcoach_authz_allowed_total {}

# HELP fitcoach_authz_denied_total Number of denied decisions by outcome
# TYPE fitcoach_authz_denied_total counter
fitcoach_authz_denied_total{{outcome="unauthenticated"}} {}
fitcoach_authz_denied_total{{outcome="forbidden"}} {}

# HELP fitcoach_authz_latency_seconds Request latency percentiles
# TYPE fitcoach_authz_latency_seconds summary
fitcoach_authz_latency_seconds{{quantile="0.5"}} {}
fitcoach_authz_latency_seconds{{quantile="0.99"}} {}
"#,
            uptime_seconds,
            metrics.total_requests,
            metrics.allowed_decisions,
            metrics.unauthenticated_denials,
            metrics.forbidden_denials,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
        )
    }

    /// Calculate percentile from sorted data
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }

        let idx = ((sorted.len() as f64) * p) as usize;
        let idx = idx.min(sorted.len() - 1);
        sorted[idx]
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{DenyReason, FailedCheck};
    use crate::predicate::Predicate;
    use crate::scope::RowFilter;

    #[tokio::test]
    async fn test_record_decision() {
        let collector = MetricsCollector::new();

        collector.record_decision(&Decision::allow(RowFilter::Unrestricted)).await;
        collector
            .record_decision(&Decision::deny(DenyReason::Unauthenticated {
                check: FailedCheck::Predicate(Predicate::IsAuthenticated),
            }))
            .await;
        collector
            .record_decision(&Decision::deny(DenyReason::Forbidden {
                check: FailedCheck::RowScope,
            }))
            .await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.allowed_decisions, 1);
        assert_eq!(metrics.unauthenticated_denials, 1);
        assert_eq!(metrics.forbidden_denials, 1);
        assert_eq!(metrics.denied_decisions(), 2);
    }

    #[tokio::test]
    async fn test_record_latency() {
        let collector = MetricsCollector::new();

        collector.record_latency(Duration::from_millis(5)).await;
        collector.record_latency(Duration::from_millis(10)).await;
        collector.record_latency(Duration::from_millis(15)).await;

        let metrics = collector.get_metrics().await;
        assert!((metrics.avg_latency_ms - 10.0).abs() < 1.0);
        assert!(metrics.latency_p99_ms >= metrics.latency_p50_ms);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let collector = MetricsCollector::new();
        collector.record_decision(&Decision::allow(RowFilter::OwnedOnly)).await;

        let prometheus = collector.export_prometheus(12).await;
        assert!(prometheus.contains("fitcoach_authz_requests_total 1"));
        assert!(prometheus.contains("fitcoach_authz_allowed_total 1"));
        assert!(prometheus.contains("fitcoach_authz_uptime_seconds 12"));
    }

    #[tokio::test]
    async fn test_latency_percentiles_computed_on_read() {
        let collector = MetricsCollector::new();
        assert_eq!(collector.get_metrics().await.latency_p50_ms, 0.0);

        for _ in 0..4 {
            collector.record_latency(Duration::from_millis(250)).await;
        }
        collector.record_latency(Duration::from_millis(500)).await;

        let metrics = collector.get_metrics().await;
        assert_eq!(metrics.latency_p50_ms, 250.0);
        assert_eq!(metrics.latency_p99_ms, 500.0);

        let prometheus = collector.export_prometheus(0).await;
        assert!(prometheus.contains(r#"fitcoach_authz_latency_seconds{quantile="0.5"} 0.25"#));
        assert!(prometheus.contains(r#"fitcoach_authz_latency_seconds{quantile="0.99"} 0.5"#));
    }

    #[tokio::test]
    async fn test_samples_capped() {
        let collector = MetricsCollector::new();
        for _ in 0..=collector.max_samples {
            collector.record_latency(Duration::from_millis(1)).await;
        }
        assert!(collector.latency_samples.read().await.len() <= collector.max_samples);
    }
}
