//! Resolution metrics for observability

use std::time::Duration;
use tokio::sync::RwLock;

/// Snapshot of resolver counters
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Single-identity resolutions that completed
    pub single_resolutions: u64,

    /// Bulk resolutions that completed
    pub bulk_resolutions: u64,

    /// Identities resolved across all calls
    pub identities_resolved: u64,

    /// Resolutions aborted by the role directory
    pub role_directory_failures: u64,

    /// Resolutions aborted by a resource provider
    pub provider_failures: u64,

    /// Latency percentiles of completed resolutions
    pub latency_p50_ms: f64,
    pub latency_p90_ms: f64,
    pub latency_p99_ms: f64,

    /// Average latency
    pub avg_latency_ms: f64,
}

impl EngineMetrics {
    /// Share of resolutions that failed
    pub fn failure_rate(&self) -> f64 {
        let failures = self.role_directory_failures + self.provider_failures;
        let total = self.single_resolutions + self.bulk_resolutions + failures;
        if total == 0 {
            0.0
        } else {
            failures as f64 / total as f64
        }
    }
}

/// Which collaborator aborted a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    RoleDirectory,
    ResourceProvider,
}

/// Metrics collector
pub struct MetricsCollector {
    metrics: RwLock<EngineMetrics>,

    /// Latency samples for percentile calculation
    latency_samples: RwLock<Vec<f64>>,

    /// Maximum samples to keep
    max_samples: usize,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(EngineMetrics::default()),
            latency_samples: RwLock::new(Vec::with_capacity(1_024)),
            max_samples: 10_000,
        }
    }

    /// Record a completed single-identity resolution
    pub async fn record_single(&self, latency: Duration) {
        {
            let mut metrics = self.metrics.write().await;
            metrics.single_resolutions += 1;
            metrics.identities_resolved += 1;
        }
        self.record_latency(latency).await;
    }

    /// Record a completed bulk resolution of `identities`
    pub async fn record_bulk(&self, identities: usize, latency: Duration) {
        {
            let mut metrics = self.metrics.write().await;
            metrics.bulk_resolutions += 1;
            metrics.identities_resolved += identities as u64;
        }
        self.record_latency(latency).await;
    }

    /// Record an aborted resolution
    pub async fn record_failure(&self, kind: FailureKind) {
        let mut metrics = self.metrics.write().await;
        match kind {
            FailureKind::RoleDirectory => metrics.role_directory_failures += 1,
            FailureKind::ResourceProvider => metrics.provider_failures += 1,
        }
    }

    async fn record_latency(&self, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;

        let mut samples = self.latency_samples.write().await;
        samples.push(latency_ms);

        // Keep only recent samples
        if samples.len() > self.max_samples {
            let excess = samples.len() - self.max_samples;
            samples.drain(0..excess);
        }

        let mut sorted = samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut metrics = self.metrics.write().await;
        metrics.avg_latency_ms = sorted.iter().sum::<f64>() / sorted.len() as f64;
        metrics.latency_p50_ms = Self::percentile(&sorted, 0.50);
        metrics.latency_p90_ms = Self::percentile(&sorted, 0.90);
        metrics.latency_p99_ms = Self::percentile(&sorted, 0.99);
    }

    /// Current metrics snapshot
    pub async fn get_metrics(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    /// Export metrics in Prometheus text format
    pub async fn export_prometheus(&self) -> String {
        let metrics = self.metrics.read().await;

        format!(
            r#"# HELP rolegate_resolutions_total Completed resolutions
# TYPE rolegate_resolutions_total counter
rolegate_resolutions_total{{mode="single"}} {}
rolegate_resolutions_total{{mode="bulk"}} {}

# HELP rolegate_identities_resolved_total Identities resolved
# TYPE rolegate_identities_resolved_total counter
rolegate_identities_resolved_total {}

# HELP rolegate_resolution_failures_total Aborted resolutions
# TYPE rolegate_resolution_failures_total counter
rolegate_resolution_failures_total{{cause="role_directory"}} {}
rolegate_resolution_failures_total{{cause="resource_provider"}} {}

# HELP rolegate_resolution_latency_seconds Resolution latency percentiles
# TYPE rolegate_resolution_latency_seconds summary
rolegate_resolution_latency_seconds{{quantile="0.5"}} {}
rolegate_resolution_latency_seconds{{quantile="0.9"}} {}
rolegate_resolution_latency_seconds{{quantile="0.99"}} {}
"#,
            metrics.single_resolutions,
            metrics.bulk_resolutions,
            metrics.identities_resolved,
            metrics.role_directory_failures,
            metrics.provider_failures,
            metrics.latency_p50_ms / 1000.0,
            metrics.latency_p90_ms / 1000.0,
            metrics.latency_p99_ms / 1000.0,
        )
    }

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
