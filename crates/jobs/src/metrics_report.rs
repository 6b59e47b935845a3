use dohproxy_application::services::{MetricsSnapshot, ProxyMetrics};
use dohproxy_domain::config::MetricsConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Logs one metrics summary line per interval until shutdown.
pub struct MetricsReportJob {
    metrics: Arc<ProxyMetrics>,
    interval_secs: u64,
    reports: AtomicU64,
    shutdown: CancellationToken,
}

impl MetricsReportJob {
    pub fn new(metrics: Arc<ProxyMetrics>) -> Self {
        Self {
            metrics,
            interval_secs: DEFAULT_INTERVAL_SECS,
            reports: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(metrics: Arc<ProxyMetrics>, config: &MetricsConfig) -> Self {
        Self::new(metrics).with_interval(config.timer_interval_seconds)
    }

    /// An interval of zero disables periodic reporting.
    pub fn with_interval(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn reports_logged(&self) -> u64 {
        self.reports.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> MetricsSnapshot {
        let snapshot = self.metrics.snapshot();
        self.reports.fetch_add(1, Ordering::Relaxed);
        info!(
            blocked = snapshot.blocked,
            upstream_errors = snapshot.upstream_errors,
            write_errors = snapshot.write_errors,
            malformed_requests = snapshot.malformed_requests,
            rcodes = ?snapshot.rcodes,
            rrtypes = ?snapshot.record_types,
            "metrics"
        );
        snapshot
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.interval_secs == 0 {
                info!("MetricsReportJob: disabled (interval 0)");
                return;
            }

            info!(interval_secs = self.interval_secs, "Starting metrics report job");
            let period = Duration::from_secs(self.interval_secs);
            let Some(first_tick) = Instant::now().checked_add(period) else {
                warn!(
                    interval_secs = self.interval_secs,
                    "MetricsReportJob: interval out of range, disabled"
                );
                return;
            };
            let mut interval = interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("MetricsReportJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.report();
                    }
                }
            }
        })
    }
}
