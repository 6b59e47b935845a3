use dohproxy_application::ports::{BlockedDomainMatcher, UpstreamClient};
use dohproxy_application::services::ProxyMetrics;
use dohproxy_application::use_cases::HandleDnsQueryUseCase;
use dohproxy_domain::Config;
use dohproxy_infrastructure::dns::{BlockedDomainTable, DohJsonClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct DnsServices {
    pub metrics: Arc<ProxyMetrics>,
    pub handler_use_case: Arc<HandleDnsQueryUseCase>,
}

impl DnsServices {
    pub async fn new(config: &Config, shutdown: CancellationToken) -> anyhow::Result<Self> {
        info!("Initializing DNS proxy services");

        let metrics = Arc::new(ProxyMetrics::new());
        let upstream = Self::build_upstream(config, metrics.clone())?;
        let blocked = Self::build_blocked_table(config).await?;

        let handler_use_case = Arc::new(
            HandleDnsQueryUseCase::new(
                upstream,
                blocked,
                metrics.clone(),
                config.proxy.clamp_min_ttl_seconds,
                config.proxy.clamp_max_ttl_seconds,
            )
            .with_shutdown(shutdown),
        );

        Ok(Self {
            metrics,
            handler_use_case,
        })
    }

    fn build_upstream(
        config: &Config,
        metrics: Arc<ProxyMetrics>,
    ) -> anyhow::Result<Arc<dyn UpstreamClient>> {
        let client = DohJsonClient::new(&config.doh_client, metrics)?;
        info!(
            url = %config.doh_client.url,
            max_concurrent_requests = config.doh_client.max_concurrent_requests,
            acquire_timeout_ms = config.doh_client.semaphore_acquire_timeout_milliseconds,
            request_timeout_ms = config.doh_client.request_timeout_milliseconds,
            "DoH upstream configured"
        );
        Ok(Arc::new(client))
    }

    async fn build_blocked_table(config: &Config) -> anyhow::Result<Arc<dyn BlockedDomainMatcher>> {
        let table = match config.proxy.blocked_domains_path() {
            Some(path) => BlockedDomainTable::load(path).await?,
            None => {
                info!("No blocked domains file configured");
                BlockedDomainTable::empty()
            }
        };
        Ok(Arc::new(table))
    }
}
