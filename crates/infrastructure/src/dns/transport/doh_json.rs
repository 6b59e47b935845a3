//! JSON DNS-over-HTTPS client.
//!
//! Each query becomes one GET carrying the question as URL parameters:
//!
//! ```text
//! GET /resolve?name=example.com.&type=1 HTTP/2
//! Accept: application/dns-json
//! ```
//!
//! The JSON body is translated back into a wire message for the client.

use super::admission::AdmissionGate;
use crate::dns::forwarding::{DohJsonResponse, JsonTranslator};
use async_trait::async_trait;
use dohproxy_application::ports::UpstreamClient;
use dohproxy_application::services::ProxyMetrics;
use dohproxy_domain::config::DohClientConfig;
use dohproxy_domain::DomainError;
use hickory_proto::op::{Message, ResponseCode};
use reqwest::header::ACCEPT;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";

pub struct DohJsonClient {
    http: reqwest::Client,
    url: String,
    gate: AdmissionGate,
    request_timeout: Duration,
    metrics: Arc<ProxyMetrics>,
}

impl DohJsonClient {
    pub fn new(config: &DohClientConfig, metrics: Arc<ProxyMetrics>) -> Result<Self, DomainError> {
        let http = reqwest::Client::builder()
            .use_rustls_tls()
            .pool_max_idle_per_host(config.max_concurrent_requests)
            .build()
            .map_err(|e| DomainError::UpstreamTransport {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            url: config.url.clone(),
            gate: AdmissionGate::new(config.max_concurrent_requests, config.acquire_timeout()),
            request_timeout: config.request_timeout(),
            metrics,
        })
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    async fn fetch(&self, name: &str, record_type: u16) -> Result<DohJsonResponse, DomainError> {
        let record_type = record_type.to_string();
        let response = self
            .http
            .get(&self.url)
            .query(&[("name", name), ("type", record_type.as_str())])
            .header(ACCEPT, DNS_JSON_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| DomainError::UpstreamTransport {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::UpstreamStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DomainError::UpstreamTransport {
                url: self.url.clone(),
                reason: format!("failed to read body: {}", e),
            })?;

        DohJsonResponse::from_slice(&body)
    }
}

#[async_trait]
impl UpstreamClient for DohJsonClient {
    async fn request(
        &self,
        ctx: &CancellationToken,
        query: &Message,
    ) -> Result<Message, DomainError> {
        let question = query
            .queries()
            .first()
            .ok_or_else(|| DomainError::MalformedRequest("query has no question".to_string()))?;
        let name = question.name().to_ascii();
        let record_type = u16::from(question.query_type());

        let permit = self.gate.acquire(ctx).await?;

        debug!(url = %self.url, name = %name, record_type, "Sending DoH JSON query");
        let exchange = tokio::time::timeout(self.request_timeout, self.fetch(&name, record_type));
        let json = tokio::select! {
            biased;
            _ = ctx.cancelled() => return Err(DomainError::QueryCancelled),
            result = exchange => result.map_err(|_| DomainError::UpstreamTimeout {
                url: self.url.clone(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            })??,
        };
        drop(permit);

        let response = JsonTranslator::to_wire(&json, query)?;

        // Count the status upstream sent, even when the client sees SERVFAIL.
        let upstream_rcode: ResponseCode = json.status.into();
        self.metrics.record_rcode(upstream_rcode);
        for record in response.answers() {
            self.metrics.record_record_type(record.record_type());
        }

        debug!(
            name = %name,
            rcode = %response.response_code(),
            answers = response.answers().len(),
            "DoH JSON response translated"
        );
        Ok(response)
    }
}
