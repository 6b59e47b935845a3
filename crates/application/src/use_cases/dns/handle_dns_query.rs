use crate::ports::{BlockedDomainMatcher, FilterDecision, ResponseWriter, UpstreamClient};
use crate::services::{clamp_ttls, responses, ProxyMetrics};
use dohproxy_domain::DomainError;
use hickory_proto::op::{Message, MessageType, OpCode, ResponseCode};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const DNS_HEADER_LEN: usize = 12;

/// Handles one inbound DNS query end to end: blocked-name short circuit,
/// upstream forwarding with transaction ID rewriting, TTL clamping and
/// writing exactly one response back to the client.
pub struct HandleDnsQueryUseCase {
    upstream: Arc<dyn UpstreamClient>,
    blocked: Arc<dyn BlockedDomainMatcher>,
    metrics: Arc<ProxyMetrics>,
    min_ttl: u32,
    max_ttl: u32,
    shutdown: CancellationToken,
}

impl HandleDnsQueryUseCase {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        blocked: Arc<dyn BlockedDomainMatcher>,
        metrics: Arc<ProxyMetrics>,
        min_ttl: u32,
        max_ttl: u32,
    ) -> Self {
        Self {
            upstream,
            blocked,
            metrics,
            min_ttl,
            max_ttl,
            shutdown: CancellationToken::new(),
        }
    }

    /// Per-query contexts are derived from `shutdown`, so cancelling it
    /// aborts every in-flight upstream exchange.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn metrics(&self) -> &Arc<ProxyMetrics> {
        &self.metrics
    }

    /// Decodes raw query bytes and handles them. Bytes that do not decode
    /// get FORMERR when a header ID can be recovered and are dropped
    /// otherwise.
    pub async fn handle_wire<W>(&self, bytes: &[u8], writer: &mut W)
    where
        W: ResponseWriter + ?Sized,
    {
        match Message::from_vec(bytes) {
            Ok(request) => self.handle(&request, writer).await,
            Err(e) => {
                self.metrics.increment_malformed();
                if bytes.len() < DNS_HEADER_LEN {
                    debug!(len = bytes.len(), "Dropping runt DNS packet");
                    return;
                }
                let id = u16::from_be_bytes([bytes[0], bytes[1]]);
                debug!(id, error = %e, "Undecodable query, replying FORMERR");
                self.write(writer, &responses::format_error(id)).await;
            }
        }
    }

    /// Produces the response for `request` and writes it. Every query gets
    /// exactly one message. Packets with QR set are responses, not queries,
    /// and are dropped without a reply so two resolvers can never bounce a
    /// packet back and forth. Opcodes other than QUERY get NOTIMP.
    pub async fn handle<W>(&self, request: &Message, writer: &mut W)
    where
        W: ResponseWriter + ?Sized,
    {
        if request.message_type() == MessageType::Response {
            self.metrics.increment_malformed();
            debug!(id = request.id(), "Dropping DNS packet with QR set");
            return;
        }

        if request.op_code() != OpCode::Query {
            debug!(
                id = request.id(),
                op_code = ?request.op_code(),
                "Unsupported opcode, replying NOTIMP"
            );
            let response = responses::reply_with_code(request, ResponseCode::NotImp);
            self.write(writer, &response).await;
            return;
        }

        let ctx = self.shutdown.child_token();
        let _cancel_on_exit = ctx.clone().drop_guard();

        let response = self.execute(request, &ctx).await;
        self.write(writer, &response).await;
    }

    pub async fn execute(&self, request: &Message, ctx: &CancellationToken) -> Message {
        let start = Instant::now();

        if request.queries().len() != 1 {
            self.metrics.increment_malformed();
            warn!(
                id = request.id(),
                questions = request.queries().len(),
                "Rejecting query without exactly one question"
            );
            return responses::failure(request);
        }

        let question = &request.queries()[0];
        let domain = question.name().to_string();
        let record_type = question.query_type();

        if self.blocked.check(&domain) == FilterDecision::Block {
            self.metrics.increment_blocked();
            debug!(domain = %domain, record_type = %record_type, "Blocked domain");
            return responses::name_error(request);
        }

        let request_id = request.id();
        let mut upstream_query = request.clone();
        upstream_query.set_id(0);

        match self.upstream.request(ctx, &upstream_query).await {
            Ok(mut response) => {
                response.set_id(request_id);
                let min_ttl = clamp_ttls(&mut response, self.min_ttl, self.max_ttl);
                debug!(
                    domain = %domain,
                    record_type = %record_type,
                    rcode = %response.response_code(),
                    answers = response.answers().len(),
                    min_ttl,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "Query resolved"
                );
                response
            }
            Err(e) => {
                self.metrics.increment_upstream_error();
                log_upstream_failure(&domain, &e);
                responses::failure(request)
            }
        }
    }

    async fn write<W>(&self, writer: &mut W, response: &Message)
    where
        W: ResponseWriter + ?Sized,
    {
        if let Err(e) = writer.write_message(response).await {
            self.metrics.increment_write_error();
            warn!(id = response.id(), error = %e, "Failed to write DNS response");
        }
    }
}

fn log_upstream_failure(domain: &str, error: &DomainError) {
    match error {
        DomainError::QueryCancelled => {
            debug!(domain = %domain, "Upstream request cancelled")
        }
        _ => warn!(domain = %domain, error = %error, "Upstream request failed"),
    }
}
