#![allow(dead_code)]

use async_trait::async_trait;
use dohproxy_application::ports::{
    BlockedDomainMatcher, FilterDecision, ResponseWriter, UpstreamClient,
};
use dohproxy_domain::DomainError;
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ── Upstream ───────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockUpstreamClient {
    answers: Arc<RwLock<Vec<(Ipv4Addr, u32)>>>,
    error: Arc<RwLock<Option<DomainError>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    seen_ids: Arc<Mutex<Vec<u16>>>,
    calls: Arc<AtomicUsize>,
}

impl MockUpstreamClient {
    pub fn new() -> Self {
        Self {
            answers: Arc::new(RwLock::new(Vec::new())),
            error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(None)),
            seen_ids: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn add_answer(&self, ip: Ipv4Addr, ttl: u32) {
        self.answers.write().unwrap().push((ip, ttl));
    }

    pub fn set_error(&self, error: DomainError) {
        *self.error.write().unwrap() = Some(error);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write().unwrap() = Some(delay);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_ids(&self) -> Vec<u16> {
        self.seen_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpstreamClient for MockUpstreamClient {
    async fn request(
        &self,
        ctx: &CancellationToken,
        query: &Message,
    ) -> Result<Message, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_ids.lock().unwrap().push(query.id());

        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::select! {
                _ = ctx.cancelled() => return Err(DomainError::QueryCancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        if let Some(error) = self.error.read().unwrap().clone() {
            return Err(error);
        }

        let question = query.queries()[0].clone();
        let mut response = Message::new();
        response
            .set_id(query.id())
            .set_message_type(MessageType::Response)
            .set_recursion_desired(query.recursion_desired())
            .set_recursion_available(true)
            .set_response_code(ResponseCode::NoError);
        for (ip, ttl) in self.answers.read().unwrap().iter() {
            response.add_answer(Record::from_rdata(
                question.name().clone(),
                *ttl,
                RData::A(A(*ip)),
            ));
        }
        response.add_query(question);
        Ok(response)
    }
}

// ── Blocked domains ────────────────────────────────────────────────────────

pub struct MockBlockedDomains {
    suffixes: HashSet<String>,
}

impl MockBlockedDomains {
    pub fn new(domains: &[&str]) -> Self {
        Self {
            suffixes: domains.iter().map(|d| d.to_ascii_lowercase()).collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }
}

impl BlockedDomainMatcher for MockBlockedDomains {
    fn check(&self, domain: &str) -> FilterDecision {
        let domain = domain.trim_end_matches('.').to_ascii_lowercase();
        let mut candidate = domain.as_str();
        loop {
            if self.suffixes.contains(candidate) {
                return FilterDecision::Block;
            }
            match candidate.find('.') {
                Some(pos) => candidate = &candidate[pos + 1..],
                None => return FilterDecision::Forward,
            }
        }
    }

    fn domain_count(&self) -> usize {
        self.suffixes.len()
    }
}

// ── Response writer ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingWriter {
    pub written: Vec<Message>,
    pub fail: bool,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            written: Vec::new(),
            fail: true,
        }
    }

    pub fn single(&self) -> &Message {
        assert_eq!(self.written.len(), 1, "expected exactly one response");
        &self.written[0]
    }
}

#[async_trait]
impl ResponseWriter for RecordingWriter {
    async fn write_message(&mut self, response: &Message) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::WriteFailed("connection reset".to_string()));
        }
        self.written.push(response.clone());
        Ok(())
    }
}

// ── Builders ───────────────────────────────────────────────────────────────

pub fn query(id: u16, domain: &str, record_type: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(Name::from_str(domain).unwrap(), record_type));
    message
}
