use dashmap::DashMap;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::RecordType;
use rustc_hash::FxBuildHasher;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters observed by the query pipeline.
///
/// Counters only ever grow. The two keyed maps discover their keys lazily:
/// the first observation of a response code or record type inserts the entry
/// through the map's entry API, so concurrent first observers never lose an
/// increment and never produce duplicate entries.
pub struct ProxyMetrics {
    blocked: AtomicU64,
    upstream_errors: AtomicU64,
    write_errors: AtomicU64,
    malformed_requests: AtomicU64,
    rcode_counts: DashMap<u16, AtomicU64, FxBuildHasher>,
    record_type_counts: DashMap<RecordType, AtomicU64, FxBuildHasher>,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self {
            blocked: AtomicU64::new(0),
            upstream_errors: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            malformed_requests: AtomicU64::new(0),
            rcode_counts: DashMap::with_hasher(FxBuildHasher),
            record_type_counts: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn increment_blocked(&self) {
        self.blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_upstream_error(&self) {
        self.upstream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_malformed(&self) {
        self.malformed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    pub fn upstream_errors(&self) -> u64 {
        self.upstream_errors.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    pub fn malformed_requests(&self) -> u64 {
        self.malformed_requests.load(Ordering::Relaxed)
    }

    pub fn record_rcode(&self, rcode: ResponseCode) {
        let key = u16::from(rcode);
        if let Some(counter) = self.rcode_counts.get(&key) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.rcode_counts
            .entry(key)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_record_type(&self, record_type: RecordType) {
        if let Some(counter) = self.record_type_counts.get(&record_type) {
            counter.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.record_type_counts
            .entry(record_type)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn rcode_count(&self, rcode: ResponseCode) -> u64 {
        self.rcode_counts
            .get(&u16::from(rcode))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn record_type_count(&self, record_type: RecordType) -> u64 {
        self.record_type_counts
            .get(&record_type)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let rcodes = self
            .rcode_counts
            .iter()
            .map(|entry| {
                (
                    rcode_name(*entry.key()).into_owned(),
                    entry.value().load(Ordering::Relaxed),
                )
            })
            .collect();

        let record_types = self
            .record_type_counts
            .iter()
            .map(|entry| {
                (
                    record_type_name(*entry.key()),
                    entry.value().load(Ordering::Relaxed),
                )
            })
            .collect();

        MetricsSnapshot {
            blocked: self.blocked(),
            upstream_errors: self.upstream_errors(),
            write_errors: self.write_errors(),
            malformed_requests: self.malformed_requests(),
            rcodes,
            record_types,
        }
    }
}

impl Default for ProxyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub blocked: u64,
    pub upstream_errors: u64,
    pub write_errors: u64,
    pub malformed_requests: u64,
    pub rcodes: BTreeMap<String, u64>,
    pub record_types: BTreeMap<String, u64>,
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blocked = {} upstream_errors = {} write_errors = {} malformed_requests = {} rcodes = {:?} rrtypes = {:?}",
            self.blocked,
            self.upstream_errors,
            self.write_errors,
            self.malformed_requests,
            self.rcodes,
            self.record_types
        )
    }
}

/// Mnemonic for a numeric response code, `UNKNOWN:<code>` when unassigned.
pub fn rcode_name(code: u16) -> Cow<'static, str> {
    let name = match code {
        0 => "NOERROR",
        1 => "FORMERR",
        2 => "SERVFAIL",
        3 => "NXDOMAIN",
        4 => "NOTIMP",
        5 => "REFUSED",
        6 => "YXDOMAIN",
        7 => "YXRRSET",
        8 => "NXRRSET",
        9 => "NOTAUTH",
        10 => "NOTZONE",
        16 => "BADSIG",
        17 => "BADKEY",
        18 => "BADTIME",
        19 => "BADMODE",
        20 => "BADNAME",
        21 => "BADALG",
        22 => "BADTRUNC",
        23 => "BADCOOKIE",
        other => return Cow::Owned(format!("UNKNOWN:{}", other)),
    };
    Cow::Borrowed(name)
}

fn record_type_name(record_type: RecordType) -> String {
    match record_type {
        RecordType::Unknown(code) => format!("TYPE{}", code),
        known => known.to_string(),
    }
}
