use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Timed out after {timeout_ms}ms waiting for an upstream request slot")]
    AdmissionTimeout { timeout_ms: u64 },

    #[error("Upstream request to {url} failed: {reason}")]
    UpstreamTransport { url: String, reason: String },

    #[error("Upstream {url} returned HTTP {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Upstream request to {url} timed out after {timeout_ms}ms")]
    UpstreamTimeout { url: String, timeout_ms: u64 },

    #[error("Invalid upstream response: {0}")]
    InvalidUpstreamResponse(String),

    #[error("Failed to translate upstream answer: {0}")]
    Translation(String),

    #[error("Query cancelled")]
    QueryCancelled,

    #[error("Failed to write response: {0}")]
    WriteFailed(String),

    #[error("Failed to load blocked domains from {path}: {reason}")]
    BlockedDomainsLoad { path: String, reason: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Private addresses are not allowed: {0}")]
    PrivateAddress(String),
}
