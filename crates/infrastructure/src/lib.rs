//! dohproxy infrastructure: DoH JSON upstream, blocked-domain table and
//! plain DNS listeners.
pub mod dns;
