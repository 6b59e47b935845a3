//! dohproxy application layer: ports, shared services and the query use case.
pub mod ports;
pub mod services;
pub mod use_cases;
