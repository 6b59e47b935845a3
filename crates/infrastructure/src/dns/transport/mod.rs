pub mod admission;
pub mod doh_json;

pub use admission::AdmissionGate;
pub use doh_json::DohJsonClient;
