//! This module contains the data models for the Warden application.

pub mod alert;
pub mod check;
pub mod probe;
pub mod route;
pub mod service;
pub mod service_state;

pub use alert::AlertEvent;
pub use check::{aggregate_severity, CheckOutcome, CheckRule, RuleKind, Severity};
pub use probe::{PeerCertificate, ProbeResponse, TlsInfo};
pub use route::AlertRoute;
pub use service::Service;
pub use service_state::ServiceState;
