//! The snapshot of one HTTP response as consumed by the check engine.

use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, Utc};

/// One probe's response snapshot: status, headers, body, measured latency,
/// and optional TLS handshake information.
///
/// Produced fresh each cycle by the [`Prober`](crate::probe::Prober) and
/// consumed only by that cycle's rule evaluations.
#[derive(Debug, Clone, Default)]
pub struct ProbeResponse {
    /// The HTTP status code.
    pub status: u16,
    /// Response headers, keyed by lowercased header name.
    pub headers: HashMap<String, String>,
    /// The raw body bytes, prior to any charset decoding.
    pub body: Vec<u8>,
    /// Wall-clock latency spanning request start through full-body read.
    pub latency: Duration,
    /// TLS peer information, present only for HTTPS probes.
    pub tls: Option<TlsInfo>,
}

impl ProbeResponse {
    /// Looks up a header by name, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// TLS handshake information attached to a probe response.
#[derive(Debug, Clone, Default)]
pub struct TlsInfo {
    /// The peer certificate chain; the leaf certificate is first.
    pub peer_certificates: Vec<PeerCertificate>,
}

/// The fields of a peer certificate the check engine cares about.
#[derive(Debug, Clone)]
pub struct PeerCertificate {
    /// The certificate subject, for log and alert messages.
    pub subject: String,
    /// Start of the validity window.
    pub not_before: DateTime<Utc>,
    /// End of the validity window.
    pub not_after: DateTime<Utc>,
}
