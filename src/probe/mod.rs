//! The probe boundary: one HTTP GET with latency measurement and TLS
//! capture.
//!
//! The scheduler depends only on the [`Prober`] trait; the production
//! implementation is [`HttpProber`]. Transport failures come back as
//! [`ProbeError`] values, never panics, and the scheduler turns them
//! into a synthetic availability outcome.

mod http;

pub use http::HttpProber;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use url::Url;

use crate::models::ProbeResponse;

/// Errors a probe can report. All variants are transport-level: an HTTP
/// error status is a successful probe and is judged by the check rules
/// instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProbeError {
    /// The request exceeded the configured per-request timeout.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Connection, TLS or DNS failure while issuing the request.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response arrived but its body could not be read in full.
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The probe client itself could not be constructed.
    #[error("failed to build probe client: {0}")]
    Client(String),
}

/// Performs one probe of a service URL.
///
/// Implementations own their per-request timeout so a hung endpoint cannot
/// starve the calling task; the scheduler adds no timeout layer of its own.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Prober: Send + Sync {
    /// Issues one GET against `url` and returns the response snapshot.
    async fn probe(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;
}
