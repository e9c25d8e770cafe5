//! The reqwest-backed prober.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use url::Url;
use x509_parser::prelude::*;

use super::{ProbeError, Prober};
use crate::{
    config::WatchdogConfig,
    models::{PeerCertificate, ProbeResponse, TlsInfo},
};

/// Probes services with a shared [`reqwest::Client`].
///
/// The client carries the per-request timeout and redirect policy from
/// config and requests TLS peer-certificate capture so the SSL expiry rule
/// has something to inspect. No retry middleware here: the polling
/// interval itself is the retry cadence.
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Builds a prober from the watchdog settings.
    pub fn new(config: &WatchdogConfig) -> Result<Self, ProbeError> {
        let redirect = if config.follow_redirects {
            reqwest::redirect::Policy::limited(config.max_redirects)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(config.probe_timeout)
            .redirect(redirect)
            .tls_info(true)
            .user_agent(concat!("warden/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self { client, timeout: config.probe_timeout })
    }

    fn map_request_error(&self, error: reqwest::Error) -> ProbeError {
        if error.is_timeout() {
            ProbeError::Timeout(self.timeout)
        } else {
            ProbeError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        let started = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status().as_u16();

        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        // The certificate DER has to be copied out before the body read
        // consumes the response.
        let leaf_der: Option<Vec<u8>> = response
            .extensions()
            .get::<reqwest::tls::TlsInfo>()
            .and_then(|tls| tls.peer_certificate())
            .map(|der| der.to_vec());

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout(self.timeout)
            } else {
                ProbeError::Body(e.to_string())
            }
        })?;

        // Latency spans connection establishment through full-body read.
        let latency = started.elapsed();

        Ok(ProbeResponse {
            status,
            headers,
            body: body.to_vec(),
            latency,
            tls: leaf_der.map(|der| parse_tls_info(&der)),
        })
    }
}

/// Parses the captured leaf certificate into the fields the check engine
/// needs. An unparseable certificate yields an empty peer list, which the
/// SSL expiry rule reports as Crit.
fn parse_tls_info(leaf_der: &[u8]) -> TlsInfo {
    match X509Certificate::from_der(leaf_der) {
        Ok((_, cert)) => {
            let not_before = asn1_to_utc(cert.validity().not_before);
            let not_after = asn1_to_utc(cert.validity().not_after);
            TlsInfo {
                peer_certificates: vec![PeerCertificate {
                    subject: cert.subject().to_string(),
                    not_before,
                    not_after,
                }],
            }
        }
        Err(error) => {
            tracing::warn!(%error, "failed to parse peer certificate");
            TlsInfo { peer_certificates: Vec::new() }
        }
    }
}

fn asn1_to_utc(time: ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.to_datetime().unix_timestamp(), 0).unwrap_or_default()
}
