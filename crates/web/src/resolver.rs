//! DNS-over-HTTPS resolution for the upstream game server.
//!
//! The proxy never trusts the system resolver for the game server
//! address, since that is exactly the record a hosts-file redirect
//! overrides to point the client at us. Lookups go straight to a
//! public DoH endpoint speaking the `application/dns-json` format.

use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::Full;
use hyper::header;
use hyper::{Method, Request, StatusCode};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::client;
use crate::tls;

/// Supported DoH endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsProvider {
    /// `dns.google`.
    Google,
    /// `cloudflare-dns.com`.
    Cloudflare,
}

impl DnsProvider {
    /// Map a configured provider name, falling back to Google for
    /// anything unrecognized.
    pub fn from_name(name: &str) -> Self {
        match name {
            "cloudflare" => Self::Cloudflare,
            "google" => Self::Google,
            other => {
                warn!("Unknown DNS provider: {}, defaulting to Google DNS", other);
                Self::Google
            }
        }
    }

    fn host(self) -> &'static str {
        match self {
            Self::Google => "dns.google",
            Self::Cloudflare => "cloudflare-dns.com",
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Google => "/resolve",
            Self::Cloudflare => "/dns-query",
        }
    }
}

/// DNS response codes, per the `Status` field of the dns-json format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsStatus {
    /// Query answered.
    NoError,
    /// Malformed query.
    FormatError,
    /// Resolver failure. Also used for transport and decode failures
    /// on our side, and for status codes past the defined range.
    ServerFail,
    /// The domain does not exist.
    NameError,
    /// Query type not supported by the resolver.
    NotImplemented,
    /// Resolver refused to answer.
    Refused,
    /// Name exists when it should not.
    YXDomain,
    /// RR set exists when it should not.
    YXRRSet,
    /// RR set that should exist does not.
    NXRRSet,
    /// Server not authoritative for the zone.
    NotAuth,
    /// Name not contained in zone.
    NotZone,
}

impl DnsStatus {
    fn from_code(code: i32) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::FormatError,
            2 => Self::ServerFail,
            3 => Self::NameError,
            4 => Self::NotImplemented,
            5 => Self::Refused,
            6 => Self::YXDomain,
            7 => Self::YXRRSet,
            8 => Self::NXRRSet,
            9 => Self::NotAuth,
            10 => Self::NotZone,
            _ => Self::ServerFail,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DnsResponse {
    #[serde(rename = "Status")]
    status: i32,
    #[serde(rename = "Answer", default)]
    answer: Vec<DnsAnswer>,
}

#[derive(Debug, Deserialize)]
struct DnsAnswer {
    data: String,
}

/// Resolver bound to one DoH provider.
pub struct DnsResolver {
    provider: DnsProvider,
    tls: Arc<rustls::ClientConfig>,
}

impl DnsResolver {
    /// Create a resolver for `provider`.
    pub fn new(provider: DnsProvider) -> Self {
        let _ = rustls::crypto::ring::default_provider().install_default();

        Self {
            provider,
            tls: Arc::new(tls::verifying_client_config()),
        }
    }

    /// Resolve `host` to an IP address string.
    ///
    /// IP literals pass through untouched. Returns `None` when the
    /// lookup fails for any reason, after logging the status.
    pub async fn resolve_ip(&self, host: &str) -> Option<String> {
        if host.parse::<IpAddr>().is_ok() {
            return Some(host.to_owned());
        }

        match self.resolve_domain(host).await {
            Ok(ip) => {
                info!("Resolved {} to {}", host, ip);
                Some(ip)
            }
            Err(status) => {
                error!("DNS resolution failed for {}: {:?}", host, status);
                None
            }
        }
    }

    /// Query the provider for an A record of `domain`.
    pub async fn resolve_domain(&self, domain: &str) -> Result<String, DnsStatus> {
        let request = match Request::builder()
            .method(Method::GET)
            .uri(format!("{}?name={}&type=A", self.provider.path(), domain))
            .header(header::HOST, self.provider.host())
            .header(header::ACCEPT, "application/dns-json")
            .body(Full::new(Bytes::new()))
        {
            Ok(request) => request,
            Err(err) => {
                error!("Failed to build DNS request: {}", err);
                return Err(DnsStatus::ServerFail);
            }
        };

        let result = client::https_request(self.tls.clone(), self.provider.host(), request).await;
        let (status, body) = match result {
            Ok(response) => response,
            Err(err) => {
                error!("DNS request failed: {:#}", err);
                return Err(DnsStatus::ServerFail);
            }
        };

        if status != StatusCode::OK {
            error!("Failed to get DNS response: HTTP status: {}", status.as_u16());
            return Err(DnsStatus::ServerFail);
        }

        if body.is_empty() {
            return Err(DnsStatus::ServerFail);
        }

        let response: DnsResponse = match serde_json::from_slice(&body) {
            Ok(response) => response,
            Err(err) => {
                error!("Failed to parse DNS response: {}", err);
                return Err(DnsStatus::ServerFail);
            }
        };

        select_answer(response)
    }
}

/// The last answer in the chain is the resolved address; earlier
/// entries are CNAME hops.
fn select_answer(response: DnsResponse) -> Result<String, DnsStatus> {
    let status = DnsStatus::from_code(response.status);
    if status != DnsStatus::NoError {
        return Err(status);
    }

    match response.answer.into_iter().last() {
        Some(answer) => Ok(answer.data),
        None => Err(DnsStatus::NameError),
    }
}
