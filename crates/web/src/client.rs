//! Minimal one-shot HTTPS client used for the upstream `server_data.php`
//! call and the DNS-over-HTTPS queries.

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

const HTTPS_PORT: u16 = 443;

/// Send `request` to `host` over a fresh TLS connection and collect the
/// response body.
///
/// `host` may be a DNS name or an IP literal; it is only used for the
/// TCP connect and the SNI, so the `Host` header stays under the
/// caller's control.
pub(crate) async fn https_request(
    tls: Arc<rustls::ClientConfig>,
    host: &str,
    request: Request<Full<Bytes>>,
) -> Result<(StatusCode, Bytes)> {
    let stream = TcpStream::connect((host, HTTPS_PORT))
        .await
        .with_context(|| format!("Failed to connect to {host}:{HTTPS_PORT}"))?;

    let server_name =
        ServerName::try_from(host.to_owned()).with_context(|| format!("Invalid server name: {host}"))?;
    let stream = TlsConnector::from(tls)
        .connect(server_name, stream)
        .await
        .with_context(|| format!("TLS handshake with {host} failed"))?;

    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .context("HTTP handshake failed")?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            debug!("HTTPS connection closed: {err}");
        }
    });

    let response = sender
        .send_request(request)
        .await
        .with_context(|| format!("Request to {host} failed"))?;

    let status = response.status();
    let body = response
        .into_body()
        .collect()
        .await
        .context("Failed to read response body")?
        .to_bytes();

    Ok((status, body))
}
