//! Local HTTPS endpoint impersonating `growtopia/server_data.php`.
//!
//! The game client is pointed here via a hosts-file override. Each
//! request is replayed against the real server (resolved over DoH so
//! the override does not loop back to us), the advertised game server
//! is captured as the redirect target for the next ENet connection,
//! and the response is rewritten to advertise the proxy instead.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{RawQuery, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use http_body_util::Full;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use gtbridge_proto::TextParse;

use crate::client;
use crate::resolver::{DnsProvider, DnsResolver};
use crate::tls;

const SERVER_DATA_PATH: &str = "/growtopia/server_data.php";

/// Settings for the bootstrap endpoint.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Port the HTTPS listener binds on.
    pub listen_port: u16,
    /// Hostname or IP of the real `server_data.php` host.
    pub server_address: String,
    /// ENet port the rewritten response points the client at.
    pub proxy_port: u16,
    /// DoH provider used to resolve `server_address`.
    pub dns_provider: DnsProvider,
    /// Directory holding the serving certificate.
    pub resource_dir: PathBuf,
}

/// Game server coordinates captured from an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Address the real response advertised.
    pub address: String,
    /// Port the real response advertised.
    pub port: u16,
}

#[derive(Clone)]
struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    config: WebConfig,
    resolver: DnsResolver,
    upstream_tls: Arc<rustls::ClientConfig>,
    redirect_tx: mpsc::UnboundedSender<RedirectTarget>,
}

impl AppState {
    fn new(config: WebConfig, redirect_tx: mpsc::UnboundedSender<RedirectTarget>) -> Self {
        let resolver = DnsResolver::new(config.dns_provider);
        Self {
            inner: Arc::new(Inner {
                config,
                resolver,
                upstream_tls: Arc::new(tls::insecure_client_config()),
                redirect_tx,
            }),
        }
    }

    fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    fn resolver(&self) -> &DnsResolver {
        &self.inner.resolver
    }

    fn upstream_tls(&self) -> Arc<rustls::ClientConfig> {
        self.inner.upstream_tls.clone()
    }

    fn redirect_tx(&self) -> &mpsc::UnboundedSender<RedirectTarget> {
        &self.inner.redirect_tx
    }
}

/// Run the HTTPS listener until it fails.
///
/// Captured redirect targets are pushed into `redirect_tx` as requests
/// come in.
pub async fn serve(
    config: WebConfig,
    redirect_tx: mpsc::UnboundedSender<RedirectTarget>,
) -> Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let tls = tls::server_config(&config.resource_dir).await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    let port = config.listen_port;

    let app = router(AppState::new(config, redirect_tx));

    info!("HTTPS server listening on port {}", port);
    axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service())
        .await
        .with_context(|| format!("HTTPS server on port {port} failed"))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(SERVER_DATA_PATH, post(server_data))
        .fallback(fallback)
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn server_data(
    State(state): State<AppState>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Response {
    if !headers.is_empty() {
        info!("Headers:");
        for (name, value) in &headers {
            info!("\t{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
        }
    }

    if let Some(query) = query.as_deref().filter(|query| !query.is_empty()) {
        info!("Params:");
        info!("\t{}", query);
    }

    if !body.is_empty() {
        info!("Body:");
        info!("\t{}", body);
    }

    let server_address = state.config().server_address.clone();
    let Some(resolved_ip) = state.resolver().resolve_ip(&server_address).await else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to resolve server address",
        )
            .into_response();
    };

    let mut builder = hyper::Request::builder()
        .method(Method::POST)
        .uri(SERVER_DATA_PATH)
        .header(header::HOST, server_address.as_str())
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(agent) = headers.get(header::USER_AGENT) {
        builder = builder.header(header::USER_AGENT, agent.clone());
    }

    let request = match builder.body(Full::new(Bytes::from(body))) {
        Ok(request) => request,
        Err(err) => {
            error!("Failed to build upstream request: {}", err);
            return plain_status(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let result = client::https_request(state.upstream_tls(), &resolved_ip, request).await;
    let (status, response_body) = match result {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to get response: {:#}", err);
            return (
                StatusCode::BAD_GATEWAY,
                "Failed to get response from server",
            )
                .into_response();
        }
    };

    if status != StatusCode::OK {
        error!("Failed to get response: HTTP status: {}", status.as_u16());
        return (
            StatusCode::BAD_GATEWAY,
            "Failed to get response from server",
        )
            .into_response();
    }

    if response_body.is_empty() {
        return (StatusCode::BAD_GATEWAY, "Empty response from server").into_response();
    }

    let text = String::from_utf8_lossy(&response_body);
    let mut data = TextParse::parse(&text);
    if data.is_empty() {
        error!("Failed to parse server_data.php response");
        return plain_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    info!("Original server_data.php response:\n{}", data);

    let Some(target) = rewrite_server_data(&mut data, state.config().proxy_port) else {
        error!("Failed to parse port from server_data.php response");
        return plain_status(StatusCode::INTERNAL_SERVER_ERROR);
    };

    debug!("Modified server_data.php response:\n{}", data);

    if state.redirect_tx().send(target).is_err() {
        warn!("Redirect channel closed, dropping captured server address");
    }

    Html(data.serialize()).into_response()
}

/// Capture the advertised game server, then point the response at the
/// proxy. Returns `None` without touching `data` when the advertised
/// port does not parse.
fn rewrite_server_data(data: &mut TextParse, proxy_port: u16) -> Option<RedirectTarget> {
    let address = data.get("server", 0).unwrap_or_default().to_owned();
    let port = data.get_parsed::<u16>("port", 0)?;

    data.set("server", "127.0.0.1");
    data.set("port", proxy_port);
    data.set("type2", 1);

    Some(RedirectTarget { address, port })
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();

    let response = next.run(request).await;
    info!("{} {} {}", method, path, response.status().as_u16());
    response
}

async fn fallback() -> Response {
    plain_status(StatusCode::NOT_FOUND)
}

fn plain_status(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Unknown Error");
    (status, format!("{} ({})", reason, status.as_u16())).into_response()
}
