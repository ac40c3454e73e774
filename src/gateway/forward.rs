/// Request forwarding
///
/// Builds the outbound request (method and body preserved, `host` dropped,
/// identity headers injected), issues it against the backend, and relays
/// the backend's status and body verbatim. Backend 4xx/5xx responses are
/// relayed, not reinterpreted; only transport failures become a gateway
/// error.

use actix_web::{web, HttpRequest, HttpResponse};
use futures::StreamExt;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;

use crate::auth::IdentityContext;
use crate::error::{AppError, GatewayError};

/// Inbound headers that never reach a backend: connection-level headers,
/// plus the trusted identity headers an external client must not set.
const SKIP_REQUEST_HEADERS: [&str; 6] = [
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "x-user-id",
    "x-username",
];

/// Hop-by-hop response headers that are meaningless once relayed.
const SKIP_RESPONSE_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Pooled HTTP client used for all backend traffic.
pub struct ForwardClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl ForwardClient {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Forward a request whose body has been read in full.
    pub async fn forward_buffered(
        &self,
        req: &HttpRequest,
        body: web::Bytes,
        target: &str,
        identity: Option<&IdentityContext>,
    ) -> Result<HttpResponse, AppError> {
        let mut outbound = self.build_request(req, target, identity);
        if !body.is_empty() {
            outbound = outbound.body(body);
        }

        let upstream = outbound.timeout(self.timeout).send().await?;

        let status = upstream.status();
        let headers = upstream.headers().clone();
        let bytes = upstream.bytes().await?;

        let mut response = relay_response_builder(status, &headers);
        Ok(response.body(bytes))
    }

    /// Forward a request relaying both bodies as streams.
    ///
    /// The inbound payload is pumped through a channel so large uploads
    /// never sit in memory whole; the timeout bounds only the wait for the
    /// backend's status line, not the transfer itself.
    pub async fn forward_streaming(
        &self,
        req: &HttpRequest,
        mut payload: web::Payload,
        target: &str,
        identity: Option<&IdentityContext>,
    ) -> Result<HttpResponse, AppError> {
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<web::Bytes, std::io::Error>>(16);

        // The payload is not Send, so it is drained on this worker and the
        // chunks cross to the (Send) request body through the channel.
        actix_web::rt::spawn(async move {
            while let Some(chunk) = payload.next().await {
                let chunk = chunk
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, e));
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });

        let outbound = self
            .build_request(req, target, identity)
            .body(reqwest::Body::wrap_stream(ReceiverStream::new(rx)));

        let upstream = tokio::time::timeout(self.timeout, outbound.send())
            .await
            .map_err(|_| {
                AppError::Gateway(GatewayError::Upstream(format!(
                    "no response within {:?}",
                    self.timeout
                )))
            })??;

        let status = upstream.status();
        let headers = upstream.headers().clone();

        let mut response = relay_response_builder(status, &headers);
        Ok(response.streaming(upstream.bytes_stream()))
    }

    fn build_request(
        &self,
        req: &HttpRequest,
        target: &str,
        identity: Option<&IdentityContext>,
    ) -> reqwest::RequestBuilder {
        let mut outbound = self.client.request(req.method().clone(), target);

        for (name, value) in req.headers() {
            if SKIP_REQUEST_HEADERS.contains(&name.as_str()) {
                continue;
            }
            outbound = outbound.header(name.clone(), value.clone());
        }

        if let Some(identity) = identity {
            outbound = outbound
                .header("x-user-id", identity.user_id.to_string())
                .header("x-username", identity.username.clone());
        }

        outbound
    }
}

fn relay_response_builder(
    status: actix_web::http::StatusCode,
    headers: &reqwest::header::HeaderMap,
) -> actix_web::HttpResponseBuilder {
    let mut builder = HttpResponse::build(status);
    for (name, value) in headers.iter() {
        if SKIP_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        builder.append_header((name.clone(), value.clone()));
    }
    builder
}
