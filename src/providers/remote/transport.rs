use crate::error::{ClarifyError, Result};
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const USER_AGENT_VALUE: &str = concat!("stopgate/", env!("CARGO_PKG_VERSION"));

/// Raw HTTP answer before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Request/response seam under the remote client.
///
/// The client owns retries, timeouts and classification; a transport only
/// moves one JSON body and reports what came back.
pub trait HttpTransport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        bearer: &'a str,
        body: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpReply>> + Send + 'a>>;
}

pub fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Default transport backed by a pooled `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: build_http_client(),
        }
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a `reqwest` failure onto the crate taxonomy.
///
/// Connection, timeout, request and body failures are transient; builder or
/// redirect-policy failures will not fix themselves.
pub fn classify_reqwest_error(err: &reqwest::Error) -> ClarifyError {
    let retryable = err.is_connect() || err.is_timeout() || err.is_request() || err.is_body();
    ClarifyError::Network {
        message: err.to_string(),
        retryable,
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a str,
        bearer: &'a str,
        body: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<HttpReply>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .header(AUTHORIZATION, format!("Bearer {bearer}"))
                .header(CONTENT_TYPE, "application/json")
                .header(USER_AGENT, USER_AGENT_VALUE)
                .json(body)
                .send()
                .await
                .map_err(|e| classify_reqwest_error(&e))?;

            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| classify_reqwest_error(&e))?;
            Ok(HttpReply { status, body })
        })
    }
}
