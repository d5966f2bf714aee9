use std::time::Duration;

use async_trait::async_trait;
use momo_core::Transport;
use momo_domain::{HttpMethod, MomoConfig, MomoError, Result, TransportRequest, TransportResponse};
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

/// reqwest-backed implementation of the [`Transport`] port.
///
/// Sends exactly one request per call; any HTTP status is returned to the
/// caller as data.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Transport using the request timeout and proxy choice from configuration.
    pub fn from_config(config: &MomoConfig) -> Result<Self> {
        let mut builder = Self::builder().timeout(Duration::from_secs(config.timeout_secs));
        if config.no_proxy {
            builder = builder.no_proxy();
        }
        builder.build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let method = to_reqwest_method(request.method);
        let mut builder = self.client.request(method.clone(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.json_body {
            builder = builder.json(body);
        }

        debug!(%method, url = %request.url, "sending HTTP request");
        let response = builder.send().await.map_err(|err| transport_error(&err))?;

        let status = response.status();
        debug!(%method, url = %request.url, %status, "received HTTP response");

        let body = response.text().await.map_err(|err| transport_error(&err))?;
        Ok(TransportResponse::new(status.as_u16(), body))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    no_proxy: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(momo_domain::constants::DEFAULT_TIMEOUT_SECS),
            no_proxy: false,
        }
    }
}

impl HttpTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Connect directly, ignoring `HTTP_PROXY`/`HTTPS_PROXY`.
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(concat!("momo-client/", env!("CARGO_PKG_VERSION")));

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        let client = builder
            .build()
            .map_err(|err| MomoError::Config(format!("failed to build HTTP client: {err}")))?;

        Ok(HttpTransport { client })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn transport_error(err: &reqwest::Error) -> MomoError {
    let kind = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else {
        "http request failed"
    };
    MomoError::TransportFailure(format!("{kind}: {err}"))
}
